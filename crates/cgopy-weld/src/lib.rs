//! cgopy-weld: Symbol resolution and CPython binding generation
//!
//! This crate turns the exported surface of a package (constants, variables,
//! functions and types) into the C sources of a CPython extension module:
//! a declarations header and an implementation file that marshal values
//! between the host runtime and the package's exported native glue.
//!
//! # Architecture
//!
//! - `ir`: Package description, universe scope, symbols and the type resolver
//! - `codegen`: C emission for type objects, protocols and the module surface
//! - `build`: Configuration and the one-call `BindingBuilder`
//! - `error`: The `BindError` every failing stage reports
//!
//! # Usage
//!
//! ```rust,ignore
//! use cgopy_weld::build::{BindConfig, BindingBuilder};
//!
//! fn main() {
//!     BindingBuilder::from_json_file("geo.json")
//!         .expect("Failed to read package")
//!         .config(BindConfig::load("cgopy.toml").expect("Failed to load config"))
//!         .out_dir("bindings")
//!         .build()
//!         .expect("Failed to generate bindings");
//! }
//! ```

pub mod ir;
pub mod codegen;
pub mod build;
pub mod error;

// Re-export commonly used types
pub use ir::{
    BasicKind, Decl, DeclKind, FieldDecl, HostValue, MethodDecl, NativeValue, Package,
    ParamDecl, Symbol, SymbolId, SymbolKind, SymbolTable, TypeExpr, TypeShape, Universe,
    WordSize,
};
pub use codegen::{generate, Artifacts, CpyGenerator, GenOptions, HostAbi};
pub use build::{BindConfig, BindingBuilder, BuildOutput};
pub use error::{BindError, BindResult, PackageValidationError};
