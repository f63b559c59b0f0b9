//! Intermediate representation for cgopy bindings
//!
//! This module provides the package description handed over by the
//! front-end, the universe of predeclared types, and the symbol table that
//! resolves the package's type graph into [`Symbol`]s.

pub mod types;
pub mod value;
pub mod package;
pub mod symbol;
pub mod universe;
pub mod symtab;

pub use types::*;
pub use value::*;
pub use package::*;
pub use symbol::*;
pub use universe::*;
pub use symtab::*;
