//! Code generation for CPython extension modules
//!
//! This module provides:
//! - the declarations artifact (`<pkg>.h`): includes, handle typedefs,
//!   host-object layouts and prototypes of every generated function
//! - the implementation artifact (`<pkg>.c`): function bodies, type objects
//!   and the module surface
//!
//! Generation walks a resolved [`SymbolTable`] and cannot fail.

pub mod abi;
pub mod marshal;
pub mod printer;

mod funcs;
mod module;
mod structs;
mod types;

pub use abi::{HostAbi, TypeSlots};
pub use marshal::{c_literal, CallSite, Receiver};
pub use printer::{c_quote, Printer};

use crate::ir::{Symbol, SymbolId, SymbolTable};
use tracing::debug;

/// Include names and host ABI used by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenOptions {
    pub abi: HostAbi,
    /// Name the implementation includes the declarations under
    pub header_name: String,
    /// Header of the cgopy runtime support library
    pub runtime_header: String,
    /// Header exported by the native glue (`GoString`, `cgo_func_*`, ...)
    pub glue_header: String,
}

impl GenOptions {
    /// Default options for a package
    pub fn new(package: &str) -> Self {
        Self {
            abi: HostAbi::default(),
            header_name: format!("{}.h", package),
            runtime_header: "cgopy_seq_cpy.h".to_string(),
            glue_header: "_cgo_export.h".to_string(),
        }
    }

    /// Set the host ABI
    pub fn with_abi(mut self, abi: HostAbi) -> Self {
        self.abi = abi;
        self
    }
}

/// The two generated C artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub declarations: String,
    pub implementation: String,
}

/// Generator of the C sources binding one package
pub struct CpyGenerator<'t, 'a> {
    pub(super) table: &'t SymbolTable<'a>,
    pub(super) options: GenOptions,
    pub(super) decl: Printer,
    pub(super) impl_: Printer,
}

impl<'t, 'a> CpyGenerator<'t, 'a> {
    /// Create a generator over a resolved table
    pub fn new(table: &'t SymbolTable<'a>, options: GenOptions) -> Self {
        Self {
            table,
            options,
            decl: Printer::new(),
            impl_: Printer::new(),
        }
    }

    /// Emit both artifacts
    pub fn generate(mut self) -> Artifacts {
        let table = self.table;
        self.gen_preamble();

        let bindings: Vec<SymbolId> = table
            .iter()
            .filter(|(_, sym)| sym.needs_binding())
            .map(|(id, _)| id)
            .collect();

        for &id in &bindings {
            let sym = table.symbol(id);
            if sym.is_struct() {
                self.gen_struct(sym);
            } else {
                self.gen_type(sym);
            }
            debug!(id = %sym.id, shape = sym.kind.name(), "binding emitted");
        }

        self.gen_module(&bindings);
        self.decl.blank();
        self.decl.line(format!("#endif /* !{} */", self.guard()));

        debug!(
            package = %table.package().name,
            abi = %self.options.abi,
            bindings = bindings.len(),
            "artifacts generated"
        );
        Artifacts {
            declarations: self.decl.into_string(),
            implementation: self.impl_.into_string(),
        }
    }

    fn guard(&self) -> String {
        format!("CGOPY_{}_H", self.table.package().name.to_uppercase())
    }

    fn gen_preamble(&mut self) {
        let pkg = self.table.package();
        let origin = match &pkg.path {
            Some(path) => format!("{} ({})", pkg.name, path),
            None => pkg.name.clone(),
        };
        let guard = self.guard();

        let d = &mut self.decl;
        d.line(format!("/* cgopy bindings for package {}", origin));
        d.line(" * generated by cgopy; DO NOT EDIT.");
        d.line(" */");
        d.line(format!("#ifndef {}", guard));
        d.line(format!("#define {} 1", guard));
        d.blank();
        d.line("#include \"Python.h\"");
        d.blank();
        d.line("#include <complex.h>");
        d.line("#include <math.h>");
        d.line("#include <stdint.h>");
        d.line("#include <stdlib.h>");
        d.blank();
        d.line(format!("#include \"{}\"", self.options.glue_header));
        d.line(format!("#include \"{}\"", self.options.runtime_header));
        d.blank();

        let i = &mut self.impl_;
        i.line(format!("/* cgopy bindings for package {}; DO NOT EDIT. */", origin));
        i.blank();
        i.line(format!("#include \"{}\"", self.options.header_name));
        i.blank();
    }

    /// Emit a prototype into the declarations and open the definition
    pub(super) fn open_func(&mut self, comment: &str, ret: &str, name: &str, params: &str) {
        self.decl.blank();
        self.decl.line(format!("/* {} */", comment));
        self.decl.line(format!("static {}", ret));
        self.decl.line(format!("{}({});", name, params));

        self.impl_.blank();
        self.impl_.line(format!("/* {} */", comment));
        self.impl_.line(format!("static {}", ret));
        self.impl_.line(format!("{}({}) {{", name, params));
        self.impl_.indent();
    }

    pub(super) fn close_func(&mut self) {
        self.impl_.outdent();
        self.impl_.line("}");
    }

    /// `if (<cond>) { <error>; return <ret>; }` in the implementation
    pub(super) fn guard_error(&mut self, cond: &str, exc: &str, msg: &str, ret: &str) {
        let p = &mut self.impl_;
        p.line(format!("if ({}) {{", cond));
        p.indent();
        p.line(format!("PyErr_SetString({}, {});", exc, c_quote(msg)));
        p.line(format!("return {};", ret));
        p.outdent();
        p.line("}");
    }

    /// Display name of a binding, `pkg.Name` or `pkg.[]T`
    pub(super) fn display_name(sym: &Symbol) -> String {
        sym.qualified_name()
    }
}

/// Generate both artifacts for a resolved table
pub fn generate(table: &SymbolTable<'_>, options: GenOptions) -> Artifacts {
    CpyGenerator::new(table, options).generate()
}
