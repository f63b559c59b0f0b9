//! Wrappers for package-level functions, constants and variables

use super::marshal::{c_literal, to_host, CallSite};
use super::CpyGenerator;
use crate::ir::{FuncSig, ParamSymbol, Symbol, SymbolId, SymbolKind};

/// One entry of the module method table
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ModuleEntry {
    pub name: String,
    pub func: String,
    pub flags: &'static str,
    pub doc: String,
}

impl ModuleEntry {
    fn new(
        name: impl Into<String>,
        func: impl Into<String>,
        takes_args: bool,
        doc: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            func: func.into(),
            flags: if takes_args { "METH_VARARGS" } else { "METH_NOARGS" },
            doc: doc.unwrap_or_default().to_string(),
        }
    }
}

impl CpyGenerator<'_, '_> {
    /// Emit the wrapper(s) of one package-level declaration
    pub(super) fn gen_decl_wrappers(&mut self, sym: &Symbol) -> Vec<ModuleEntry> {
        match &sym.kind {
            SymbolKind::Func(sig) => vec![self.gen_func(sym, sig)],
            SymbolKind::Const { ty, .. } => vec![self.gen_const(sym, *ty)],
            SymbolKind::Var { ty } => self.gen_var(sym, *ty),
            SymbolKind::Type(_) => Vec::new(),
        }
    }

    fn gen_func(&mut self, sym: &Symbol, sig: &FuncSig) -> ModuleEntry {
        self.open_func(
            &format!("wrapper of {}", sym.qualified_name()),
            "PyObject*",
            &sym.cpy_name,
            "PyObject *self, PyObject *args",
        );
        CallSite {
            target: sym.cgo_name.clone(),
            receiver: None,
            sig,
        }
        .emit(self.table, &mut self.impl_);
        self.close_func();

        ModuleEntry::new(&sym.name, &sym.cpy_name, !sig.params.is_empty(), sym.doc.as_deref())
    }

    /// Accessor of a constant, inlining its literal when known
    fn gen_const(&mut self, sym: &Symbol, ty: SymbolId) -> ModuleEntry {
        let table = self.table;
        let tsym = table.symbol(ty);
        self.open_func(
            &format!("accessor for constant {}", sym.qualified_name()),
            "PyObject*",
            &sym.cpy_name,
            "PyObject *self, PyObject *args",
        );
        let init = match &sym.kind {
            SymbolKind::Const {
                value: Some(value), ..
            } => c_literal(value),
            _ => format!("{}()", sym.cgo_name),
        };
        self.impl_
            .line(format!("{} c_gopy_ret = {};", tsym.cgo_name, init));
        self.impl_
            .line(format!("return {};", to_host(tsym, "c_gopy_ret")));
        self.close_func();

        ModuleEntry::new(&sym.name, &sym.cpy_name, false, sym.doc.as_deref())
    }

    /// `Get<Name>` / `Set<Name>` accessors of a variable
    fn gen_var(&mut self, sym: &Symbol, ty: SymbolId) -> Vec<ModuleEntry> {
        let get = FuncSig {
            params: Vec::new(),
            results: vec![ty],
        };
        let set = FuncSig {
            params: vec![ParamSymbol {
                name: "value".to_string(),
                ty,
            }],
            results: Vec::new(),
        };

        let mut entries = Vec::with_capacity(2);
        for (verb, suffix, sig) in [("Get", "get", &get), ("Set", "set", &set)] {
            let func = format!("{}_{}", sym.cpy_name, suffix);
            self.open_func(
                &format!("{}ter for variable {}", suffix, sym.qualified_name()),
                "PyObject*",
                &func,
                "PyObject *self, PyObject *args",
            );
            CallSite {
                target: format!("{}_{}", sym.cgo_name, suffix),
                receiver: None,
                sig,
            }
            .emit(self.table, &mut self.impl_);
            self.close_func();

            entries.push(ModuleEntry::new(
                format!("{}{}", verb, sym.name),
                func,
                !sig.params.is_empty(),
                sym.doc.as_deref(),
            ));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::{generate, Artifacts, GenOptions, HostAbi};
    use crate::ir::{Decl, HostValue, Package, ParamDecl, SymbolTable, TypeExpr, Universe, WordSize};

    fn generate_for(pkg: &Package) -> Artifacts {
        let universe = Universe::new(WordSize::W64);
        let table = SymbolTable::build(&universe, pkg).unwrap();
        generate(&table, GenOptions::new(&pkg.name).with_abi(HostAbi::CPython3))
    }

    fn section<'s>(text: &'s str, start: &str) -> &'s str {
        let from = text.find(start).unwrap_or_else(|| panic!("{} not found", start));
        let rest = &text[from..];
        let end = rest
            .find("\n}")
            .and_then(|e| rest[e + 1..].find('\n').map(|nl| e + nl + 2))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    #[test]
    fn test_free_function_wrapper() {
        let pkg = Package::new("calc").decl(Decl::func(
            "Div",
            vec![
                ParamDecl::new("a", TypeExpr::basic("int64")),
                ParamDecl::new("b", TypeExpr::basic("int64")),
            ],
            vec![TypeExpr::basic("int64"), TypeExpr::basic("error")],
        ));
        let out = generate_for(&pkg);

        assert!(out.declarations.contains(
            "/* wrapper of calc.Div */\nstatic PyObject*\ncpy_func_calc_Div(PyObject *self, PyObject *args);\n"
        ));
        let body = section(&out.implementation, "static PyObject*\ncpy_func_calc_Div(");
        assert!(body.contains("\tif (!PyArg_ParseTuple(args, \"kk\", &c_arg0, &c_arg1)) {\n"));
        assert!(body.contains(
            "\tstruct cgo_func_calc_Div_return c_gopy_ret = cgo_func_calc_Div(c_arg0, c_arg1);\n"
        ));
        assert!(body.contains("\tif (!_cgopy_ErrorIsNil(c_gopy_ret.r1)) {\n"));
        assert!(body.contains("\treturn Py_BuildValue(\"k\", c_gopy_ret.r0);\n"));
    }

    #[test]
    fn test_constant_accessors() {
        let pkg = Package::new("calc")
            .decl(
                Decl::constant("Answer", TypeExpr::basic("untyped int"))
                    .with_value(HostValue::Int(42)),
            )
            .decl(
                Decl::constant("Greeting", TypeExpr::basic("string"))
                    .with_value(HostValue::Str("hi".to_string())),
            )
            .decl(Decl::constant("Opaque", TypeExpr::basic("float32")));
        let out = generate_for(&pkg);

        let answer = section(&out.implementation, "static PyObject*\ncpy_const_calc_Answer(");
        assert!(answer.contains("\tGoInt c_gopy_ret = 42;\n\treturn Py_BuildValue(\"k\", c_gopy_ret);\n"));

        let greeting = section(&out.implementation, "static PyObject*\ncpy_const_calc_Greeting(");
        assert!(greeting.contains("\tGoString c_gopy_ret = {\"hi\", 2};\n"));
        assert!(greeting.contains("\treturn cgopy_cnv_c2py_string(&c_gopy_ret);\n"));

        let opaque = section(&out.implementation, "static PyObject*\ncpy_const_calc_Opaque(");
        assert!(opaque.contains("\tGoFloat32 c_gopy_ret = cgo_const_calc_Opaque();\n"));
    }

    #[test]
    fn test_variable_accessors() {
        let pkg = Package::new("calc").decl(Decl::var("Ratio", TypeExpr::basic("float64")));
        let out = generate_for(&pkg);

        let get = section(&out.implementation, "static PyObject*\ncpy_var_calc_Ratio_get(");
        assert!(get.contains("\tGoFloat64 c_gopy_ret = cgo_var_calc_Ratio_get();\n"));

        let set = section(&out.implementation, "static PyObject*\ncpy_var_calc_Ratio_set(");
        assert!(set.contains("\tif (!PyArg_ParseTuple(args, \"d\", &c_arg0)) {\n"));
        assert!(set.contains("\tcgo_var_calc_Ratio_set(c_arg0);\n"));
        assert!(set.contains("\tPy_INCREF(Py_None);\n\treturn Py_None;\n"));

        assert!(out.implementation.contains(
            "\t{\"GetRatio\", (PyCFunction)cpy_var_calc_Ratio_get, METH_NOARGS, \"\"},\n\t{\"SetRatio\", (PyCFunction)cpy_var_calc_Ratio_set, METH_VARARGS, \"\"},\n"
        ));
    }
}
