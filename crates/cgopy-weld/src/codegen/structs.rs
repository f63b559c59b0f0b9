//! Struct bindings: field accessors and constructor keywords

use super::marshal::{parse_spec, to_host};
use super::{c_quote, CpyGenerator};
use crate::ir::{FieldSymbol, Symbol, SymbolKind, TypeShape};
use indexmap::IndexSet;

impl CpyGenerator<'_, '_> {
    pub(super) fn gen_struct(&mut self, sym: &Symbol) {
        self.gen_layout(sym, "struct");

        self.gen_new(sym);
        self.gen_dealloc(sym);
        let kwds = self.constructor_keywords(sym);
        self.gen_init(sym, Some(&kwds));

        if let Some(TypeShape::Struct { fields }) = sym.shape() {
            self.decl.blank();
            self.decl
                .line(format!("/* tp_getset for {} */", Self::display_name(sym)));
            for field in fields.iter().filter(|f| f.exported) {
                self.gen_getter(sym, field);
                self.gen_setter(sym, field);
            }
        }
        self.gen_getsets(sym);
        self.gen_methods(sym);
        self.gen_tp_str(sym);

        let slots = self.type_slots(sym);
        self.impl_.blank();
        slots.render(self.options.abi, &mut self.impl_);

        self.gen_converters(sym);
    }

    /// Parameter names of the package functions returning `sym` first,
    /// in first-seen order
    fn constructor_keywords(&self, sym: &Symbol) -> IndexSet<String> {
        let table = self.table;
        let mut kwds = IndexSet::new();
        for (_, func) in table.iter() {
            let SymbolKind::Func(sig) = &func.kind else {
                continue;
            };
            let returns_self = sig
                .results
                .first()
                .is_some_and(|r| table.symbol(*r).id == sym.id);
            if !returns_self {
                continue;
            }
            for param in sig.params.iter().filter(|p| !p.name.is_empty()) {
                kwds.insert(param.name.clone());
            }
        }
        kwds
    }

    fn gen_getter(&mut self, sym: &Symbol, field: &FieldSymbol) {
        let table = self.table;
        let fsym = table.symbol(field.ty);
        let n = field.index + 1;
        self.open_func(
            &format!("getter for {}.{}", Self::display_name(sym), field.name),
            "PyObject*",
            &format!("cpy_func_{}_getter_{}", sym.id, n),
            &format!("{} *self, void *closure", sym.cpy_name),
        );
        let p = &mut self.impl_;
        p.line(format!(
            "{} c_ret = cgo_func_{}_getter_{}(self->cgopy);",
            fsym.cgo_name, sym.id, n
        ));
        p.line(format!("return {};", to_host(fsym, "c_ret")));
        self.close_func();
    }

    fn gen_setter(&mut self, sym: &Symbol, field: &FieldSymbol) {
        let table = self.table;
        let fsym = table.symbol(field.ty);
        let n = field.index + 1;
        self.open_func(
            &format!("setter for {}.{}", Self::display_name(sym), field.name),
            "int",
            &format!("cpy_func_{}_setter_{}", sym.id, n),
            &format!("{} *self, PyObject *value, void *closure", sym.cpy_name),
        );
        let (format, addrs) = parse_spec(fsym, "c_value");
        let p = &mut self.impl_;
        p.line(format!("{} c_value;", fsym.cgo_name));
        p.line("PyObject *tuple = NULL;");
        p.blank();
        p.line("if (value == NULL) {");
        p.indent();
        p.line(format!(
            "PyErr_SetString(PyExc_TypeError, {});",
            c_quote(&format!("Cannot delete '{}' attribute", field.name))
        ));
        p.line("return -1;");
        p.outdent();
        p.line("}");
        p.blank();
        p.line("tuple = PyTuple_New(1);");
        p.line("Py_INCREF(value);");
        p.line("PyTuple_SET_ITEM(tuple, 0, value);");
        p.blank();
        p.line(format!(
            "if (!PyArg_ParseTuple(tuple, {}, {})) {{",
            c_quote(&format),
            addrs.join(", ")
        ));
        p.indent();
        p.line("Py_DECREF(tuple);");
        p.line("return -1;");
        p.outdent();
        p.line("}");
        p.line("Py_DECREF(tuple);");
        p.blank();
        p.line(format!(
            "cgo_func_{}_setter_{}(({})(self->cgopy), c_value);",
            sym.id, n, sym.cgo_name
        ));
        p.line("return 0;");
        self.close_func();
    }
}
