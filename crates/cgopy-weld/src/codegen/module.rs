//! Module surface: method table and init function

use super::funcs::ModuleEntry;
use super::{c_quote, CpyGenerator, HostAbi};
use crate::ir::SymbolId;

impl CpyGenerator<'_, '_> {
    /// Wrap the package-level declarations and emit the module entry point
    pub(super) fn gen_module(&mut self, bindings: &[SymbolId]) {
        let table = self.table;
        let pkg = table.package();

        self.decl.blank();
        self.decl
            .line(format!("/* --- module functions for package {} --- */", pkg.name));
        self.impl_.blank();
        self.impl_
            .line(format!("/* --- module functions for package {} --- */", pkg.name));

        let mut entries = Vec::new();
        for (_, sym) in table.iter() {
            entries.extend(self.gen_decl_wrappers(sym));
        }
        self.gen_method_table(&entries);

        let types: Vec<(String, String, bool)> = bindings
            .iter()
            .map(|id| {
                let sym = table.symbol(*id);
                (sym.cpy_name.clone(), sym.name.clone(), sym.named)
            })
            .collect();

        match self.options.abi {
            HostAbi::CPython2 => self.gen_init_py2(&types),
            HostAbi::CPython3 => self.gen_init_py3(&types),
        }
    }

    fn gen_method_table(&mut self, entries: &[ModuleEntry]) {
        let pkg = self.table.package();
        let p = &mut self.impl_;
        p.blank();
        p.line(format!("/* functions for package {} */", pkg.name));
        p.line(format!("static PyMethodDef cpy_{}_methods[] = {{", pkg.name));
        p.indent();
        for entry in entries {
            p.line(format!(
                "{{{}, (PyCFunction){}, {}, {}}},",
                c_quote(&entry.name),
                entry.func,
                entry.flags,
                c_quote(&entry.doc)
            ));
        }
        p.line("{NULL, NULL, 0, NULL} /* Sentinel */");
        p.outdent();
        p.line("};");
    }

    /// `PyType_Ready` every binding, bailing out with `fail`
    fn gen_ready_types(&mut self, types: &[(String, String, bool)], fail: &str) {
        for (object, _, _) in types {
            self.impl_.line(format!(
                "if (PyType_Ready(&{}Type) < 0) {{ return{}; }}",
                object, fail
            ));
        }
    }

    /// Register the named types on `module`
    fn gen_add_types(&mut self, types: &[(String, String, bool)]) {
        for (object, name, _) in types.iter().filter(|(_, _, named)| *named) {
            self.impl_.blank();
            self.impl_.line(format!("Py_INCREF(&{}Type);", object));
            self.impl_.line(format!(
                "PyModule_AddObject(module, {}, (PyObject*)&{}Type);",
                c_quote(name),
                object
            ));
        }
    }

    fn gen_init_py2(&mut self, types: &[(String, String, bool)]) {
        let pkg = self.table.package();
        let doc = pkg.doc.clone().unwrap_or_default();

        self.decl.blank();
        self.decl.line("PyMODINIT_FUNC");
        self.decl.line(format!("init{}(void);", pkg.name));

        let p = &mut self.impl_;
        p.blank();
        p.line("PyMODINIT_FUNC");
        p.line(format!("init{}(void) {{", pkg.name));
        p.indent();
        p.line("PyObject *module = NULL;");
        p.blank();
        self.gen_ready_types(types, "");
        let p = &mut self.impl_;
        p.blank();
        p.line(format!(
            "module = Py_InitModule3({}, cpy_{}_methods, {});",
            c_quote(&pkg.name),
            pkg.name,
            c_quote(&doc)
        ));
        p.line("if (module == NULL) { return; }");
        self.gen_add_types(types);
        self.close_func();
    }

    fn gen_init_py3(&mut self, types: &[(String, String, bool)]) {
        let pkg = self.table.package();
        let doc = pkg.doc.clone().unwrap_or_default();

        let p = &mut self.impl_;
        p.blank();
        p.line(format!("static struct PyModuleDef cpy_{}_module = {{", pkg.name));
        p.indent();
        p.line("PyModuleDef_HEAD_INIT,");
        p.line(format!("{},", c_quote(&pkg.name)));
        p.line(format!("{},", c_quote(&doc)));
        p.line("-1,");
        p.line(format!("cpy_{}_methods,", pkg.name));
        p.outdent();
        p.line("};");

        self.decl.blank();
        self.decl.line("PyMODINIT_FUNC");
        self.decl.line(format!("PyInit_{}(void);", pkg.name));

        let p = &mut self.impl_;
        p.blank();
        p.line("PyMODINIT_FUNC");
        p.line(format!("PyInit_{}(void) {{", pkg.name));
        p.indent();
        p.line("PyObject *module = NULL;");
        p.blank();
        self.gen_ready_types(types, " NULL");
        let p = &mut self.impl_;
        p.blank();
        p.line(format!("module = PyModule_Create(&cpy_{}_module);", pkg.name));
        p.line("if (module == NULL) { return NULL; }");
        self.gen_add_types(types);
        self.impl_.blank();
        self.impl_.line("return module;");
        self.close_func();
    }
}
