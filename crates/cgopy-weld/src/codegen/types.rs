//! Extension types for named types and anonymous composites

use super::marshal::{from_host, to_host, CallSite, Receiver};
use super::{c_quote, CpyGenerator, HostAbi, TypeSlots};
use crate::ir::{Symbol, TypeShape};
use indexmap::IndexSet;

impl CpyGenerator<'_, '_> {
    /// Emit the extension type of a non-struct binding
    pub(super) fn gen_type(&mut self, sym: &Symbol) {
        self.gen_layout(sym, "type");

        self.gen_new(sym);
        self.gen_dealloc(sym);
        self.gen_init(sym, None);
        self.gen_getsets(sym);
        self.gen_methods(sym);
        self.gen_tp_str(sym);

        let table = self.table;
        let (as_sequence, as_buffer) = match sym.shape() {
            Some(TypeShape::Array { elem, len }) => {
                let elem = table.symbol(*elem);
                self.gen_sequence(sym, elem, Some(*len));
                self.gen_buffer(sym, elem, Some(*len));
                (true, true)
            }
            Some(TypeShape::Slice { elem }) => {
                let elem = table.symbol(*elem);
                self.gen_sequence(sym, elem, None);
                self.gen_buffer(sym, elem, None);
                (true, true)
            }
            _ => (false, false),
        };

        let mut slots = self.type_slots(sym);
        if as_sequence {
            slots.as_sequence = Some(format!("&{}_tp_as_sequence", sym.cpy_name));
        }
        if as_buffer {
            slots.as_buffer = Some(format!("&{}_tp_as_buffer", sym.cpy_name));
        }
        self.impl_.blank();
        slots.render(self.options.abi, &mut self.impl_);

        self.gen_converters(sym);
    }

    /// Native handle typedef and host-object layout
    pub(super) fn gen_layout(&mut self, sym: &Symbol, what: &str) {
        let name = Self::display_name(sym);
        let d = &mut self.decl;
        d.blank();
        d.line(format!("/* --- decls for {} {} --- */", what, name));
        match sym.basic_kind() {
            Some(kind) => {
                let native = self
                    .table
                    .universe()
                    .basic(kind)
                    .map_or("void*", |b| b.cgo_name.as_str());
                d.line(format!("typedef {} {};", native, sym.cgo_name));
            }
            None => d.line(format!("typedef void* {};", sym.cgo_name)),
        }
        d.blank();
        d.line(format!("/* Python type for {} {}", what, name));
        d.line(" */");
        d.line("typedef struct {");
        d.indent();
        d.line("PyObject_HEAD");
        if sym.is_basic() {
            d.line(format!("{} cgopy; /* value of {} */", sym.cgo_name, sym.id));
        } else {
            d.line(format!("{} cgopy; /* unsafe.Pointer to {} */", sym.cgo_name, sym.id));
        }
        d.outdent();
        d.line(format!("}} {};", sym.cpy_name));
        d.blank();
        d.line(format!("static PyTypeObject {}Type;", sym.cpy_name));

        self.impl_.blank();
        self.impl_.line(format!("/* --- impl for {} */", name));
    }

    pub(super) fn gen_new(&mut self, sym: &Symbol) {
        self.open_func(
            &format!("tp_new for {}", Self::display_name(sym)),
            "PyObject*",
            &format!("cpy_func_{}_new", sym.id),
            "PyTypeObject *type, PyObject *args, PyObject *kwds",
        );
        let p = &mut self.impl_;
        p.line(format!("{} *self;", sym.cpy_name));
        p.line(format!("self = ({} *)type->tp_alloc(type, 0);", sym.cpy_name));
        p.line("if (self == NULL) {");
        p.indent();
        p.line("return NULL;");
        p.outdent();
        p.line("}");
        p.line(format!("self->cgopy = cgo_func_{}_new();", sym.id));
        p.line("return (PyObject*)self;");
        self.close_func();
    }

    pub(super) fn gen_dealloc(&mut self, sym: &Symbol) {
        self.open_func(
            &format!("tp_dealloc for {}", Self::display_name(sym)),
            "void",
            &format!("cpy_func_{}_dealloc", sym.id),
            &format!("{} *self", sym.cpy_name),
        );
        if !sym.is_basic() {
            self.impl_
                .line(format!("cgopy_decref(({})(self->cgopy));", sym.cgo_name));
        }
        let free = self.options.abi.tp_free("self");
        self.impl_.line(free);
        self.close_func();
    }

    /// Initializer rejecting every argument
    ///
    /// Struct bindings pass the keyword names collected from their
    /// constructors; the list is declared but not dispatched on.
    pub(super) fn gen_init(&mut self, sym: &Symbol, kwds: Option<&IndexSet<String>>) {
        self.open_func(
            &format!("tp_init for {}", Self::display_name(sym)),
            "int",
            &format!("cpy_func_{}_init", sym.id),
            &format!("{} *self, PyObject *args, PyObject *kwds", sym.cpy_name),
        );
        if let Some(kwds) = kwds {
            let p = &mut self.impl_;
            p.line("static char *kwlist[] = {");
            p.indent();
            for (i, kwd) in kwds.iter().enumerate() {
                p.line(format!("{}, /* py_kwd_{} */", c_quote(kwd), i));
            }
            p.line("NULL");
            p.outdent();
            p.line("};");
            for i in 0..kwds.len() {
                p.line(format!("PyObject *py_kwd_{} = NULL;", i));
            }
        }
        self.impl_
            .line("Py_ssize_t nkwds = (kwds != NULL) ? PyDict_Size(kwds) : 0;");
        self.impl_
            .line("Py_ssize_t nargs = (args != NULL) ? PySequence_Size(args) : 0;");
        self.guard_error(
            "(nkwds + nargs) > 0",
            "PyExc_TypeError",
            &format!("{}.__init__ takes no argument", sym.name),
            "-1",
        );
        self.impl_.blank();
        self.impl_.line("return 0;");
        self.close_func();
    }

    /// Attribute table; only struct bindings carry entries
    pub(super) fn gen_getsets(&mut self, sym: &Symbol) {
        let name = Self::display_name(sym);
        let p = &mut self.impl_;
        p.blank();
        p.line(format!("/* tp_getset for {} */", name));
        p.line(format!("static PyGetSetDef {}_getsets[] = {{", sym.cpy_name));
        p.indent();
        if let Some(TypeShape::Struct { fields }) = sym.shape() {
            for field in fields.iter().filter(|f| f.exported) {
                let doc = field
                    .doc
                    .clone()
                    .unwrap_or_else(|| format!("doc for {}", field.name));
                p.line(format!(
                    "{{{}, (getter)cpy_func_{}_getter_{}, (setter)cpy_func_{}_setter_{}, {}, NULL}},",
                    c_quote(&field.name),
                    sym.id,
                    field.index + 1,
                    sym.id,
                    field.index + 1,
                    c_quote(&doc)
                ));
            }
        }
        p.line("{NULL} /* Sentinel */");
        p.outdent();
        p.line("};");
    }

    /// Method wrappers and the method table
    pub(super) fn gen_methods(&mut self, sym: &Symbol) {
        let name = Self::display_name(sym);
        for method in &sym.methods {
            self.open_func(
                &format!("wrapper of {}.{}", name, method.name),
                "PyObject*",
                &format!("cpy_func_{}", method.id),
                "PyObject *self, PyObject *args",
            );
            CallSite {
                target: format!("cgo_func_{}", method.id),
                receiver: Some(Receiver {
                    ctype: sym.cgo_name.clone(),
                    expr: format!("(({}*)self)->cgopy", sym.cpy_name),
                }),
                sig: &method.sig,
            }
            .emit(self.table, &mut self.impl_);
            self.close_func();
        }

        let p = &mut self.impl_;
        p.blank();
        p.line(format!("/* methods for {} */", name));
        p.line(format!("static PyMethodDef {}_methods[] = {{", sym.cpy_name));
        p.indent();
        for method in &sym.methods {
            let flags = if method.sig.params.is_empty() {
                "METH_NOARGS"
            } else {
                "METH_VARARGS"
            };
            p.line(format!(
                "{{{}, (PyCFunction)cpy_func_{}, {}, {}}},",
                c_quote(&method.name),
                method.id,
                flags,
                c_quote(method.doc.as_deref().unwrap_or_default())
            ));
        }
        p.line("{NULL} /* sentinel */");
        p.outdent();
        p.line("};");
    }

    pub(super) fn gen_tp_str(&mut self, sym: &Symbol) {
        self.open_func(
            &format!("__str__ support for {}", Self::display_name(sym)),
            "PyObject*",
            &format!("cpy_func_{}_tp_str", sym.id),
            "PyObject *self",
        );
        let p = &mut self.impl_;
        p.line(format!(
            "{} c_self = (({}*)self)->cgopy;",
            sym.cgo_name, sym.cpy_name
        ));
        p.line(format!("GoString str = cgo_func_{}_str(c_self);", sym.id));
        p.line("return cgopy_cnv_c2py_string(&str);");
        self.close_func();
    }

    /// Guard `i` against the bounds of an array (`len`) or slice
    fn gen_bounds_check(&mut self, len: Option<u64>, msg: &str, ret: &str) {
        let cond = match len {
            Some(n) => format!("i < 0 || i >= {}", n),
            None => {
                self.impl_.line("GoSlice *slice = (GoSlice*)(self->cgopy);");
                "i < 0 || i >= slice->len".to_string()
            }
        };
        self.guard_error(&cond, "PyExc_IndexError", msg, ret);
        self.impl_.blank();
    }

    fn gen_sequence(&mut self, sym: &Symbol, elem: &Symbol, len: Option<u64>) {
        let name = Self::display_name(sym);
        self.decl.blank();
        self.decl.line(format!("/* sequence support for {} */", name));

        self.open_func(
            "len",
            "Py_ssize_t",
            &format!("cpy_func_{}_len", sym.id),
            &format!("{} *self", sym.cpy_name),
        );
        match len {
            Some(n) => self.impl_.line(format!("return {};", n)),
            None => {
                self.impl_.line("GoSlice *slice = (GoSlice*)(self->cgopy);");
                self.impl_.line("return slice->len;");
            }
        }
        self.close_func();

        self.open_func(
            "item",
            "PyObject*",
            &format!("cpy_func_{}_item", sym.id),
            &format!("{} *self, Py_ssize_t i", sym.cpy_name),
        );
        self.gen_bounds_check(len, "array index out of range", "NULL");
        self.impl_.line(format!(
            "{} item = cgo_func_{}_item(self->cgopy, i);",
            elem.cgo_name, sym.id
        ));
        self.impl_.line(format!("return {};", to_host(elem, "item")));
        self.close_func();

        self.open_func(
            "ass_item",
            "int",
            &format!("cpy_func_{}_ass_item", sym.id),
            &format!("{} *self, Py_ssize_t i, PyObject *v", sym.cpy_name),
        );
        self.impl_.line(format!("{} c_v;", elem.cgo_name));
        self.gen_bounds_check(len, "array assignment index out of range", "-1");
        self.impl_.line("if (v == NULL) { return 0; }");
        self.impl_
            .line(format!("if (!{}) {{ return -1; }}", from_host(elem, "v", "c_v")));
        self.impl_
            .line(format!("cgo_func_{}_ass_item(self->cgopy, i, c_v);", sym.id));
        self.impl_.line("return 0;");
        self.close_func();

        let py3 = self.options.abi == HostAbi::CPython3;
        let p = &mut self.impl_;
        p.blank();
        p.line("/* tp_as_sequence */");
        p.line(format!(
            "static PySequenceMethods {}_tp_as_sequence = {{",
            sym.cpy_name
        ));
        p.indent();
        p.line(format!("(lenfunc)cpy_func_{}_len,", sym.id));
        p.line("(binaryfunc)0,");
        p.line("(ssizeargfunc)0,");
        p.line(format!("(ssizeargfunc)cpy_func_{}_item,", sym.id));
        p.line(if py3 { "0," } else { "(ssizessizeargfunc)0," });
        p.line(format!("(ssizeobjargproc)cpy_func_{}_ass_item,", sym.id));
        p.line(if py3 { "0," } else { "(ssizessizeobjargproc)0," });
        p.line("(objobjproc)0,");
        p.line("(binaryfunc)0,");
        p.line("(ssizeargfunc)0");
        p.outdent();
        p.line("};");
    }

    fn gen_buffer(&mut self, sym: &Symbol, elem: &Symbol, len: Option<u64>) {
        let name = Self::display_name(sym);
        self.decl.blank();
        self.decl.line(format!("/* buffer support for {} */", name));

        self.open_func(
            &format!("__get_buffer__ impl for {}", name),
            "int",
            &format!("cpy_func_{}_getbuffer", sym.id),
            "PyObject *self, Py_buffer *view, int flags",
        );
        self.guard_error(
            "view == NULL",
            "PyExc_ValueError",
            "NULL view in getbuffer",
            "-1",
        );
        let p = &mut self.impl_;
        p.blank();
        p.line(format!("{0} *py = ({0}*)self;", sym.cpy_name));
        match len {
            Some(n) => {
                p.line("void *array = (void*)(py->cgopy);");
                p.line("view->obj = (PyObject*)py;");
                p.line("view->buf = (void*)array;");
                p.line(format!("view->len = {};", n));
            }
            None => {
                p.line("GoSlice *slice = (GoSlice*)(py->cgopy);");
                p.line("view->obj = (PyObject*)py;");
                p.line("view->buf = (void*)slice->data;");
                p.line("view->len = slice->len;");
            }
        }
        p.line("view->readonly = 0;");
        p.line(format!("view->itemsize = {};", elem.layout.size));
        p.line(format!("view->format = {};", c_quote(&elem.formats.buffer)));
        p.line("view->ndim = 1;");
        match len {
            Some(_) => p.line("view->shape = (Py_ssize_t*)&view->len;"),
            None => p.line("view->shape = (Py_ssize_t*)&slice->len;"),
        }
        p.line("view->strides = &view->itemsize;");
        p.line("view->suboffsets = NULL;");
        p.line("view->internal = NULL;");
        p.blank();
        p.line("Py_INCREF(py);");
        p.line("return 0;");
        self.close_func();

        if self.options.abi == HostAbi::CPython2 {
            self.gen_old_buffer(sym, len);
        }

        let p = &mut self.impl_;
        p.blank();
        p.line("/* tp_as_buffer */");
        p.line(format!("static PyBufferProcs {}_tp_as_buffer = {{", sym.cpy_name));
        p.indent();
        if self.options.abi == HostAbi::CPython2 {
            p.line(format!("(readbufferproc)cpy_func_{}_readbuffer,", sym.id));
            p.line(format!("(writebufferproc)cpy_func_{}_writebuffer,", sym.id));
            p.line(format!("(segcountproc)cpy_func_{}_segcount,", sym.id));
            p.line(format!("(charbufferproc)cpy_func_{}_charbuffer,", sym.id));
        }
        p.line(format!("(getbufferproc)cpy_func_{}_getbuffer,", sym.id));
        p.line("(releasebufferproc)0,");
        p.outdent();
        p.line("};");
    }

    /// Segment-based buffer slots of the CPython 2 ABI
    fn gen_old_buffer(&mut self, sym: &Symbol, len: Option<u64>) {
        self.open_func(
            "readbuffer",
            "Py_ssize_t",
            &format!("cpy_func_{}_readbuffer", sym.id),
            &format!("{} *self, Py_ssize_t index, const void **ptr", sym.cpy_name),
        );
        self.guard_error(
            "index != 0",
            "PyExc_SystemError",
            "Accessing non-existent array segment",
            "-1",
        );
        self.impl_.blank();
        match len {
            Some(n) => {
                self.impl_.line("*ptr = (void*)self->cgopy;");
                self.impl_.line(format!("return {};", n));
            }
            None => {
                self.impl_.line("GoSlice *slice = (GoSlice*)self->cgopy;");
                self.impl_.line("*ptr = (void*)slice->data;");
                self.impl_.line("return slice->len;");
            }
        }
        self.close_func();

        self.open_func(
            "writebuffer",
            "Py_ssize_t",
            &format!("cpy_func_{}_writebuffer", sym.id),
            &format!("{} *self, Py_ssize_t segment, void **ptr", sym.cpy_name),
        );
        self.impl_.line(format!(
            "return cpy_func_{}_readbuffer(self, segment, (const void**)ptr);",
            sym.id
        ));
        self.close_func();

        self.open_func(
            "segcount",
            "Py_ssize_t",
            &format!("cpy_func_{}_segcount", sym.id),
            &format!("{} *self, Py_ssize_t *lenp", sym.cpy_name),
        );
        match len {
            Some(n) => self.impl_.line(format!("if (lenp) {{ *lenp = {}; }}", n)),
            None => {
                self.impl_.line("GoSlice *slice = (GoSlice*)(self->cgopy);");
                self.impl_.line("if (lenp) { *lenp = slice->len; }");
            }
        }
        self.impl_.line("return 1;");
        self.close_func();

        self.open_func(
            "charbuffer",
            "Py_ssize_t",
            &format!("cpy_func_{}_charbuffer", sym.id),
            &format!("{} *self, Py_ssize_t segment, const char **ptr", sym.cpy_name),
        );
        self.impl_.line(format!(
            "return cpy_func_{}_readbuffer(self, segment, (const void**)ptr);",
            sym.id
        ));
        self.close_func();
    }

    /// Slot values shared by every binding
    pub(super) fn type_slots(&self, sym: &Symbol) -> TypeSlots {
        TypeSlots {
            object: sym.cpy_name.clone(),
            name: Self::display_name(sym),
            dealloc: format!("cpy_func_{}_dealloc", sym.id),
            tp_str: format!("cpy_func_{}_tp_str", sym.id),
            as_sequence: None,
            as_buffer: None,
            doc: sym.doc.clone().unwrap_or_default(),
            methods: format!("{}_methods", sym.cpy_name),
            getsets: format!("{}_getsets", sym.cpy_name),
            init: format!("cpy_func_{}_init", sym.id),
            new: format!("cpy_func_{}_new", sym.id),
        }
    }

    /// Converter pair wrapping and unwrapping the native handle
    pub(super) fn gen_converters(&mut self, sym: &Symbol) {
        let comment = format!("converters for {} - {}", sym.id, sym.name);
        self.open_func(
            &comment,
            "int",
            &format!("cgopy_cnv_py2c_{}", sym.id),
            &format!("PyObject *o, {} *addr", sym.cgo_name),
        );
        let p = &mut self.impl_;
        p.line(format!("{} *self = NULL;", sym.cpy_name));
        p.line(format!("self = ({} *)o;", sym.cpy_name));
        p.line("*addr = self->cgopy;");
        p.line("return 1;");
        self.close_func();

        self.open_func(
            &comment,
            "PyObject*",
            &format!("cgopy_cnv_c2py_{}", sym.id),
            &format!("{} *addr", sym.cgo_name),
        );
        let p = &mut self.impl_;
        p.line(format!(
            "PyObject *o = cpy_func_{}_new(&{}Type, 0, 0);",
            sym.id, sym.cpy_name
        ));
        p.line("if (o == NULL) {");
        p.indent();
        p.line("return NULL;");
        p.outdent();
        p.line("}");
        p.line(format!("(({}*)o)->cgopy = *addr;", sym.cpy_name));
        p.line("return o;");
        self.close_func();
    }
}
