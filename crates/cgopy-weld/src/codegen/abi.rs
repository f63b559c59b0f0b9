//! Host ABI details
//!
//! The static type object of an extension type is a positional initializer;
//! its slot order is fixed by the host runtime and differs slightly between
//! the CPython 2 and CPython 3 ABIs.

use crate::codegen::printer::{c_quote, Printer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host runtime ABI the generated extension is compiled against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostAbi {
    CPython2,
    #[default]
    CPython3,
}

impl HostAbi {
    pub fn name(self) -> &'static str {
        match self {
            HostAbi::CPython2 => "cpython2",
            HostAbi::CPython3 => "cpython3",
        }
    }

    /// Expression freeing a host object through its type
    pub fn tp_free(self, obj: &str) -> String {
        match self {
            HostAbi::CPython2 => format!("{}->ob_type->tp_free((PyObject*){});", obj, obj),
            HostAbi::CPython3 => format!("Py_TYPE({})->tp_free((PyObject*){});", obj, obj),
        }
    }
}

impl fmt::Display for HostAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HostAbi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpython2" | "py2" | "2" => Ok(HostAbi::CPython2),
            "cpython3" | "py3" | "3" => Ok(HostAbi::CPython3),
            other => Err(format!(
                "unknown host ABI: {} (expected cpython2 or cpython3)",
                other
            )),
        }
    }
}

/// Values of the type-object slots that vary per binding
#[derive(Debug, Clone)]
pub struct TypeSlots {
    /// Symbol the object is named after (`cpy_type_<id>`)
    pub object: String,
    /// `tp_name`, e.g. `pkg.Name`
    pub name: String,
    pub dealloc: String,
    pub tp_str: String,
    pub as_sequence: Option<String>,
    pub as_buffer: Option<String>,
    pub doc: String,
    pub methods: String,
    pub getsets: String,
    pub init: String,
    pub new: String,
}

impl TypeSlots {
    /// Emit `static PyTypeObject <object>Type = {...};`
    pub fn render(&self, abi: HostAbi, p: &mut Printer) {
        let or_zero = |slot: &Option<String>| slot.clone().unwrap_or_else(|| "0".to_string());

        p.line(format!("static PyTypeObject {}Type = {{", self.object));
        p.indent();
        match abi {
            HostAbi::CPython2 => {
                p.line("PyObject_HEAD_INIT(NULL)");
                p.line("0,\t/*ob_size*/");
            }
            HostAbi::CPython3 => p.line("PyVarObject_HEAD_INIT(NULL, 0)"),
        }
        p.line(format!("{},\t/*tp_name*/", c_quote(&self.name)));
        p.line(format!("sizeof({}),\t/*tp_basicsize*/", self.object));
        p.line("0,\t/*tp_itemsize*/");
        p.line(format!("(destructor){},\t/*tp_dealloc*/", self.dealloc));
        match abi {
            HostAbi::CPython2 => p.line("0,\t/*tp_print*/"),
            HostAbi::CPython3 => p.line("0,\t/*tp_vectorcall_offset*/"),
        }
        p.line("0,\t/*tp_getattr*/");
        p.line("0,\t/*tp_setattr*/");
        match abi {
            HostAbi::CPython2 => p.line("0,\t/*tp_compare*/"),
            HostAbi::CPython3 => p.line("0,\t/*tp_as_async*/"),
        }
        p.line("0,\t/*tp_repr*/");
        p.line("0,\t/*tp_as_number*/");
        p.line(format!("{},\t/*tp_as_sequence*/", or_zero(&self.as_sequence)));
        p.line("0,\t/*tp_as_mapping*/");
        p.line("0,\t/*tp_hash */");
        p.line("0,\t/*tp_call*/");
        p.line(format!("{},\t/*tp_str*/", self.tp_str));
        p.line("0,\t/*tp_getattro*/");
        p.line("0,\t/*tp_setattro*/");
        p.line(format!("{},\t/*tp_as_buffer*/", or_zero(&self.as_buffer)));
        p.line(format!("{},\t/*tp_flags*/", self.flags(abi)));
        p.line(format!("{},\t/* tp_doc */", c_quote(&self.doc)));
        p.line("0,\t/* tp_traverse */");
        p.line("0,\t/* tp_clear */");
        p.line("0,\t/* tp_richcompare */");
        p.line("0,\t/* tp_weaklistoffset */");
        p.line("0,\t/* tp_iter */");
        p.line("0,\t/* tp_iternext */");
        p.line(format!("{},             /* tp_methods */", self.methods));
        p.line("0,\t/* tp_members */");
        p.line(format!("{},\t/* tp_getset */", self.getsets));
        p.line("0,\t/* tp_base */");
        p.line("0,\t/* tp_dict */");
        p.line("0,\t/* tp_descr_get */");
        p.line("0,\t/* tp_descr_set */");
        p.line("0,\t/* tp_dictoffset */");
        p.line(format!("(initproc){},      /* tp_init */", self.init));
        p.line("0,                         /* tp_alloc */");
        p.line(format!("{},\t/* tp_new */", self.new));
        p.outdent();
        p.line("};");
        p.blank();
    }

    fn flags(&self, abi: HostAbi) -> String {
        match abi {
            HostAbi::CPython2 if self.as_buffer.is_some() => {
                "(Py_TPFLAGS_DEFAULT |\n Py_TPFLAGS_HAVE_NEWBUFFER)".to_string()
            }
            _ => "Py_TPFLAGS_DEFAULT".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots() -> TypeSlots {
        TypeSlots {
            object: "cpy_type_p_S".to_string(),
            name: "p.S".to_string(),
            dealloc: "cpy_func_p_S_dealloc".to_string(),
            tp_str: "cpy_func_p_S_tp_str".to_string(),
            as_sequence: None,
            as_buffer: None,
            doc: "S is a struct".to_string(),
            methods: "cpy_type_p_S_methods".to_string(),
            getsets: "cpy_type_p_S_getsets".to_string(),
            init: "cpy_func_p_S_init".to_string(),
            new: "cpy_func_p_S_new".to_string(),
        }
    }

    fn slot_comments(text: &str) -> Vec<String> {
        text.lines()
            .filter_map(|l| l.split("/*").nth(1))
            .map(|c| c.trim_end_matches("*/").trim().to_string())
            .collect()
    }

    #[test]
    fn test_slot_order_cpython2() {
        let mut p = Printer::new();
        slots().render(HostAbi::CPython2, &mut p);
        let text = p.into_string();

        assert!(text.starts_with("static PyTypeObject cpy_type_p_SType = {\n\tPyObject_HEAD_INIT(NULL)\n"));
        let comments = slot_comments(&text);
        assert_eq!(comments.len(), 38);
        assert_eq!(comments[0], "ob_size");
        assert_eq!(comments[1], "tp_name");
        assert_eq!(comments[5], "tp_print");
        assert_eq!(comments[8], "tp_compare");
        assert_eq!(comments[11], "tp_as_sequence");
        assert_eq!(comments[18], "tp_as_buffer");
        assert_eq!(comments[27], "tp_methods");
        assert_eq!(comments[29], "tp_getset");
        assert_eq!(comments[37], "tp_new");
        assert!(text.contains("\t\"S is a struct\",\t/* tp_doc */\n"));
        assert!(text.contains("\t(initproc)cpy_func_p_S_init,      /* tp_init */\n"));
    }

    #[test]
    fn test_slot_order_cpython3() {
        let mut p = Printer::new();
        slots().render(HostAbi::CPython3, &mut p);
        let text = p.into_string();

        assert!(text.contains("\tPyVarObject_HEAD_INIT(NULL, 0)\n"));
        assert!(!text.contains("ob_size"));
        let comments = slot_comments(&text);
        assert_eq!(comments.len(), 37);
        assert_eq!(comments[4], "tp_vectorcall_offset");
        assert_eq!(comments[7], "tp_as_async");
        assert_eq!(comments[36], "tp_new");
    }

    #[test]
    fn test_buffer_flags() {
        let mut s = slots();
        s.as_sequence = Some("&cpy_type_p_S_tp_as_sequence".to_string());
        s.as_buffer = Some("&cpy_type_p_S_tp_as_buffer".to_string());

        let mut p2 = Printer::new();
        s.render(HostAbi::CPython2, &mut p2);
        assert!(p2
            .as_str()
            .contains("\t(Py_TPFLAGS_DEFAULT |\n\t Py_TPFLAGS_HAVE_NEWBUFFER),\t/*tp_flags*/\n"));

        let mut p3 = Printer::new();
        s.render(HostAbi::CPython3, &mut p3);
        assert!(p3.as_str().contains("\tPy_TPFLAGS_DEFAULT,\t/*tp_flags*/\n"));
        assert!(p3
            .as_str()
            .contains("\t&cpy_type_p_S_tp_as_buffer,\t/*tp_as_buffer*/\n"));
    }

    #[test]
    fn test_abi_from_str() {
        assert_eq!("cpython2".parse::<HostAbi>(), Ok(HostAbi::CPython2));
        assert_eq!("py3".parse::<HostAbi>(), Ok(HostAbi::CPython3));
        assert!("jython".parse::<HostAbi>().is_err());
    }
}
