//! Marshaling rules
//!
//! A value crosses the boundary either through its type's converter pair
//! (parse code `O&`) or through the raw scalar code understood by
//! `PyArg_Parse*` and `Py_BuildValue`.

use crate::codegen::printer::{c_quote, Printer};
use crate::ir::{FuncSig, NativeValue, Symbol, SymbolTable};

/// Format code and argument list parsing a host value into `var`
pub fn parse_spec(sym: &Symbol, var: &str) -> (String, Vec<String>) {
    match &sym.converters {
        Some(conv) if sym.has_converter() => (
            "O&".to_string(),
            vec![conv.to_native.clone(), format!("&{}", var)],
        ),
        _ => (sym.formats.parse.clone(), vec![format!("&{}", var)]),
    }
}

/// Format code and argument list building a host value from `expr`
pub fn build_spec(sym: &Symbol, expr: &str) -> (String, Vec<String>) {
    match &sym.converters {
        Some(conv) if sym.has_converter() => (
            "O&".to_string(),
            vec![conv.to_host.clone(), format!("&{}", expr)],
        ),
        _ => (sym.formats.parse.clone(), vec![expr.to_string()]),
    }
}

/// Expression yielding a new host reference for the native lvalue `expr`
pub fn to_host(sym: &Symbol, expr: &str) -> String {
    match &sym.converters {
        Some(conv) if sym.has_converter() => format!("{}(&{})", conv.to_host, expr),
        _ => format!("Py_BuildValue({}, {})", c_quote(&sym.formats.parse), expr),
    }
}

/// Expression storing host object `src` into native `dst`, non-zero on success
pub fn from_host(sym: &Symbol, src: &str, dst: &str) -> String {
    match &sym.converters {
        Some(conv) if sym.has_converter() => format!("{}({}, &{})", conv.to_native, src, dst),
        _ => format!(
            "PyArg_Parse({}, {}, &{})",
            src,
            c_quote(&sym.formats.parse),
            dst
        ),
    }
}

/// Native receiver of a method call
pub struct Receiver {
    pub ctype: String,
    pub expr: String,
}

/// One wrapped call of a native entry point
pub struct CallSite<'s> {
    /// Native entry point, e.g. `cgo_func_pkg_Name`
    pub target: String,
    pub receiver: Option<Receiver>,
    pub sig: &'s FuncSig,
}

impl CallSite<'_> {
    /// Emit the body of a `PyObject* f(PyObject *self, PyObject *args)` wrapper
    pub fn emit(&self, table: &SymbolTable<'_>, p: &mut Printer) {
        let mut call_args = Vec::new();
        if let Some(recv) = &self.receiver {
            p.line(format!("{} c_self = {};", recv.ctype, recv.expr));
            call_args.push("c_self".to_string());
        }

        let mut format = String::new();
        let mut addrs = Vec::new();
        for (i, param) in self.sig.params.iter().enumerate() {
            let sym = table.symbol(param.ty);
            let var = format!("c_arg{}", i);
            p.line(format!("{} {};", sym.cgo_name, var));
            let (code, mut a) = parse_spec(sym, &var);
            format.push_str(&code);
            addrs.append(&mut a);
            call_args.push(var);
        }
        if !self.sig.params.is_empty() {
            p.blank();
            p.line(format!(
                "if (!PyArg_ParseTuple(args, {}, {})) {{",
                c_quote(&format),
                addrs.join(", ")
            ));
            p.indent();
            p.line("return NULL;");
            p.outdent();
            p.line("}");
            p.blank();
        }

        let call = format!("{}({})", self.target, call_args.join(", "));
        let results = &self.sig.results;
        let mut exprs: Vec<String> = match results.len() {
            0 => {
                p.line(format!("{};", call));
                Vec::new()
            }
            1 => {
                let sym = table.symbol(results[0]);
                p.line(format!("{} c_gopy_ret = {};", sym.cgo_name, call));
                vec!["c_gopy_ret".to_string()]
            }
            n => {
                p.line(format!("struct {}_return c_gopy_ret = {};", self.target, call));
                (0..n).map(|i| format!("c_gopy_ret.r{}", i)).collect()
            }
        };
        let mut values: Vec<&Symbol> = results.iter().map(|id| table.symbol(*id)).collect();

        if values.last().is_some_and(|sym| sym.is_error()) {
            values.pop();
            if let Some(err) = exprs.pop() {
                p.blank();
                p.line(format!("if (!_cgopy_ErrorIsNil({})) {{", err));
                p.indent();
                p.line(format!("const char* c_err_str = _cgopy_ErrorString({});", err));
                p.line("PyErr_SetString(PyExc_RuntimeError, c_err_str);");
                p.line("free((void*)c_err_str);");
                p.line("return NULL;");
                p.outdent();
                p.line("}");
            }
        }

        p.blank();
        match values.as_slice() {
            [] => {
                p.line("Py_INCREF(Py_None);");
                p.line("return Py_None;");
            }
            [sym] => p.line(format!("return {};", to_host(sym, &exprs[0]))),
            many => {
                let mut format = String::from("(");
                let mut args = Vec::new();
                for (sym, expr) in many.iter().zip(&exprs) {
                    let (code, mut a) = build_spec(sym, expr);
                    format.push_str(&code);
                    args.append(&mut a);
                }
                format.push(')');
                p.line(format!(
                    "return Py_BuildValue({}, {});",
                    c_quote(&format),
                    args.join(", ")
                ));
            }
        }
    }
}

/// C initializer for a constant value
pub fn c_literal(value: &NativeValue) -> String {
    match value {
        NativeValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        NativeValue::Int(i) if *i == i64::MIN => "(-9223372036854775807LL - 1)".to_string(),
        NativeValue::Int(i) if i32::try_from(*i).is_ok() => i.to_string(),
        NativeValue::Int(i) => format!("{}LL", i),
        NativeValue::Uint(u) if *u <= u32::MAX as u64 => format!("{}U", u),
        NativeValue::Uint(u) => format!("{}ULL", u),
        NativeValue::Float32(f) => float_literal(*f as f64, "f"),
        NativeValue::Float64(f) => float_literal(*f, ""),
        NativeValue::Complex64(re, im) => format!(
            "({} + {} * _Complex_I)",
            float_literal(*re as f64, "f"),
            float_literal(*im as f64, "f")
        ),
        NativeValue::Complex128(re, im) => format!(
            "({} + {} * _Complex_I)",
            float_literal(*re, ""),
            float_literal(*im, "")
        ),
        NativeValue::Str(s) => format!("{{{}, {}}}", c_quote(s), s.len()),
        NativeValue::Rune(c) => (*c as u32).to_string(),
    }
}

fn float_literal(f: f64, suffix: &str) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INFINITY" } else { "-INFINITY" }.to_string()
    } else {
        let text = format!("{:?}", f);
        if text.contains(['.', 'e']) {
            format!("{}{}", text, suffix)
        } else {
            format!("{}.0{}", text, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Decl, Package, ParamDecl, SymbolKind, TypeExpr, Universe, WordSize};
    use pretty_assertions::assert_eq;

    fn emit_func(pkg: &Package, name: &str) -> String {
        let universe = Universe::new(WordSize::W64);
        let table = SymbolTable::build(&universe, pkg).unwrap();
        let sym = table.lookup(name).unwrap();
        let sig = match &sym.kind {
            SymbolKind::Func(sig) => sig,
            other => panic!("not a func: {:?}", other),
        };
        let mut p = Printer::new();
        CallSite {
            target: sym.cgo_name.clone(),
            receiver: None,
            sig,
        }
        .emit(&table, &mut p);
        p.into_string()
    }

    #[test]
    fn test_no_results_returns_none() {
        let pkg = Package::new("p").decl(Decl::func("Hello", vec![], vec![]));
        assert_eq!(
            emit_func(&pkg, "Hello"),
            "cgo_func_p_Hello();\n\nPy_INCREF(Py_None);\nreturn Py_None;\n"
        );
    }

    #[test]
    fn test_scalar_and_converter_params() {
        let pkg = Package::new("p").decl(Decl::func(
            "Add",
            vec![
                ParamDecl::new("a", TypeExpr::basic("int")),
                ParamDecl::new("s", TypeExpr::basic("string")),
            ],
            vec![TypeExpr::basic("int")],
        ));
        let body = emit_func(&pkg, "Add");
        assert!(body.contains("GoInt c_arg0;\nGoString c_arg1;\n"));
        assert!(body.contains(
            "if (!PyArg_ParseTuple(args, \"kO&\", &c_arg0, cgopy_cnv_py2c_string, &c_arg1)) {\n\treturn NULL;\n}\n"
        ));
        assert!(body.contains("GoInt c_gopy_ret = cgo_func_p_Add(c_arg0, c_arg1);\n"));
        assert!(body.ends_with("return Py_BuildValue(\"k\", c_gopy_ret);\n"));
    }

    #[test]
    fn test_trailing_error_result() {
        let pkg = Package::new("p").decl(Decl::func(
            "Parse",
            vec![ParamDecl::new("b", TypeExpr::basic("byte"))],
            vec![TypeExpr::basic("byte"), TypeExpr::basic("float64"), TypeExpr::basic("error")],
        ));
        let body = emit_func(&pkg, "Parse");
        assert!(body.contains("if (!PyArg_ParseTuple(args, \"b\", &c_arg0)) {"));
        assert!(body.contains("struct cgo_func_p_Parse_return c_gopy_ret = cgo_func_p_Parse(c_arg0);\n"));
        assert!(body.contains("if (!_cgopy_ErrorIsNil(c_gopy_ret.r2)) {\n"));
        assert!(body.contains("\tPyErr_SetString(PyExc_RuntimeError, c_err_str);\n"));
        assert!(body.ends_with(
            "return Py_BuildValue(\"(bd)\", c_gopy_ret.r0, c_gopy_ret.r1);\n"
        ));
    }

    #[test]
    fn test_single_error_result() {
        let pkg = Package::new("p").decl(Decl::func("Close", vec![], vec![TypeExpr::basic("error")]));
        let body = emit_func(&pkg, "Close");
        assert!(body.starts_with("GoInterface c_gopy_ret = cgo_func_p_Close();\n"));
        assert!(body.contains("if (!_cgopy_ErrorIsNil(c_gopy_ret)) {"));
        assert!(body.ends_with("Py_INCREF(Py_None);\nreturn Py_None;\n"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(c_literal(&NativeValue::Bool(true)), "1");
        assert_eq!(c_literal(&NativeValue::Int(-3)), "-3");
        assert_eq!(c_literal(&NativeValue::Int(1 << 40)), "1099511627776LL");
        assert_eq!(
            c_literal(&NativeValue::Int(i64::MIN)),
            "(-9223372036854775807LL - 1)"
        );
        assert_eq!(c_literal(&NativeValue::Uint(7)), "7U");
        assert_eq!(c_literal(&NativeValue::Uint(u64::MAX)), "18446744073709551615ULL");
        assert_eq!(c_literal(&NativeValue::Float32(1.5)), "1.5f");
        assert_eq!(c_literal(&NativeValue::Float64(2.0)), "2.0");
        assert_eq!(c_literal(&NativeValue::Float64(f64::INFINITY)), "INFINITY");
        assert_eq!(
            c_literal(&NativeValue::Complex128(1.0, -0.5)),
            "(1.0 + -0.5 * _Complex_I)"
        );
        assert_eq!(
            c_literal(&NativeValue::Str("hi\n".to_string())),
            "{\"hi\\n\", 3}"
        );
        assert_eq!(c_literal(&NativeValue::Rune('A')), "65");
    }
}
