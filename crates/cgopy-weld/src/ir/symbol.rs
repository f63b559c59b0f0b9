//! Resolved symbols
//!
//! A [`Symbol`] is the resolved, uniquely identified description of one
//! exported declaration or type. Symbols live in an arena owned by the
//! [`Universe`](crate::ir::Universe) or a
//! [`SymbolTable`](crate::ir::SymbolTable) and refer to each other through
//! [`SymbolId`] indices.

use crate::ir::{BasicKind, NativeValue, WordSize};
use std::fmt;

/// Index of a symbol in the universe or package arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a symbol stands for
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// Exported constant with its type and, when known, its literal value
    Const {
        ty: SymbolId,
        value: Option<NativeValue>,
    },
    /// Exported package-level variable
    Var { ty: SymbolId },
    /// Exported free function
    Func(FuncSig),
    /// A type, named or structural
    Type(TypeShape),
}

impl SymbolKind {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Const { .. } => "const",
            SymbolKind::Var { .. } => "var",
            SymbolKind::Func(_) => "func",
            SymbolKind::Type(shape) => shape.name(),
        }
    }
}

/// Structural shape of a type symbol
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Basic(BasicKind),
    Interface,
    Array { elem: SymbolId, len: u64 },
    Slice { elem: SymbolId },
    Struct { fields: Vec<FieldSymbol> },
    Signature(FuncSig),
    /// Placeholder for a named type whose underlying type is being resolved
    Pending,
}

impl TypeShape {
    pub fn name(&self) -> &'static str {
        match self {
            TypeShape::Basic(_) => "basic",
            TypeShape::Interface => "interface",
            TypeShape::Array { .. } => "array",
            TypeShape::Slice { .. } => "slice",
            TypeShape::Struct { .. } => "struct",
            TypeShape::Signature(_) => "signature",
            TypeShape::Pending => "pending",
        }
    }
}

/// Resolved struct field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub name: String,
    pub ty: SymbolId,
    pub exported: bool,
    /// Position in declaration order, counting unexported fields
    pub index: usize,
    pub doc: Option<String>,
}

/// Resolved parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSymbol {
    pub name: String,
    pub ty: SymbolId,
}

/// Resolved parameter and result lists
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncSig {
    pub params: Vec<ParamSymbol>,
    pub results: Vec<SymbolId>,
}

/// Resolved method of a named type
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSymbol {
    pub name: String,
    /// Mangled id, `<type-id>_<method>`
    pub id: String,
    pub sig: FuncSig,
    pub doc: Option<String>,
}

/// Scalar format codes of a type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formats {
    /// `PyArg_ParseTuple` / `Py_BuildValue` code
    pub parse: String,
    /// `struct`/buffer-protocol code
    pub buffer: String,
    /// Human readable signature used in docs
    pub signature: String,
}

impl Formats {
    pub fn new(parse: impl Into<String>, buffer: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            parse: parse.into(),
            buffer: buffer.into(),
            signature: signature.into(),
        }
    }
}

/// Names of the converter pair of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converters {
    /// native -> host (`cgopy_cnv_c2py_*`)
    pub to_host: String,
    /// host -> native (`cgopy_cnv_py2c_*`)
    pub to_native: String,
}

impl Converters {
    /// Converter pair for a mangled id or basic suffix
    pub fn for_id(id: &str) -> Self {
        Self {
            to_host: format!("cgopy_cnv_c2py_{}", id),
            to_native: format!("cgopy_cnv_py2c_{}", id),
        }
    }
}

/// Native size and alignment in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

impl Layout {
    pub fn new(size: u64, align: u64) -> Self {
        Self { size, align }
    }

    /// Layout of a single machine word
    pub fn word(word: WordSize) -> Self {
        Self::new(word.bytes(), word.bytes())
    }
}

/// One resolved declaration or type
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Declared through a type name
    pub named: bool,
    /// Pointer copy of another symbol
    pub pointer: bool,
    /// Owning package, `None` for universe symbols
    pub package: Option<String>,
    /// Declared name, or the canonical type string for structural types
    pub name: String,
    /// Mangled id, `<pkg>_<name>` or a content hash
    pub id: String,
    /// Native-side name (`cgo_*`)
    pub cgo_name: String,
    /// Host-object name (`cpy_*`)
    pub cpy_name: String,
    pub formats: Formats,
    pub converters: Option<Converters>,
    pub layout: Layout,
    pub methods: Vec<MethodSymbol>,
    pub doc: Option<String>,
}

impl Symbol {
    /// Whether values marshal through the converter pair
    pub fn has_converter(&self) -> bool {
        self.formats.parse == "O&" && self.converters.is_some()
    }

    pub fn shape(&self) -> Option<&TypeShape> {
        match &self.kind {
            SymbolKind::Type(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Type(_))
    }

    pub fn is_basic(&self) -> bool {
        matches!(self.shape(), Some(TypeShape::Basic(_)))
    }

    pub fn is_slice(&self) -> bool {
        matches!(self.shape(), Some(TypeShape::Slice { .. }))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.shape(), Some(TypeShape::Struct { .. }))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.shape(), Some(TypeShape::Interface))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.shape(), Some(TypeShape::Pending))
    }

    /// The `error` interface of the universe
    pub fn is_error(&self) -> bool {
        self.package.is_none() && self.is_interface() && self.name == "error"
    }

    /// Basic kind of a basic or named-basic symbol
    pub fn basic_kind(&self) -> Option<BasicKind> {
        match self.shape() {
            Some(TypeShape::Basic(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Whether the generator emits an extension type for this symbol
    pub fn needs_binding(&self) -> bool {
        match self.shape() {
            None | Some(TypeShape::Interface) | Some(TypeShape::Pending) => false,
            Some(TypeShape::Basic(_)) => self.named && !self.pointer,
            Some(_) => !self.pointer,
        }
    }

    /// `<pkg>.<name>`, or the bare name for universe symbols
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{}.{}", pkg, self.name),
            None => self.name.clone(),
        }
    }

    /// Pointer copy of this symbol, sharing its formats and converters
    pub fn to_pointer(&self, word: WordSize) -> Symbol {
        let mut ptr = self.clone();
        ptr.pointer = true;
        ptr.layout = Layout::word(word);
        ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_struct() -> Symbol {
        Symbol {
            kind: SymbolKind::Type(TypeShape::Struct { fields: Vec::new() }),
            named: true,
            pointer: false,
            package: Some("p".to_string()),
            name: "S".to_string(),
            id: "p_S".to_string(),
            cgo_name: "cgo_type_p_S".to_string(),
            cpy_name: "cpy_type_p_S".to_string(),
            formats: Formats::new("O&", "", "object"),
            converters: Some(Converters::for_id("p_S")),
            layout: Layout::new(0, 1),
            methods: Vec::new(),
            doc: None,
        }
    }

    #[test]
    fn test_pointer_copy_shares_metadata() {
        let s = named_struct();
        let p = s.to_pointer(WordSize::W64);

        assert!(p.pointer);
        assert_eq!(p.id, s.id);
        assert_eq!(p.formats, s.formats);
        assert_eq!(p.converters, s.converters);
        assert_eq!(p.layout, Layout::new(8, 8));
        assert!(s.needs_binding());
        assert!(!p.needs_binding());
    }

    #[test]
    fn test_converter_names() {
        let c = Converters::for_id("p_S");
        assert_eq!(c.to_host, "cgopy_cnv_c2py_p_S");
        assert_eq!(c.to_native, "cgopy_cnv_py2c_p_S");
        assert!(named_struct().has_converter());
    }
}
