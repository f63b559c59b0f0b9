//! Structural type vocabulary for cgopy
//!
//! This module provides the type expressions a package description uses to
//! describe its exported surface, together with the primitive scalar kinds
//! known to the universe scope.
//!
//! # Canonical Type Names
//!
//! Every [`TypeExpr`] renders to a canonical string relative to the package
//! being bound. The canonical string is the key of the symbol table and the
//! input of the content hash used for anonymous type identifiers.
//!
//! | Type expression | Canonical name |
//! |-----------------|----------------|
//! | `int` | `int` |
//! | named `Point` (same package) | `Point` |
//! | named `Point` (package `geo`) | `geo.Point` |
//! | pointer to `Point` | `*Point` |
//! | slice of `int` | `[]int` |
//! | array of 3 `float64` | `[3]float64` |
//! | struct with `A int`, `B string` | `struct{A int; B string}` |
//! | function `(int, string) (bool, error)` | `func(int, string) (bool, error)` |
//!
//! Parameter names never appear in canonical names, so two structurally
//! identical anonymous types always share one symbol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer width of the platform the generated extension targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WordSize {
    /// 32-bit pointers
    W32,
    /// 64-bit pointers
    W64,
}

impl WordSize {
    /// Word size of the machine running the generator
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            WordSize::W64
        } else {
            WordSize::W32
        }
    }

    /// Size of a pointer in bytes
    pub fn bytes(self) -> u64 {
        match self {
            WordSize::W32 => 4,
            WordSize::W64 => 8,
        }
    }

    /// Size of a pointer in bits
    pub fn bits(self) -> u32 {
        match self {
            WordSize::W32 => 32,
            WordSize::W64 => 64,
        }
    }
}

impl Default for WordSize {
    fn default() -> Self {
        WordSize::host()
    }
}

impl TryFrom<u8> for WordSize {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(WordSize::W32),
            64 => Ok(WordSize::W64),
            other => Err(format!("unsupported word size: {} (expected 32 or 64)", other)),
        }
    }
}

impl From<WordSize> for u8 {
    fn from(word: WordSize) -> Self {
        word.bits() as u8
    }
}

/// Primitive scalar kinds of the source language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicKind {
    Bool,
    Byte,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Rune,
}

impl BasicKind {
    /// Every basic kind, in universe registration order
    pub const ALL: [BasicKind; 19] = [
        BasicKind::Bool,
        BasicKind::Byte,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
        BasicKind::Rune,
    ];

    /// Source-language spelling of the kind
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Byte => "byte",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::Rune => "rune",
        }
    }

    /// Whether the kind is a signed integer
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BasicKind::Int | BasicKind::Int8 | BasicKind::Int16 | BasicKind::Int32 | BasicKind::Int64
        )
    }

    /// Whether the kind is an unsigned integer
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Byte
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    /// Bit width of integer kinds
    pub fn int_bits(self, word: WordSize) -> Option<u32> {
        match self {
            BasicKind::Int8 | BasicKind::Uint8 | BasicKind::Byte => Some(8),
            BasicKind::Int16 | BasicKind::Uint16 => Some(16),
            BasicKind::Int32 | BasicKind::Uint32 => Some(32),
            BasicKind::Int64 | BasicKind::Uint64 => Some(64),
            BasicKind::Int | BasicKind::Uint | BasicKind::Uintptr => Some(word.bits()),
            _ => None,
        }
    }

    /// Inclusive value range of integer kinds
    pub fn int_range(self, word: WordSize) -> Option<(i128, i128)> {
        let bits = self.int_bits(word)?;
        if self.is_signed() {
            let max = (1i128 << (bits - 1)) - 1;
            Some((-max - 1, max))
        } else {
            Some((0, (1i128 << bits) - 1))
        }
    }

    /// Native size and alignment in bytes
    pub fn size_align(self, word: WordSize) -> (u64, u64) {
        match self {
            BasicKind::Bool | BasicKind::Byte | BasicKind::Int8 | BasicKind::Uint8 => (1, 1),
            BasicKind::Int16 | BasicKind::Uint16 => (2, 2),
            BasicKind::Int32 | BasicKind::Uint32 | BasicKind::Rune | BasicKind::Float32 => (4, 4),
            BasicKind::Int64 | BasicKind::Uint64 | BasicKind::Float64 => (8, 8),
            BasicKind::Int | BasicKind::Uint | BasicKind::Uintptr => (word.bytes(), word.bytes()),
            BasicKind::Complex64 => (8, 4),
            BasicKind::Complex128 => (16, 8),
            BasicKind::String => (2 * word.bytes(), word.bytes()),
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Structural description of a source-language type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    /// Predeclared type, looked up in the universe (`int`, `string`, `error`, `untyped int`)
    Basic(String),

    /// Reference to a declared type name
    Named {
        #[serde(default)]
        package: Option<String>,
        name: String,
    },

    /// `*T`
    Pointer(Box<TypeExpr>),

    /// `[]T`
    Slice(Box<TypeExpr>),

    /// `[N]T`
    Array { elem: Box<TypeExpr>, len: u64 },

    /// `struct{...}`
    Struct { fields: Vec<FieldDecl> },

    /// `func(...) (...)`
    Signature(SignatureDecl),

    /// `interface{...}`
    Interface {
        #[serde(default)]
        methods: Vec<String>,
    },

    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },

    /// `chan T`
    Chan(Box<TypeExpr>),
}

impl TypeExpr {
    /// Create a predeclared type reference
    pub fn basic(name: impl Into<String>) -> Self {
        TypeExpr::Basic(name.into())
    }

    /// Create a reference to a type declared in the package being bound
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            package: None,
            name: name.into(),
        }
    }

    /// Create a pointer type
    pub fn pointer(elem: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(elem))
    }

    /// Create a slice type
    pub fn slice(elem: TypeExpr) -> Self {
        TypeExpr::Slice(Box::new(elem))
    }

    /// Create an array type
    pub fn array(elem: TypeExpr, len: u64) -> Self {
        TypeExpr::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Create a struct type
    pub fn structure(fields: Vec<FieldDecl>) -> Self {
        TypeExpr::Struct { fields }
    }

    /// Create a function type
    pub fn signature(params: Vec<ParamDecl>, results: Vec<TypeExpr>) -> Self {
        TypeExpr::Signature(SignatureDecl { params, results })
    }

    /// Short name of the structural shape, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeExpr::Basic(_) => "basic",
            TypeExpr::Named { .. } => "named",
            TypeExpr::Pointer(_) => "pointer",
            TypeExpr::Slice(_) => "slice",
            TypeExpr::Array { .. } => "array",
            TypeExpr::Struct { .. } => "struct",
            TypeExpr::Signature(_) => "signature",
            TypeExpr::Interface { .. } => "interface",
            TypeExpr::Map { .. } => "map",
            TypeExpr::Chan(_) => "chan",
        }
    }

    /// Canonical type name relative to `package`
    ///
    /// Names declared in `package` are left unqualified, names from other
    /// packages are qualified as `pkg.Name`.
    pub fn canonical(&self, package: &str) -> String {
        let mut out = String::new();
        self.write_canonical(package, &mut out);
        out
    }

    fn write_canonical(&self, package: &str, out: &mut String) {
        match self {
            TypeExpr::Basic(name) => out.push_str(name),
            TypeExpr::Named { package: pkg, name } => {
                if let Some(pkg) = pkg.as_deref().filter(|p| *p != package) {
                    out.push_str(pkg);
                    out.push('.');
                }
                out.push_str(name);
            }
            TypeExpr::Pointer(elem) => {
                out.push('*');
                elem.write_canonical(package, out);
            }
            TypeExpr::Slice(elem) => {
                out.push_str("[]");
                elem.write_canonical(package, out);
            }
            TypeExpr::Array { elem, len } => {
                out.push_str(&format!("[{}]", len));
                elem.write_canonical(package, out);
            }
            TypeExpr::Struct { fields } => {
                out.push_str("struct{");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    out.push_str(&field.name);
                    out.push(' ');
                    field.ty.write_canonical(package, out);
                }
                out.push('}');
            }
            TypeExpr::Signature(sig) => {
                out.push_str("func");
                sig.write_canonical(package, out);
            }
            TypeExpr::Interface { methods } => {
                out.push_str("interface{");
                out.push_str(&methods.join("; "));
                out.push('}');
            }
            TypeExpr::Map { key, value } => {
                out.push_str("map[");
                key.write_canonical(package, out);
                out.push(']');
                value.write_canonical(package, out);
            }
            TypeExpr::Chan(elem) => {
                out.push_str("chan ");
                elem.write_canonical(package, out);
            }
        }
    }
}

/// Field of a struct type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeExpr,
    /// Explicit export flag; derived from the name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<bool>,
    /// Documentation comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl FieldDecl {
    /// Create a new field
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            exported: None,
            doc: None,
        }
    }

    /// Set documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Whether the field is visible outside its package
    pub fn is_exported(&self) -> bool {
        self.exported.unwrap_or_else(|| is_exported_name(&self.name))
    }
}

/// Parameter of a function or method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name (may be empty)
    #[serde(default)]
    pub name: String,
    /// Parameter type
    pub ty: TypeExpr,
}

impl ParamDecl {
    /// Create a new parameter
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Parameter and result lists of a function type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SignatureDecl {
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub results: Vec<TypeExpr>,
}

impl SignatureDecl {
    fn write_canonical(&self, package: &str, out: &mut String) {
        out.push('(');
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            param.ty.write_canonical(package, out);
        }
        out.push(')');
        match self.results.as_slice() {
            [] => {}
            [single] => {
                out.push(' ');
                single.write_canonical(package, out);
            }
            many => {
                out.push_str(" (");
                for (i, result) in many.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    result.write_canonical(package, out);
                }
                out.push(')');
            }
        }
    }
}

/// Whether a source-language identifier is exported (starts with an uppercase letter)
pub fn is_exported_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}
