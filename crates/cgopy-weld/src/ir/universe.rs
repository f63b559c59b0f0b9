//! Universe scope
//!
//! Read-only registry of the predeclared scalar types and the `error`
//! interface. Entries carry the cross-representation metadata every
//! composite builds upon: native (`Go*`) name, host buffer representation,
//! format codes and converter names.
//!
//! The table is built once for a target [`WordSize`] and shared by reference
//! with every [`SymbolTable`](crate::ir::SymbolTable) built against it.

use crate::ir::{
    BasicKind, Converters, Formats, Layout, Symbol, SymbolId, SymbolKind, TypeShape, WordSize,
};
use std::collections::HashMap;
use tracing::debug;

/// Untyped constant kinds and the concrete type they default to
const UNTYPED_DEFAULTS: [(&str, &str); 6] = [
    ("untyped bool", "bool"),
    ("untyped int", "int"),
    ("untyped rune", "rune"),
    ("untyped float", "float64"),
    ("untyped complex", "complex128"),
    ("untyped string", "string"),
];

/// Predeclared types of the source language
#[derive(Debug, Clone)]
pub struct Universe {
    word: WordSize,
    symbols: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
}

/// Per-kind metadata row
struct Entry {
    cgo: &'static str,
    cpy: &'static str,
    parse: &'static str,
    buffer: &'static str,
    signature: &'static str,
    converter: Option<&'static str>,
}

fn row(
    cgo: &'static str,
    cpy: &'static str,
    parse: &'static str,
    buffer: &'static str,
    signature: &'static str,
    converter: Option<&'static str>,
) -> Entry {
    Entry {
        cgo,
        cpy,
        parse,
        buffer,
        signature,
        converter,
    }
}

fn entry(kind: BasicKind, word: WordSize) -> Entry {
    let wide = word == WordSize::W64;
    match kind {
        BasicKind::Bool => row("GoUint8", "GoUint8", "O&", "?", "bool", Some("bool")),
        BasicKind::Byte => row("GoUint8", "uint8_t", "b", "B", "int", None),
        BasicKind::Int if wide => row("GoInt", "int64_t", "k", "q", "int", Some("int")),
        BasicKind::Int => row("GoInt", "int", "i", "i", "int", Some("int")),
        BasicKind::Int8 => row("GoInt8", "int8_t", "b", "b", "int", Some("int8")),
        BasicKind::Int16 => row("GoInt16", "int16_t", "h", "h", "int", Some("int16")),
        BasicKind::Int32 => row("GoInt32", "int32_t", "i", "i", "int", Some("int32")),
        BasicKind::Int64 => row("GoInt64", "int64_t", "k", "q", "long", Some("int64")),
        BasicKind::Uint if wide => row("GoUint", "uint64_t", "K", "Q", "int", Some("uint")),
        BasicKind::Uint => row("GoUint", "unsigned int", "I", "I", "int", Some("uint")),
        BasicKind::Uint8 => row("GoUint8", "uint8_t", "B", "B", "int", Some("uint8")),
        BasicKind::Uint16 => row("GoUint16", "uint16_t", "H", "H", "int", Some("uint16")),
        BasicKind::Uint32 => row("GoUint32", "uint32_t", "I", "I", "long", Some("uint32")),
        BasicKind::Uint64 => row("GoUint64", "uint64_t", "K", "Q", "long", Some("uint64")),
        BasicKind::Uintptr if wide => {
            row("GoUintptr", "uintptr_t", "K", "Q", "int", Some("uintptr"))
        }
        BasicKind::Uintptr => row("GoUintptr", "uintptr_t", "I", "I", "int", Some("uintptr")),
        BasicKind::Float32 => row("GoFloat32", "float", "f", "f", "float", Some("f32")),
        BasicKind::Float64 => row("GoFloat64", "double", "d", "d", "float", Some("float64")),
        BasicKind::Complex64 => row(
            "GoComplex64",
            "float complex",
            "D",
            "ff",
            "complex",
            Some("complex64"),
        ),
        BasicKind::Complex128 => row(
            "GoComplex128",
            "double complex",
            "D",
            "dd",
            "complex",
            Some("complex128"),
        ),
        BasicKind::String => row("GoString", "GoString", "O&", "s", "str", Some("string")),
        BasicKind::Rune => row("GoRune", "GoRune", "O&", "p", "str", Some("rune")),
    }
}

impl Universe {
    /// Build the universe for a target word size
    pub fn new(word: WordSize) -> Self {
        let mut universe = Self {
            word,
            symbols: Vec::with_capacity(BasicKind::ALL.len() + 1),
            index: HashMap::new(),
        };

        for kind in BasicKind::ALL {
            let e = entry(kind, word);
            let (size, align) = kind.size_align(word);
            universe.insert(Symbol {
                kind: SymbolKind::Type(TypeShape::Basic(kind)),
                named: false,
                pointer: false,
                package: None,
                name: kind.name().to_string(),
                id: kind.name().to_string(),
                cgo_name: e.cgo.to_string(),
                cpy_name: e.cpy.to_string(),
                formats: Formats::new(e.parse, e.buffer, e.signature),
                converters: e.converter.map(Converters::for_id),
                layout: Layout::new(size, align),
                methods: Vec::new(),
                doc: None,
            });
        }

        universe.insert(Symbol {
            kind: SymbolKind::Type(TypeShape::Interface),
            named: false,
            pointer: false,
            package: None,
            name: "error".to_string(),
            id: "error".to_string(),
            cgo_name: "GoInterface".to_string(),
            cpy_name: "GoInterface".to_string(),
            formats: Formats::new("O&", "PP", "object"),
            converters: Some(Converters::for_id("error")),
            layout: Layout::new(2 * word.bytes(), word.bytes()),
            methods: Vec::new(),
            doc: None,
        });

        for (alias, target) in UNTYPED_DEFAULTS {
            if let Some(&id) = universe.index.get(target) {
                universe.index.insert(alias.to_string(), id);
            }
        }

        debug!(
            word_bits = word.bits(),
            symbols = universe.symbols.len(),
            "universe initialized"
        );
        universe
    }

    fn insert(&mut self, symbol: Symbol) {
        let id = SymbolId(self.symbols.len() as u32);
        self.index.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
    }

    /// Word size the universe was built for
    pub fn word_size(&self) -> WordSize {
        self.word
    }

    /// Look up a predeclared type by name
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Id of a predeclared type
    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    /// Symbol for an id in this universe
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Symbol of a basic kind
    pub fn basic(&self, kind: BasicKind) -> Option<&Symbol> {
        self.lookup(kind.name())
    }

    /// Number of arena slots; package ids start here
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new(WordSize::host())
    }
}
