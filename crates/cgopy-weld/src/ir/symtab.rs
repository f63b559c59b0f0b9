//! Symbol table and type resolver
//!
//! The [`SymbolTable`] maps canonical type names and declaration names of one
//! package onto [`Symbol`]s, falling back to the [`Universe`] for predeclared
//! types. Absent names are resolved on demand: constituents first, then the
//! composite itself, so a composite never exists before its parts.
//!
//! # Cycles
//!
//! A named type is inserted as a [`TypeShape::Pending`] placeholder before
//! its underlying type is resolved. References that reach the placeholder
//! through a pointer, slice or signature terminate there; a reference by
//! value (struct field, array element) is reported as
//! [`BindError::RecursiveType`].
//!
//! Pointer copies taken of a placeholder are refreshed once the placeholder
//! is populated, so `*T` always mirrors `T`.

use crate::error::{BindError, BindResult};
use crate::ir::{
    Converters, Decl, DeclKind, FieldSymbol, Formats, FuncSig, HostValue, Layout, MethodDecl,
    MethodSymbol, NativeValue, Package, ParamSymbol, SignatureDecl, Symbol, SymbolId, SymbolKind,
    TypeExpr, TypeShape, Universe, WordSize,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use xxhash_rust::xxh32::xxh32;

/// Longest buffer-format string an array may expand to
const MAX_BUFFER_FORMAT: usize = 1 << 20;

/// 8-hex-digit content hash of a canonical type string
pub fn content_id(canonical: &str) -> String {
    format!("{:08x}", xxh32(canonical.as_bytes(), 0))
}

/// Symbols of one package, chained to the universe
pub struct SymbolTable<'a> {
    universe: &'a Universe,
    package: &'a Package,
    symbols: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
    /// Mangled ids handed out so far
    ids: HashSet<String>,
    /// (pointer copy, pointee) pairs inside the package arena
    pointers: Vec<(SymbolId, SymbolId)>,
}

impl<'a> SymbolTable<'a> {
    /// Create an empty table for `package`
    pub fn new(universe: &'a Universe, package: &'a Package) -> Self {
        Self {
            universe,
            package,
            symbols: Vec::new(),
            index: HashMap::new(),
            ids: HashSet::new(),
            pointers: Vec::new(),
        }
    }

    /// Validate `package` and resolve every declaration in order
    pub fn build(universe: &'a Universe, package: &'a Package) -> BindResult<Self> {
        package.validate()?;

        let mut table = Self::new(universe, package);
        for decl in &package.decls {
            table.add_decl(decl)?;
        }

        debug!(
            package = %package.name,
            decls = package.decls.len(),
            symbols = table.len(),
            "symbol table built"
        );
        Ok(table)
    }

    pub fn universe(&self) -> &'a Universe {
        self.universe
    }

    pub fn package(&self) -> &'a Package {
        self.package
    }

    pub fn word_size(&self) -> WordSize {
        self.universe.word_size()
    }

    /// Number of symbols in the package scope
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol for an id handed out by this table or its universe
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this table.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        let base = self.universe.len();
        if id.index() < base {
            match self.universe.get(id) {
                Some(sym) => sym,
                None => unreachable!("universe id {} out of range", id),
            }
        } else {
            &self.symbols[id.index() - base]
        }
    }

    /// Package symbols in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        let base = self.universe.len();
        self.symbols
            .iter()
            .enumerate()
            .map(move |(i, sym)| (SymbolId((base + i) as u32), sym))
    }

    /// Cached id for a name, package scope first
    pub fn lookup_id(&self, name: &str) -> Option<SymbolId> {
        self.index
            .get(name)
            .copied()
            .or_else(|| self.universe.id_of(name))
    }

    /// Cached symbol for a name, package scope first
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_id(name).map(|id| self.symbol(id))
    }

    /// Resolve a declaration or type name
    ///
    /// Names not yet in the table are looked up among the package's
    /// declarations and registered on the spot.
    pub fn resolve(&mut self, name: &str) -> BindResult<SymbolId> {
        if let Some(id) = self.lookup_id(name) {
            return Ok(id);
        }
        let package = self.package;
        match package.lookup(name) {
            Some(decl) => self.add_decl(decl),
            None => Err(BindError::UnresolvableType(name.to_string())),
        }
    }

    /// Type symbol of a declaration
    ///
    /// Constants and variables yield their type, functions and types
    /// yield themselves.
    pub fn type_of(&mut self, name: &str) -> BindResult<SymbolId> {
        let id = self.resolve(name)?;
        match &self.symbol(id).kind {
            SymbolKind::Const { ty, .. } | SymbolKind::Var { ty } => Ok(*ty),
            SymbolKind::Type(TypeShape::Pending) => Err(BindError::UnexpectedKind {
                name: name.to_string(),
                kind: "pending",
            }),
            SymbolKind::Func(_) | SymbolKind::Type(_) => Ok(id),
        }
    }

    /// Register one exported declaration
    pub fn add_decl(&mut self, decl: &'a Decl) -> BindResult<SymbolId> {
        if decl.kind == DeclKind::Type {
            return self.resolve_named(decl);
        }
        if let Some(&id) = self.index.get(&decl.name) {
            return Ok(id);
        }

        let kind = match decl.kind {
            DeclKind::Const => {
                let ty = self.resolve_type(&decl.ty)?;
                let value = match &decl.value {
                    Some(value) => Some(self.constant_value(decl, ty, value)?),
                    None => None,
                };
                SymbolKind::Const { ty, value }
            }
            DeclKind::Var => SymbolKind::Var {
                ty: self.resolve_type(&decl.ty)?,
            },
            DeclKind::Func => match &decl.ty {
                TypeExpr::Signature(sig) => SymbolKind::Func(self.resolve_sig(sig)?),
                other => {
                    return Err(BindError::UnexpectedKind {
                        name: decl.name.clone(),
                        kind: other.kind_name(),
                    })
                }
            },
            DeclKind::Type => unreachable!("type declarations are resolved above"),
        };

        let role = kind.name();
        let id = format!("{}_{}", self.package.name, decl.name);
        let symbol = Symbol {
            kind,
            named: false,
            pointer: false,
            package: Some(self.package.name.clone()),
            name: decl.name.clone(),
            cgo_name: format!("cgo_{}_{}", role, id),
            cpy_name: format!("cpy_{}_{}", role, id),
            id,
            formats: Formats::default(),
            converters: None,
            layout: Layout::default(),
            methods: Vec::new(),
            doc: decl.doc.clone(),
        };

        debug!(name = %decl.name, role, "declaration added");
        Ok(self.insert(decl.name.clone(), symbol))
    }

    /// Resolve a structural type description
    pub fn resolve_type(&mut self, ty: &TypeExpr) -> BindResult<SymbolId> {
        let key = ty.canonical(&self.package.name);
        if let Some(id) = self.lookup_id(&key) {
            if matches!(ty, TypeExpr::Named { .. }) {
                let sym = self.symbol(id);
                if !sym.is_type() {
                    return Err(BindError::UnexpectedKind {
                        name: key,
                        kind: sym.kind.name(),
                    });
                }
            }
            return Ok(id);
        }

        match ty {
            TypeExpr::Basic(_) => Err(BindError::UnresolvableType(key)),

            TypeExpr::Named { package, name } => {
                if package
                    .as_deref()
                    .is_some_and(|p| p != self.package.name)
                {
                    return Err(BindError::UnresolvableType(key));
                }
                let decl = self.type_decl(name, &key)?;
                self.resolve_named(decl)
            }

            TypeExpr::Pointer(elem) => {
                let elem = self.resolve_type(elem)?;
                Ok(self.insert_pointer(key, elem))
            }

            TypeExpr::Array { .. }
            | TypeExpr::Slice(_)
            | TypeExpr::Struct { .. }
            | TypeExpr::Signature(_) => self.resolve_composite(key, ty),

            TypeExpr::Interface { .. } | TypeExpr::Map { .. } | TypeExpr::Chan(_) => {
                Err(BindError::UnsupportedShape {
                    kind: ty.kind_name(),
                    name: key,
                })
            }
        }
    }

    /// Look up a type declaration of this package
    fn type_decl(&self, name: &str, key: &str) -> BindResult<&'a Decl> {
        let package = self.package;
        let decl = package
            .lookup(name)
            .ok_or_else(|| BindError::UnresolvableType(key.to_string()))?;
        if decl.kind != DeclKind::Type {
            return Err(BindError::UnexpectedKind {
                name: key.to_string(),
                kind: decl_kind_name(decl.kind),
            });
        }
        Ok(decl)
    }

    /// Resolve a named type declaration
    fn resolve_named(&mut self, decl: &'a Decl) -> BindResult<SymbolId> {
        if let Some(&id) = self.index.get(&decl.name) {
            return Ok(id);
        }

        let word = self.word_size();
        let mangled = format!("{}_{}", self.package.name, decl.name);
        let placeholder = Symbol {
            kind: SymbolKind::Type(TypeShape::Pending),
            named: true,
            pointer: false,
            package: Some(self.package.name.clone()),
            name: decl.name.clone(),
            id: mangled.clone(),
            cgo_name: format!("cgo_type_{}", mangled),
            cpy_name: format!("cpy_type_{}", mangled),
            formats: Formats::new("O&", "P", "object"),
            converters: Some(Converters::for_id(&mangled)),
            layout: Layout::word(word),
            methods: Vec::new(),
            doc: decl.doc.clone(),
        };
        let slot = self.insert(decl.name.clone(), placeholder);

        let underlying = self.underlying(decl)?;
        let (shape, formats, layout) = match underlying {
            TypeExpr::Basic(name) => {
                let basic = self
                    .universe
                    .lookup(name)
                    .ok_or_else(|| BindError::UnresolvableType(name.clone()))?;
                match basic.basic_kind() {
                    Some(kind) => (
                        TypeShape::Basic(kind),
                        Formats::new(&basic.formats.parse, &basic.formats.buffer, "object"),
                        basic.layout,
                    ),
                    None => {
                        return Err(BindError::UnsupportedShape {
                            kind: "interface",
                            name: decl.name.clone(),
                        })
                    }
                }
            }
            TypeExpr::Array { .. }
            | TypeExpr::Slice(_)
            | TypeExpr::Struct { .. }
            | TypeExpr::Signature(_) => self.build_shape(&decl.name, underlying)?,
            other => {
                return Err(BindError::UnsupportedShape {
                    kind: other.kind_name(),
                    name: decl.name.clone(),
                })
            }
        };

        {
            let sym = self.slot_mut(slot);
            sym.kind = SymbolKind::Type(shape);
            sym.formats = formats;
            sym.layout = layout;
        }

        let methods = decl
            .methods
            .iter()
            .map(|m| self.resolve_method(&mangled, m))
            .collect::<BindResult<Vec<_>>>()?;
        self.slot_mut(slot).methods = methods;
        self.refresh_pointers(slot);

        debug!(
            name = %decl.name,
            id = %mangled,
            shape = self.symbol(slot).kind.name(),
            buffer = %self.symbol(slot).formats.buffer,
            "named type resolved"
        );
        Ok(slot)
    }

    /// Follow `type A B` chains down to a structural type
    fn underlying(&self, decl: &'a Decl) -> BindResult<&'a TypeExpr> {
        let mut ty = &decl.ty;
        let mut hops = 0;
        while let TypeExpr::Named { package, name } = ty {
            let key = ty.canonical(&self.package.name);
            if package
                .as_deref()
                .is_some_and(|p| p != self.package.name)
            {
                return Err(BindError::UnresolvableType(key));
            }
            hops += 1;
            if hops > self.package.decls.len() {
                return Err(BindError::RecursiveType(decl.name.clone()));
            }
            ty = &self.type_decl(name, &key)?.ty;
        }
        Ok(ty)
    }

    /// Resolve an anonymous composite, keyed by its canonical name
    fn resolve_composite(&mut self, key: String, ty: &TypeExpr) -> BindResult<SymbolId> {
        let (shape, formats, layout) = self.build_shape(&key, ty)?;

        // resolving constituents may have registered the same key
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }

        let mangled = self.unique_id(&key);
        let symbol = Symbol {
            kind: SymbolKind::Type(shape),
            named: false,
            pointer: false,
            package: Some(self.package.name.clone()),
            name: key.clone(),
            cgo_name: format!("cgo_type_{}", mangled),
            cpy_name: format!("cpy_type_{}", mangled),
            converters: Some(Converters::for_id(&mangled)),
            id: mangled,
            formats,
            layout,
            methods: Vec::new(),
            doc: None,
        };

        debug!(name = %key, id = %symbol.id, buffer = %symbol.formats.buffer, "composite resolved");
        Ok(self.insert(key, symbol))
    }

    /// Build shape, formats and layout of an array, slice, struct or signature
    fn build_shape(
        &mut self,
        owner: &str,
        ty: &TypeExpr,
    ) -> BindResult<(TypeShape, Formats, Layout)> {
        let word = self.word_size();
        match ty {
            TypeExpr::Array { elem, len } => {
                let count = usize::try_from(*len)
                    .ok()
                    .filter(|n| *n <= u32::MAX as usize)
                    .ok_or_else(|| BindError::UnsupportedShape {
                        kind: "array",
                        name: owner.to_string(),
                    })?;
                let elem = self.resolve_type(elem)?;
                let elem_layout = self.by_value_layout(elem, owner)?;
                let e = self.symbol(elem);
                let too_large = || BindError::UnsupportedShape {
                    kind: "array",
                    name: owner.to_string(),
                };
                e.formats
                    .buffer
                    .len()
                    .checked_mul(count)
                    .filter(|n| *n <= MAX_BUFFER_FORMAT)
                    .ok_or_else(too_large)?;
                let size = elem_layout.size.checked_mul(*len).ok_or_else(too_large)?;
                Ok((
                    TypeShape::Array { elem, len: *len },
                    Formats::new(
                        "O&",
                        e.formats.buffer.repeat(count),
                        format!("[]{}", e.formats.signature),
                    ),
                    Layout::new(size, elem_layout.align.max(1)),
                ))
            }

            TypeExpr::Slice(elem) => {
                let elem = self.resolve_type(elem)?;
                let e = self.symbol(elem);
                Ok((
                    TypeShape::Slice { elem },
                    Formats::new(
                        "O&",
                        e.formats.buffer.clone(),
                        format!("[]{}", e.formats.signature),
                    ),
                    Layout::new(3 * word.bytes(), word.bytes()),
                ))
            }

            TypeExpr::Struct { fields } => {
                let mut resolved = Vec::with_capacity(fields.len());
                let mut buffer = String::new();
                let mut layouts = Vec::with_capacity(fields.len());
                for (index, field) in fields.iter().enumerate() {
                    let ty = self.resolve_type(&field.ty)?;
                    layouts.push(self.by_value_layout(ty, owner)?);
                    buffer.push_str(&self.symbol(ty).formats.buffer);
                    resolved.push(FieldSymbol {
                        name: field.name.clone(),
                        ty,
                        exported: field.is_exported(),
                        index,
                        doc: field.doc.clone(),
                    });
                }
                Ok((
                    TypeShape::Struct { fields: resolved },
                    Formats::new("O&", buffer, "object"),
                    struct_layout(&layouts),
                ))
            }

            TypeExpr::Signature(sig) => Ok((
                TypeShape::Signature(self.resolve_sig(sig)?),
                Formats::new("O&", "P", "callable"),
                Layout::word(word),
            )),

            other => Err(BindError::UnsupportedShape {
                kind: other.kind_name(),
                name: owner.to_string(),
            }),
        }
    }

    /// Layout of `id` stored by value inside `owner`
    ///
    /// A placeholder is only acceptable when its declaration is a slice or
    /// signature, whose values hold a reference rather than the type itself.
    fn by_value_layout(&self, id: SymbolId, owner: &str) -> BindResult<Layout> {
        let sym = self.symbol(id);
        if !sym.is_pending() || sym.pointer {
            return Ok(sym.layout);
        }
        let word = self.word_size();
        let recursive = || BindError::RecursiveType(owner.to_string());
        let decl = self
            .package
            .lookup(&sym.name)
            .filter(|d| d.kind == DeclKind::Type)
            .ok_or_else(recursive)?;
        match self.underlying(decl)? {
            TypeExpr::Slice(_) => Ok(Layout::new(3 * word.bytes(), word.bytes())),
            TypeExpr::Signature(_) => Ok(Layout::word(word)),
            _ => Err(recursive()),
        }
    }

    fn resolve_sig(&mut self, sig: &SignatureDecl) -> BindResult<FuncSig> {
        let mut params = Vec::with_capacity(sig.params.len());
        for p in &sig.params {
            params.push(ParamSymbol {
                name: p.name.clone(),
                ty: self.resolve_type(&p.ty)?,
            });
        }
        let results = sig
            .results
            .iter()
            .map(|r| self.resolve_type(r))
            .collect::<BindResult<Vec<_>>>()?;
        Ok(FuncSig { params, results })
    }

    fn resolve_method(&mut self, type_id: &str, method: &MethodDecl) -> BindResult<MethodSymbol> {
        let sig = self.resolve_sig(&SignatureDecl {
            params: method.params.clone(),
            results: method.results.clone(),
        })?;
        Ok(MethodSymbol {
            name: method.name.clone(),
            id: format!("{}_{}", type_id, method.name),
            sig,
            doc: method.doc.clone(),
        })
    }

    fn constant_value(
        &self,
        decl: &Decl,
        ty: SymbolId,
        value: &HostValue,
    ) -> BindResult<NativeValue> {
        let sym = self.symbol(ty);
        let kind = sym
            .basic_kind()
            .ok_or_else(|| BindError::InvalidConstant {
                name: decl.name.clone(),
                reason: format!("constant of {} type {}", sym.kind.name(), sym.name),
            })?;
        kind.to_native(value, self.word_size())
            .map_err(|e| BindError::InvalidConstant {
                name: decl.name.clone(),
                reason: e.to_string(),
            })
    }

    fn insert_pointer(&mut self, key: String, elem: SymbolId) -> SymbolId {
        let copy = self.symbol(elem).to_pointer(self.word_size());
        let id = self.insert(key, copy);
        if elem.index() >= self.universe.len() {
            self.pointers.push((id, elem));
        }
        id
    }

    /// Re-copy pointer symbols taken before `target` was populated
    fn refresh_pointers(&mut self, target: SymbolId) {
        let word = self.word_size();
        let stale: Vec<SymbolId> = self
            .pointers
            .iter()
            .filter(|(_, elem)| *elem == target)
            .map(|(ptr, _)| *ptr)
            .collect();
        for ptr in stale {
            let copy = self.symbol(target).to_pointer(word);
            *self.slot_mut(ptr) = copy;
            self.refresh_pointers(ptr);
        }
    }

    fn unique_id(&mut self, key: &str) -> String {
        let mut id = content_id(key);
        let mut salt = 0u32;
        while self.ids.contains(&id) {
            salt += 1;
            id = format!("{:08x}", xxh32(key.as_bytes(), salt));
        }
        id
    }

    fn insert(&mut self, key: String, symbol: Symbol) -> SymbolId {
        let id = SymbolId((self.universe.len() + self.symbols.len()) as u32);
        if !symbol.pointer {
            self.ids.insert(symbol.id.clone());
        }
        self.symbols.push(symbol);
        self.index.insert(key, id);
        id
    }

    fn slot_mut(&mut self, id: SymbolId) -> &mut Symbol {
        let base = self.universe.len();
        &mut self.symbols[id.index() - base]
    }
}

fn decl_kind_name(kind: DeclKind) -> &'static str {
    match kind {
        DeclKind::Const => "const",
        DeclKind::Var => "var",
        DeclKind::Func => "func",
        DeclKind::Type => "type",
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    offset.div_ceil(align) * align
}

/// Field offsets follow the natural alignment of each field
fn struct_layout(fields: &[Layout]) -> Layout {
    let mut offset = 0;
    let mut align = 1;
    for f in fields {
        let a = f.align.max(1);
        offset = align_up(offset, a) + f.size;
        align = align.max(a);
    }
    Layout::new(align_up(offset, align), align)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicKind, FieldDecl, ParamDecl};
    use pretty_assertions::assert_eq;

    fn int() -> TypeExpr {
        TypeExpr::basic("int")
    }

    fn string() -> TypeExpr {
        TypeExpr::basic("string")
    }

    fn point_package() -> Package {
        Package::new("p").decl(Decl::type_name(
            "S",
            TypeExpr::structure(vec![
                FieldDecl::new("A", int()),
                FieldDecl::new("B", string()),
            ]),
        ))
    }

    #[test]
    fn test_struct_scenario() {
        let universe = Universe::new(WordSize::W64);
        let pkg = point_package();
        let table = SymbolTable::build(&universe, &pkg).unwrap();

        let s = table.lookup("S").unwrap();
        assert_eq!(s.id, "p_S");
        assert_eq!(s.cgo_name, "cgo_type_p_S");
        assert_eq!(s.cpy_name, "cpy_type_p_S");
        assert_eq!(s.formats, Formats::new("O&", "qs", "object"));
        assert_eq!(s.converters, Some(Converters::for_id("p_S")));
        assert!(s.named && s.is_struct());
        assert_eq!(s.layout, Layout::new(24, 8));

        match s.shape() {
            Some(TypeShape::Struct { fields }) => {
                let names: Vec<_> = fields.iter().map(|f| (f.index, f.name.as_str())).collect();
                assert_eq!(names, vec![(0, "A"), (1, "B")]);
            }
            other => panic!("unexpected shape {:?}", other),
        }

        let universe32 = Universe::new(WordSize::W32);
        let table32 = SymbolTable::build(&universe32, &pkg).unwrap();
        assert_eq!(table32.lookup("S").unwrap().formats.buffer, "is");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p");
        let mut table = SymbolTable::new(&universe, &pkg);

        let a = table.resolve_type(&TypeExpr::slice(int())).unwrap();
        let before = table.len();
        let b = table.resolve_type(&TypeExpr::slice(int())).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), before);
        assert_eq!(table.symbol(a).id, content_id("[]int"));
        assert_eq!(table.symbol(a).id.len(), 8);

        let n1 = table.resolve("int").unwrap();
        let n2 = table.resolve_type(&TypeExpr::basic("untyped int")).unwrap();
        assert_eq!(n1, n2);
    }

    #[test]
    fn test_structural_types_collapse() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::var("Xs", TypeExpr::slice(int())))
            .decl(Decl::func(
                "Sum",
                vec![ParamDecl::new("xs", TypeExpr::slice(int()))],
                vec![int()],
            ));
        let mut table = SymbolTable::build(&universe, &pkg).unwrap();

        let var_ty = table.type_of("Xs").unwrap();
        let sum = table.lookup("Sum").unwrap();
        match &sum.kind {
            SymbolKind::Func(sig) => assert_eq!(sig.params[0].ty, var_ty),
            other => panic!("unexpected kind {:?}", other),
        }
        let slices = table.iter().filter(|(_, s)| s.is_slice()).count();
        assert_eq!(slices, 1);
    }

    #[test]
    fn test_pointer_shares_metadata() {
        let universe = Universe::new(WordSize::W64);
        let pkg = point_package();
        let mut table = SymbolTable::build(&universe, &pkg).unwrap();

        let t = table.resolve("S").unwrap();
        let p = table.resolve_type(&TypeExpr::pointer(TypeExpr::named("S"))).unwrap();
        assert_ne!(t, p);

        let (t, p) = (table.symbol(t), table.symbol(p));
        assert!(p.pointer && !t.pointer);
        assert_eq!(p.formats, t.formats);
        assert_eq!(p.converters, t.converters);
        assert_eq!(p.id, t.id);
        assert!(!p.needs_binding());
    }

    #[test]
    fn test_array_and_slice_buffer_laws() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p");
        let mut table = SymbolTable::new(&universe, &pkg);

        let arr = table.resolve_type(&TypeExpr::array(int(), 3)).unwrap();
        assert_eq!(table.symbol(arr).formats.buffer, "qqq");
        assert_eq!(table.symbol(arr).formats.signature, "[]int");
        assert_eq!(table.symbol(arr).layout, Layout::new(24, 8));

        let carr = table
            .resolve_type(&TypeExpr::array(TypeExpr::basic("complex128"), 4))
            .unwrap();
        assert_eq!(table.symbol(carr).formats.buffer.len(), 4 * "dd".len());

        let slice = table.resolve_type(&TypeExpr::slice(TypeExpr::basic("float32"))).unwrap();
        assert_eq!(table.symbol(slice).formats.buffer, "f");
        assert_eq!(table.symbol(slice).formats.signature, "[]float");
    }

    #[test]
    fn test_named_basic_inherits_codes() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p").decl(Decl::type_name("Celsius", TypeExpr::basic("float64")));
        let table = SymbolTable::build(&universe, &pkg).unwrap();

        let c = table.lookup("Celsius").unwrap();
        assert_eq!(c.formats, Formats::new("d", "d", "object"));
        assert_eq!(c.converters, Some(Converters::for_id("p_Celsius")));
        assert_eq!(c.basic_kind(), Some(BasicKind::Float64));
        assert!(c.needs_binding());
    }

    #[test]
    fn test_self_reference_through_slice_and_pointer() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::type_name(
                "Node",
                TypeExpr::structure(vec![
                    FieldDecl::new("Value", int()),
                    FieldDecl::new("Next", TypeExpr::pointer(TypeExpr::named("Node"))),
                    FieldDecl::new("Kids", TypeExpr::named("Nodes")),
                ]),
            ))
            .decl(Decl::type_name("Nodes", TypeExpr::slice(TypeExpr::named("Node"))));
        let mut table = SymbolTable::build(&universe, &pkg).unwrap();

        let node = table.resolve("Node").unwrap();
        let ptr = table.resolve_type(&TypeExpr::pointer(TypeExpr::named("Node"))).unwrap();
        assert_eq!(table.symbol(ptr).formats, table.symbol(node).formats);
        assert!(table.symbol(ptr).is_struct());

        let nodes = table.lookup("Nodes").unwrap();
        assert!(nodes.is_slice());
        assert_eq!(nodes.id, "p_Nodes");
    }

    #[test]
    fn test_self_reference_is_order_independent() {
        let universe = Universe::new(WordSize::W64);
        let node = Decl::type_name(
            "Node",
            TypeExpr::structure(vec![
                FieldDecl::new("Value", int()),
                FieldDecl::new("Kids", TypeExpr::named("Nodes")),
            ]),
        );
        let nodes = Decl::type_name("Nodes", TypeExpr::slice(TypeExpr::named("Node")));

        let node_first = Package::new("p").decl(node.clone()).decl(nodes.clone());
        let nodes_first = Package::new("p").decl(nodes).decl(node);
        let a = SymbolTable::build(&universe, &node_first).unwrap();
        let b = SymbolTable::build(&universe, &nodes_first).unwrap();

        assert_eq!(a.lookup("Node").unwrap().formats, b.lookup("Node").unwrap().formats);
        for name in ["Node", "Nodes"] {
            assert_eq!(a.lookup(name).unwrap().layout, b.lookup(name).unwrap().layout);
        }
        assert_eq!(a.lookup("Node").unwrap().layout, Layout::new(32, 8));
        assert!(b.lookup("Nodes").unwrap().is_slice());
    }

    #[test]
    fn test_struct_holding_named_signature_of_itself() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::type_name(
                "Handler",
                TypeExpr::signature(vec![ParamDecl::new("e", TypeExpr::named("Event"))], vec![]),
            ))
            .decl(Decl::type_name(
                "Event",
                TypeExpr::structure(vec![FieldDecl::new("H", TypeExpr::named("Handler"))]),
            ));
        let table = SymbolTable::build(&universe, &pkg).unwrap();

        let event = table.lookup("Event").unwrap();
        assert!(event.is_struct());
        assert_eq!(event.layout, Layout::word(WordSize::W64));
        assert!(matches!(
            table.lookup("Handler").unwrap().shape(),
            Some(TypeShape::Signature(_))
        ));
    }

    #[test]
    fn test_array_through_pending_struct_is_fatal() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::type_name("Row", TypeExpr::array(TypeExpr::named("Cell"), 2)))
            .decl(Decl::type_name(
                "Cell",
                TypeExpr::structure(vec![FieldDecl::new("R", TypeExpr::named("Row"))]),
            ));
        assert!(matches!(
            SymbolTable::build(&universe, &pkg),
            Err(BindError::RecursiveType(_))
        ));
    }

    #[test]
    fn test_oversized_array_is_rejected() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p");
        let mut table = SymbolTable::new(&universe, &pkg);

        let huge = TypeExpr::array(TypeExpr::basic("int64"), u32::MAX as u64);
        match table.resolve_type(&huge) {
            Err(BindError::UnsupportedShape { kind, .. }) => assert_eq!(kind, "array"),
            other => panic!("expected unsupported shape, got {:?}", other.map(|_| ())),
        }

        let wide = TypeExpr::array(TypeExpr::array(int(), 1 << 12), 1 << 12);
        assert!(matches!(
            table.resolve_type(&wide),
            Err(BindError::UnsupportedShape { kind: "array", .. })
        ));
        assert!(table.resolve_type(&TypeExpr::array(int(), 1 << 16)).is_ok());
    }

    #[test]
    fn test_recursion_by_value_is_fatal() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p").decl(Decl::type_name(
            "Loop",
            TypeExpr::structure(vec![FieldDecl::new("Inner", TypeExpr::named("Loop"))]),
        ));
        assert!(matches!(
            SymbolTable::build(&universe, &pkg),
            Err(BindError::RecursiveType(name)) if name == "Loop"
        ));
    }

    #[test]
    fn test_unresolvable_field_is_fatal() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p").decl(Decl::type_name(
            "T",
            TypeExpr::structure(vec![FieldDecl::new("M", TypeExpr::named("Missing"))]),
        ));
        assert!(matches!(
            SymbolTable::build(&universe, &pkg),
            Err(BindError::UnresolvableType(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_unsupported_shapes() {
        let universe = Universe::new(WordSize::W64);
        let cases = [
            (
                TypeExpr::Map {
                    key: Box::new(string()),
                    value: Box::new(int()),
                },
                "map",
            ),
            (TypeExpr::Chan(Box::new(int())), "chan"),
            (TypeExpr::Interface { methods: vec![] }, "interface"),
            (TypeExpr::pointer(int()), "pointer"),
            (TypeExpr::basic("error"), "interface"),
        ];
        for (ty, expected) in cases {
            let pkg = Package::new("p").decl(Decl::type_name("T", ty));
            match SymbolTable::build(&universe, &pkg) {
                Err(BindError::UnsupportedShape { kind, name }) => {
                    assert_eq!(kind, expected);
                    assert_eq!(name, "T");
                }
                other => panic!("expected unsupported shape, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn test_type_of_declarations() {
        let universe = Universe::new(WordSize::W64);
        let pkg = point_package()
            .decl(Decl::constant("N", TypeExpr::basic("untyped int")).with_value(HostValue::Int(3)))
            .decl(Decl::var("Origin", TypeExpr::named("S")))
            .decl(Decl::func("New", vec![], vec![TypeExpr::pointer(TypeExpr::named("S"))]));
        let mut table = SymbolTable::build(&universe, &pkg).unwrap();

        let s = table.resolve("S").unwrap();
        assert_eq!(table.type_of("Origin").unwrap(), s);
        assert_eq!(table.type_of("S").unwrap(), s);
        assert_eq!(table.type_of("N").unwrap(), universe.id_of("int").unwrap());

        let new = table.resolve("New").unwrap();
        assert_eq!(table.type_of("New").unwrap(), new);
        assert_eq!(table.symbol(new).cpy_name, "cpy_func_p_New");

        let n = table.lookup("N").unwrap();
        assert_eq!(n.cgo_name, "cgo_const_p_N");
        assert_eq!(
            n.kind,
            SymbolKind::Const {
                ty: universe.id_of("int").unwrap(),
                value: Some(NativeValue::Int(3)),
            }
        );

        assert!(matches!(
            table.type_of("Nope"),
            Err(BindError::UnresolvableType(_))
        ));
    }

    #[test]
    fn test_named_reference_to_non_type() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::var("V", int()))
            .decl(Decl::var("W", TypeExpr::named("V")));
        assert!(matches!(
            SymbolTable::build(&universe, &pkg),
            Err(BindError::UnexpectedKind { kind: "var", .. })
        ));
    }

    #[test]
    fn test_constant_out_of_range() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p")
            .decl(Decl::constant("Small", TypeExpr::basic("int8")).with_value(HostValue::Int(300)));
        assert!(matches!(
            SymbolTable::build(&universe, &pkg),
            Err(BindError::InvalidConstant { name, .. }) if name == "Small"
        ));
    }

    #[test]
    fn test_methods_are_resolved() {
        let universe = Universe::new(WordSize::W64);
        let pkg = Package::new("p").decl(
            Decl::type_name("Counter", int())
                .method(MethodDecl::new("Inc"))
                .method(
                    MethodDecl::new("Add")
                        .param(ParamDecl::new("by", TypeExpr::slice(int())))
                        .returns(int())
                        .returns(TypeExpr::basic("error")),
                ),
        );
        let table = SymbolTable::build(&universe, &pkg).unwrap();

        let counter = table.lookup("Counter").unwrap();
        let ids: Vec<_> = counter.methods.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["p_Counter_Inc", "p_Counter_Add"]);

        let add = &counter.methods[1];
        assert!(table.symbol(add.sig.params[0].ty).is_slice());
        assert!(table.symbol(add.sig.results[1]).is_error());
    }

    #[test]
    fn test_alias_chain_shares_underlying() {
        let universe = Universe::new(WordSize::W64);
        let pkg = point_package().decl(Decl::type_name("T", TypeExpr::named("S")));
        let table = SymbolTable::build(&universe, &pkg).unwrap();

        let t = table.lookup("T").unwrap();
        assert_eq!(t.id, "p_T");
        assert_eq!(t.formats.buffer, "qs");
    }
}
