//! Package descriptions
//!
//! A [`Package`] is the exported surface of one source package, in
//! declaration order, as handed over by the front-end.

use crate::error::{BindResult, PackageValidationError};
use crate::ir::{HostValue, ParamDecl, TypeExpr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Exported surface of one source package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Package name (e.g., "geo")
    pub name: String,

    /// Import path (e.g., "example.com/geo")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Package documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Exported declarations, in source order
    #[serde(default)]
    pub decls: Vec<Decl>,
}

impl Package {
    /// Create an empty package
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            doc: None,
            decls: Vec::new(),
        }
    }

    /// Set the import path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Add a declaration
    pub fn decl(mut self, decl: Decl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Look up a declaration by name
    pub fn lookup(&self, name: &str) -> Option<&Decl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Parse a package description from JSON
    pub fn from_json(json: &str) -> BindResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a package description from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> BindResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| crate::error::BindError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Validate the package description
    pub fn validate(&self) -> Result<(), PackageValidationError> {
        if self.name.is_empty() {
            return Err(PackageValidationError::EmptyName);
        }
        if !is_c_identifier(&self.name) {
            return Err(PackageValidationError::InvalidName(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for decl in &self.decls {
            if !seen.insert(&decl.name) {
                return Err(PackageValidationError::DuplicateDecl(decl.name.clone()));
            }
            if !decl.methods.is_empty() && decl.kind != DeclKind::Type {
                return Err(PackageValidationError::MethodsOnNonType(decl.name.clone()));
            }

            let mut methods = HashSet::new();
            for m in &decl.methods {
                if !methods.insert(&m.name) {
                    return Err(PackageValidationError::DuplicateMethod(format!(
                        "{}.{}",
                        decl.name, m.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Kind of an exported declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Const,
    Var,
    Func,
    Type,
}

/// One exported declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    /// Declared name
    pub name: String,

    /// Declaration kind
    pub kind: DeclKind,

    /// Type of a const/var, signature of a func, underlying type of a type name
    pub ty: TypeExpr,

    /// Documentation comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Exported methods (type declarations only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDecl>,

    /// Literal value of a constant, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<HostValue>,
}

impl Decl {
    fn new(name: impl Into<String>, kind: DeclKind, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            doc: None,
            methods: Vec::new(),
            value: None,
        }
    }

    /// Create a constant declaration
    pub fn constant(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self::new(name, DeclKind::Const, ty)
    }

    /// Create a variable declaration
    pub fn var(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self::new(name, DeclKind::Var, ty)
    }

    /// Create a function declaration
    pub fn func(name: impl Into<String>, params: Vec<ParamDecl>, results: Vec<TypeExpr>) -> Self {
        Self::new(name, DeclKind::Func, TypeExpr::signature(params, results))
    }

    /// Create a type declaration over an underlying type
    pub fn type_name(name: impl Into<String>, underlying: TypeExpr) -> Self {
        Self::new(name, DeclKind::Type, underlying)
    }

    /// Set documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Set the literal value of a constant
    pub fn with_value(mut self, value: HostValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

/// Exported method of a type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,

    #[serde(default)]
    pub params: Vec<ParamDecl>,

    #[serde(default)]
    pub results: Vec<TypeExpr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Whether the receiver is `*T` rather than `T`
    #[serde(default)]
    pub pointer_receiver: bool,
}

impl MethodDecl {
    /// Create a new method
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
            doc: None,
            pointer_receiver: false,
        }
    }

    /// Add a parameter
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Add a result
    pub fn returns(mut self, ty: TypeExpr) -> Self {
        self.results.push(ty);
        self
    }

    /// Set documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Mark the receiver as a pointer
    pub fn pointer_receiver(mut self) -> Self {
        self.pointer_receiver = true;
        self
    }
}
