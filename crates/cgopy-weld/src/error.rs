//! Error types for binding generation

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a binding generation run
#[derive(Debug, Error)]
pub enum BindError {
    /// A referenced type is known neither to the package nor the universe
    #[error("could not resolve type [{0}]")]
    UnresolvableType(String),

    /// A structural shape no builder handles
    #[error("unsupported {kind} type [{name}]")]
    UnsupportedShape { kind: &'static str, name: String },

    /// A symbol was used where another kind was required
    #[error("unexpected symbol kind for [{name}]: {kind}")]
    UnexpectedKind { name: String, kind: &'static str },

    /// A type contains itself by value
    #[error("type [{0}] contains itself by value")]
    RecursiveType(String),

    /// A constant literal does not fit its declared type
    #[error("invalid constant [{name}]: {reason}")]
    InvalidConstant { name: String, reason: String },

    /// Package description failed validation
    #[error("invalid package: {0}")]
    InvalidPackage(#[from] PackageValidationError),

    /// IO error while reading input or writing artifacts
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed package description
    #[error("malformed package description: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// No output directory configured and none provided by the environment
    #[error("environment variable not set: {0}")]
    EnvVarMissing(String),
}

impl BindError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BindError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors found while validating a package description
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageValidationError {
    #[error("package name cannot be empty")]
    EmptyName,

    #[error("package name is not a C identifier: {0}")]
    InvalidName(String),

    #[error("duplicate declaration: {0}")]
    DuplicateDecl(String),

    #[error("duplicate method: {0}")]
    DuplicateMethod(String),

    #[error("methods declared on non-type declaration: {0}")]
    MethodsOnNonType(String),
}

/// Result alias used throughout the crate
pub type BindResult<T> = Result<T, BindError>;
