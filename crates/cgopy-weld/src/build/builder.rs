//! BindingBuilder for one-call binding generation
//!
//! This module ties the pipeline together: validate the package, build the
//! universe and symbol table, generate both artifacts in memory and only
//! then write them out.

use crate::build::BindConfig;
use crate::codegen::{generate, Artifacts, HostAbi};
use crate::error::{BindError, BindResult};
use crate::ir::{Package, SymbolTable, Universe, WordSize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builder for the C sources of one package
///
/// # Example
/// ```ignore
/// use cgopy_weld::build::BindingBuilder;
///
/// fn main() {
///     BindingBuilder::from_json_file("geo.json")
///         .expect("Failed to read package")
///         .out_dir("bindings")
///         .build()
///         .expect("Failed to generate bindings");
/// }
/// ```
pub struct BindingBuilder {
    package: Package,
    config: BindConfig,
    out_dir: Option<PathBuf>,
}

impl BindingBuilder {
    /// Create a builder for a package description
    pub fn new(package: Package) -> Self {
        Self {
            package,
            config: BindConfig::default(),
            out_dir: None,
        }
    }

    /// Create a builder from a JSON package description
    pub fn from_json_file(path: impl AsRef<Path>) -> BindResult<Self> {
        Ok(Self::new(Package::from_json_file(path)?))
    }

    /// Replace the configuration
    pub fn config(mut self, config: BindConfig) -> Self {
        self.config = config;
        self
    }

    /// Select the host ABI
    pub fn abi(mut self, abi: HostAbi) -> Self {
        self.config.abi = abi;
        self
    }

    /// Override the target word size
    pub fn word_size(mut self, word: WordSize) -> Self {
        self.config.word_size = Some(word);
        self
    }

    /// Directory the artifacts are written to; `OUT_DIR` when unset
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Resolve the package and generate both artifacts in memory
    pub fn generate(&self) -> BindResult<Artifacts> {
        let universe = Universe::new(self.config.word_size());
        let table = SymbolTable::build(&universe, &self.package)?;
        let options = self.config.gen_options(&self.package.name);
        Ok(generate(&table, options))
    }

    /// Generate and write both artifacts
    ///
    /// Nothing is written when resolution fails.
    pub fn build(self) -> BindResult<BuildOutput> {
        let out_dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => env::var("OUT_DIR")
                .map(PathBuf::from)
                .map_err(|_| BindError::EnvVarMissing("OUT_DIR".to_string()))?,
        };

        let artifacts = self.generate()?;
        debug!(
            package = %self.package.name,
            decl_bytes = artifacts.declarations.len(),
            impl_bytes = artifacts.implementation.len(),
            "bindings generated"
        );

        fs::create_dir_all(&out_dir).map_err(|e| BindError::io(&out_dir, e))?;
        let header = out_dir.join(self.config.header_name(&self.package.name));
        let source = out_dir.join(self.config.source_name(&self.package.name));
        fs::write(&header, &artifacts.declarations).map_err(|e| BindError::io(&header, e))?;
        if let Err(e) = fs::write(&source, &artifacts.implementation) {
            // never leave a header without its implementation
            let _ = fs::remove_file(&header);
            return Err(BindError::io(&source, e));
        }

        info!(
            package = %self.package.name,
            header = %header.display(),
            source = %source.display(),
            "bindings written"
        );
        Ok(BuildOutput { header, source })
    }
}

/// Paths of the written artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Declarations artifact (`<pkg>.h`)
    pub header: PathBuf,
    /// Implementation artifact (`<pkg>.c`)
    pub source: PathBuf,
}
