//! Binding configuration (`cgopy.toml`)
//!
//! ```toml
//! abi = "cpython3"
//! word_size = 64
//! glue_header = "_cgo_export.h"
//! runtime_header = "cgopy_seq_cpy.h"
//! header_name = "geo.h"
//! source_name = "geo.c"
//! ```
//!
//! Every key is optional; unknown keys are rejected.

use crate::codegen::{GenOptions, HostAbi};
use crate::error::{BindError, BindResult};
use crate::ir::WordSize;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_glue_header() -> String {
    "_cgo_export.h".to_string()
}

fn default_runtime_header() -> String {
    "cgopy_seq_cpy.h".to_string()
}

/// Options of one binding run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindConfig {
    /// Host ABI of the generated extension
    #[serde(default)]
    pub abi: HostAbi,

    /// Target pointer width in bits; the host's when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_size: Option<WordSize>,

    /// Header exported by the native glue
    #[serde(default = "default_glue_header")]
    pub glue_header: String,

    /// Header of the runtime support library
    #[serde(default = "default_runtime_header")]
    pub runtime_header: String,

    /// Declarations artifact name, `<pkg>.h` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,

    /// Implementation artifact name, `<pkg>.c` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            abi: HostAbi::default(),
            word_size: None,
            glue_header: default_glue_header(),
            runtime_header: default_runtime_header(),
            header_name: None,
            source_name: None,
        }
    }
}

impl BindConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> BindResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> BindResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BindError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Effective target word size
    pub fn word_size(&self) -> WordSize {
        self.word_size.unwrap_or_default()
    }

    /// Declarations artifact name for a package
    pub fn header_name(&self, package: &str) -> String {
        self.header_name
            .clone()
            .unwrap_or_else(|| format!("{}.h", package))
    }

    /// Implementation artifact name for a package
    pub fn source_name(&self, package: &str) -> String {
        self.source_name
            .clone()
            .unwrap_or_else(|| format!("{}.c", package))
    }

    /// Generator options for a package
    pub fn gen_options(&self, package: &str) -> GenOptions {
        GenOptions {
            abi: self.abi,
            header_name: self.header_name(package),
            runtime_header: self.runtime_header.clone(),
            glue_header: self.glue_header.clone(),
        }
    }
}
