//! Build utilities for cgopy bindings
//!
//! This module provides:
//! - `BindConfig`, the `cgopy.toml` configuration
//! - `BindingBuilder`, which resolves a package and writes both C artifacts

pub mod builder;
pub mod config;

pub use builder::{BindingBuilder, BuildOutput};
pub use config::BindConfig;
