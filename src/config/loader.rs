// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{GraphFile, RawGraphFile};
use crate::errors::Result;

/// Load a graph definition from a given path and return the raw
/// `RawGraphFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

/// Deserialize a graph definition from TOML text.
pub fn load_from_str(contents: &str) -> Result<RawGraphFile> {
    let raw: RawGraphFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a graph definition from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks input references, per-op arity, enter attributes and cycles.
///
/// The result can be turned into a [`crate::graph::GraphView`] for execution.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphFile> {
    let raw = load_from_path(&path)?;
    GraphFile::try_from(raw)
}
