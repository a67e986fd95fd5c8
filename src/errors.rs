// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! These only cover the ambient surfaces (config loading, graph construction,
//! kernel execution). The propagator itself has no recoverable errors: an
//! invariant violation there is a panic.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Node not found: {0}")]
    UnknownNode(String),

    #[error("Cycle detected in graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Kernel error in node '{node}': {message}")]
    KernelError { node: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LoopflowError>;
