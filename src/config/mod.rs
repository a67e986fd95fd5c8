// src/config/mod.rs

//! Graph definition loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a definition from disk (`loader.rs`).
//! - Validate the invariants the propagator relies on (`validate.rs`). The
//!   propagator treats any violation of these as fatal, so they are checked
//!   here, up front, with a proper error.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigSection, GraphFile, NodeConfig, RawGraphFile};
