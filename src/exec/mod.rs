// src/exec/mod.rs

//! Node execution layer.
//!
//! - [`kernels`] implements the integer computation of every op.
//! - [`node_runner`] runs one ready node: takes its inputs, computes (or
//!   skips a dead node), and propagates its outputs.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `KernelExecutorBackend` the runtime uses in production, and which tests
//!   can replace with a fake implementation.

pub mod backend;
pub mod kernels;
pub mod node_runner;

pub use backend::{ExecutorBackend, KernelExecutorBackend};
pub use node_runner::run_node;
