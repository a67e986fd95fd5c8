// src/graph/mod.rs

//! Immutable graph metadata consumed by the propagator.
//!
//! - [`node`] holds per-node descriptors and edge records.
//! - [`view`] builds the [`GraphView`] (node table and per-frame layout) from
//!   a validated graph definition.
//! - [`control_flow`] infers which static frame every node runs in.

pub(crate) mod control_flow;
pub mod node;
pub mod view;

pub use node::{ControlEdgeInfo, EdgeInfo, NodeId, NodeItem};
pub use view::{FrameInfo, GraphView};
