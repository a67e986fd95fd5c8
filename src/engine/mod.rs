// src/engine/mod.rs

//! Orchestration engine for loopflow.
//!
//! This module ties the propagator to an executor:
//! - workers report finished nodes (and the nodes they made ready) as
//!   [`RuntimeEvent`]s
//! - the core decides what to dispatch next and when the run is over
//! - fetched values and failures are collected into a [`RunReport`]
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::graph::NodeId;
use crate::propagator::{Entry, IterNum, TaggedNodeSeq};
use crate::types::Value;

/// A node finished and its outputs were propagated.
#[derive(Debug, Clone)]
pub struct NodeCompletion {
    pub node_id: NodeId,
    pub node: String,
    /// Dynamic frame the node ran in.
    pub frame: String,
    pub iter: IterNum,
    pub is_dead: bool,
    pub outputs: Vec<Entry<Value>>,
    /// Nodes that became ready through this completion.
    pub ready: TaggedNodeSeq<Value>,
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    NodeCompleted(NodeCompletion),
    /// A kernel reported an error; the run stops.
    NodeFailed { node: String, message: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Live output 0 of a fetched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedValue {
    pub node: String,
    pub frame: String,
    pub iter: IterNum,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: String,
    pub message: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Fetched values in completion order.
    pub fetched: Vec<FetchedValue>,
    pub nodes_executed: usize,
    /// Nodes that were dispatched dead.
    pub dead_nodes: usize,
    pub failure: Option<NodeFailure>,
    /// True when the run ended due to a shutdown request.
    pub interrupted: bool,
}

impl RunReport {
    /// Values fetched from `node`, in completion order.
    pub fn values_of(&self, node: &str) -> Vec<Value> {
        self.fetched
            .iter()
            .filter(|f| f.node == node)
            .map(|f| f.value)
            .collect()
    }
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
