// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (nodes in flight, fetched values)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels and handing ready nodes to the executor. The core is
//! intended to be unit tested without any Tokio or channels.

use std::collections::HashSet;

use tracing::info;

use crate::engine::event_handlers::{
    CoreStep, RunState, handle_node_completion, handle_node_failure,
};
use crate::engine::{RunReport, RuntimeEvent};
use crate::graph::NodeId;
use crate::propagator::TaggedNodeSeq;
use crate::types::Value;

#[derive(Debug)]
pub struct CoreRuntime {
    fetch: HashSet<NodeId>,
    state: RunState,
}

impl CoreRuntime {
    pub fn new(fetch: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            fetch: fetch.into_iter().collect(),
            state: RunState::default(),
        }
    }

    /// Dispatch the root nodes of the run.
    pub fn start(&mut self, roots: TaggedNodeSeq<Value>) -> CoreStep {
        info!(roots = roots.len(), "starting run");
        self.state.dispatch(roots)
    }

    /// Number of dispatched nodes that have not reported back.
    pub fn inflight(&self) -> usize {
        self.state.inflight
    }

    pub fn is_idle(&self) -> bool {
        self.state.inflight == 0
    }

    pub fn report(&self) -> &RunReport {
        &self.state.report
    }

    pub fn into_report(self) -> RunReport {
        self.state.report
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::NodeCompleted(completion) => {
                handle_node_completion(&mut self.state, &self.fetch, completion)
            }
            RuntimeEvent::NodeFailed { node, message } => {
                handle_node_failure(&mut self.state, node, message)
            }
            RuntimeEvent::ShutdownRequested => {
                info!(inflight = self.state.inflight, "shutdown requested");
                self.state.report.interrupted = true;
                CoreStep::exit()
            }
        }
    }
}
