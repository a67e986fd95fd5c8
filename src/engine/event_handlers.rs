// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::engine::{FetchedValue, NodeCompletion, NodeFailure, RunReport};
use crate::graph::NodeId;
use crate::propagator::TaggedNodeSeq;
use crate::types::Value;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these nodes to the executor.
    DispatchNodes(TaggedNodeSeq<Value>),
    /// The run is over (idle, failed or interrupted).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn exit() -> Self {
        Self {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        }
    }
}

/// Bookkeeping of nodes in flight during a run.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) inflight: usize,
    pub(crate) report: RunReport,
}

impl RunState {
    /// Account for newly ready nodes and build the step that dispatches them.
    pub(crate) fn dispatch(&mut self, ready: TaggedNodeSeq<Value>) -> CoreStep {
        self.inflight += ready.len();
        self.report.dead_nodes += ready.iter().filter(|t| t.is_dead).count();

        if self.inflight == 0 {
            debug!("no nodes in flight; run complete");
            return CoreStep::exit();
        }

        let commands = if ready.is_empty() {
            Vec::new()
        } else {
            vec![CoreCommand::DispatchNodes(ready)]
        };
        CoreStep {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a node completion: record fetched output, dispatch new work.
pub(crate) fn handle_node_completion(
    state: &mut RunState,
    fetch: &HashSet<NodeId>,
    completion: NodeCompletion,
) -> CoreStep {
    assert!(
        state.inflight > 0,
        "node '{}' completed with nothing in flight",
        completion.node
    );
    state.inflight -= 1;
    state.report.nodes_executed += 1;

    if fetch.contains(&completion.node_id) {
        if let Some(value) = completion.outputs.first().and_then(|e| e.value()) {
            debug!(node = %completion.node, frame = %completion.frame, iter = completion.iter, value, "fetched value");
            state.report.fetched.push(FetchedValue {
                node: completion.node.clone(),
                frame: completion.frame.clone(),
                iter: completion.iter,
                value: *value,
            });
        }
    }

    state.dispatch(completion.ready)
}

/// Handle a kernel failure: record it and stop the run.
pub(crate) fn handle_node_failure(state: &mut RunState, node: String, message: String) -> CoreStep {
    error!(%node, %message, "node failed; stopping run");
    state.inflight = state.inflight.saturating_sub(1);
    if state.report.failure.is_none() {
        state.report.failure = Some(NodeFailure { node, message });
    }
    CoreStep::exit()
}
