// src/exec/node_runner.rs

//! Execution of a single ready node.

use tracing::{debug, trace};

use crate::engine::{NodeCompletion, RuntimeEvent};
use crate::exec::kernels::compute;
use crate::propagator::{Entry, PropagatorState, TaggedNode};
use crate::types::Value;

/// Run `tagged` to completion and propagate its outputs.
///
/// Dead nodes skip their kernel and emit `NoValue` on every output, except
/// transfer nodes which always forward their (dead) input. Returns the event
/// to report back to the runtime; nodes made ready by the propagation travel
/// inside it.
pub fn run_node(propagator: &PropagatorState<Value>, tagged: TaggedNode<Value>) -> RuntimeEvent {
    let item = propagator.graph().node(tagged.node_id);

    propagator.mark_started(&tagged);
    let inputs = propagator.take_inputs(&tagged);

    let outputs = if tagged.is_dead && !item.is_enter_exit_or_next_iter {
        vec![Entry::NoValue; item.num_outputs]
    } else {
        match compute(item, &inputs) {
            Ok(outputs) => outputs,
            Err(err) => {
                debug!(node = %item.name, frame = %tagged.frame_name(), iter = tagged.iter, error = %err, "kernel failed");
                return RuntimeEvent::NodeFailed {
                    node: item.name.clone(),
                    message: err.to_string(),
                };
            }
        }
    };
    propagator.mark_completed(&tagged);

    trace!(
        node = %item.name,
        frame = %tagged.frame_name(),
        iter = tagged.iter,
        is_dead = tagged.is_dead,
        "node completed"
    );

    let mut ready = Vec::new();
    propagator.propagate_outputs(&tagged, outputs.clone(), &mut ready);

    RuntimeEvent::NodeCompleted(NodeCompletion {
        node_id: tagged.node_id,
        node: item.name.clone(),
        frame: tagged.frame_name().to_string(),
        iter: tagged.iter,
        is_dead: tagged.is_dead,
        outputs,
        ready,
    })
}
