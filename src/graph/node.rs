// src/graph/node.rs

use crate::propagator::pending_counts::Handle;
use crate::types::OpKind;

/// Dense node index into [`crate::graph::GraphView`].
pub type NodeId = usize;

/// A data edge leaving a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeInfo {
    pub dst_id: NodeId,
    /// Output slot of the source node.
    pub output_slot: usize,
    /// Absolute slot in the destination frame's input buffer.
    pub input_slot: usize,
    /// This is the last edge reading `output_slot`; the value may be moved.
    pub is_last: bool,
}

/// A control edge leaving a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEdgeInfo {
    pub dst_id: NodeId,
}

/// Immutable per-node metadata consumed by the propagator.
#[derive(Debug, Clone)]
pub struct NodeItem {
    pub node_id: NodeId,
    pub name: String,
    pub op: OpKind,
    /// Number of data inputs.
    pub num_inputs: usize,
    /// Number of control inputs.
    pub num_control_inputs: usize,
    pub num_outputs: usize,
    /// First slot of this node's inputs in its frame's input buffer.
    pub input_start: usize,
    /// Record of this node inside its frame's pending counts.
    pub pending_id: Handle,
    /// Static frame the node executes in (`""` is the root frame).
    pub frame: String,

    pub output_edges: Vec<EdgeInfo>,
    pub output_control_edges: Vec<ControlEdgeInfo>,

    pub is_merge: bool,
    pub is_enter: bool,
    pub is_constant_enter: bool,
    pub is_exit: bool,
    pub is_next_iteration: bool,
    pub is_control_trigger: bool,
    pub is_enter_exit_or_next_iter: bool,
    /// Some consumer (data or control) is a merge or control trigger. Selects
    /// the merge-aware activation path.
    pub is_any_consumer_merge_or_control_trigger: bool,

    /// Declared child frame name (enter only).
    pub frame_name: Option<String>,
    /// Requested parallelism bound of the child frame (enter only).
    pub parallel_iterations: Option<usize>,
    /// Payload of a const node.
    pub value: Option<i64>,
}

impl NodeItem {
    /// Total number of inputs, data and control.
    pub fn num_operands(&self) -> usize {
        self.num_inputs + self.num_control_inputs
    }

    /// Initial pending count seeded into every new iteration.
    pub fn initial_pending_count(&self) -> u32 {
        let count = if self.is_merge {
            (self.num_control_inputs << 1) | 1
        } else {
            self.num_operands()
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
