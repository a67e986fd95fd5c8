// src/graph/view.rs

use std::collections::HashMap;

use tracing::debug;

use crate::config::model::GraphFile;
use crate::errors::{LoopflowError, Result};
use crate::graph::control_flow::{FlowNode, build_control_flow_info};
use crate::graph::node::{ControlEdgeInfo, EdgeInfo, NodeId, NodeItem};
use crate::propagator::pending_counts::{Handle, PendingCounts};
use crate::types::{InputRef, OpKind};

/// Static layout of one frame, shared by all of its dynamic instances.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Static frame name (`""` for the root frame).
    pub name: String,
    /// Static name of the enclosing frame, `None` for the root.
    pub parent: Option<String>,
    /// Number of Enter nodes feeding this frame.
    pub input_count: usize,
    /// Size of each iteration's input buffer.
    pub total_inputs: usize,
    /// Template cloned into every new iteration.
    pub pending_counts: PendingCounts,
    /// Nodes that execute in this frame.
    pub nodes: Vec<NodeId>,
}

/// Immutable graph metadata, built once from a validated [`GraphFile`] and
/// shared read-only by every propagator run.
#[derive(Debug, Clone)]
pub struct GraphView {
    nodes: Vec<NodeItem>,
    frames: HashMap<String, FrameInfo>,
    by_name: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
    fetch: Vec<NodeId>,
}

struct ParsedNode {
    data: Vec<(NodeId, usize)>,
    control: Vec<NodeId>,
}

impl GraphView {
    /// Build the view from a validated [`GraphFile`].
    ///
    /// Fails when static frames cannot be inferred consistently (see
    /// [`crate::graph::control_flow`]).
    pub fn from_config(cfg: &GraphFile) -> Result<Self> {
        let names: Vec<&String> = cfg.node.keys().collect();
        let by_name: HashMap<String, NodeId> = names
            .iter()
            .enumerate()
            .map(|(id, name)| ((*name).clone(), id))
            .collect();

        let lookup = |name: &str| -> Result<NodeId> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| LoopflowError::UnknownNode(name.to_string()))
        };

        let mut parsed = Vec::with_capacity(names.len());
        for node in cfg.node.values() {
            let inputs = node.parsed_inputs().map_err(LoopflowError::ConfigError)?;
            let mut data = Vec::new();
            let mut control = Vec::new();
            for input in inputs {
                match input {
                    InputRef::Data { node, slot } => data.push((lookup(node.as_str())?, slot)),
                    InputRef::Control { node } => control.push(lookup(node.as_str())?),
                }
            }
            parsed.push(ParsedNode { data, control });
        }

        // Consumers per source, in destination order.
        let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); names.len()];
        for (dst, p) in parsed.iter().enumerate() {
            for &(src, _) in p.data.iter() {
                consumers[src].push(dst);
            }
            for &src in p.control.iter() {
                consumers[src].push(dst);
            }
        }

        let roots: Vec<NodeId> = parsed
            .iter()
            .enumerate()
            .filter(|(_, p)| p.data.is_empty() && p.control.is_empty())
            .map(|(id, _)| id)
            .collect();

        let configs: Vec<_> = cfg.node.values().collect();
        let flow_nodes: Vec<FlowNode<'_>> = configs
            .iter()
            .enumerate()
            .map(|(id, node)| FlowNode {
                name: names[id].as_str(),
                is_enter: node.op == OpKind::Enter,
                is_exit: node.op == OpKind::Exit,
                is_next_iteration: node.op == OpKind::NextIteration,
                enter_frame: node.frame_name.as_deref(),
                consumers: consumers[id].clone(),
            })
            .collect();
        let cf = build_control_flow_info(&flow_nodes, &roots)?;

        // Lay out every frame: input slots and pending handles.
        let mut frames: HashMap<String, FrameInfo> = HashMap::new();
        frames.insert(String::new(), FrameInfo::empty(String::new(), None));
        for (child, parent) in cf.parent_of.iter() {
            frames.insert(
                child.clone(),
                FrameInfo::empty(child.clone(), Some(parent.clone())),
            );
        }

        let mut input_start = vec![0usize; names.len()];
        let mut pending_index = vec![0usize; names.len()];
        for id in 0..names.len() {
            let info = frames
                .get_mut(&cf.frame_of[id])
                .ok_or_else(|| LoopflowError::ConfigError(format!(
                    "node '{}' lives in undeclared frame '{}'",
                    names[id], cf.frame_of[id]
                )))?;
            input_start[id] = info.total_inputs;
            info.total_inputs += parsed[id].data.len();
            pending_index[id] = info.nodes.len();
            info.nodes.push(id);
        }

        let mut nodes: Vec<NodeItem> = Vec::with_capacity(names.len());
        for (id, node) in configs.iter().enumerate() {
            nodes.push(NodeItem {
                node_id: id,
                name: names[id].clone(),
                op: node.op,
                num_inputs: parsed[id].data.len(),
                num_control_inputs: parsed[id].control.len(),
                num_outputs: node.op.num_outputs(),
                input_start: input_start[id],
                pending_id: Handle::new(pending_index[id]),
                frame: cf.frame_of[id].clone(),
                output_edges: Vec::new(),
                output_control_edges: Vec::new(),
                is_merge: node.op == OpKind::Merge,
                is_enter: node.op == OpKind::Enter,
                is_constant_enter: node.op == OpKind::Enter && node.is_constant,
                is_exit: node.op == OpKind::Exit,
                is_next_iteration: node.op == OpKind::NextIteration,
                is_control_trigger: node.op == OpKind::ControlTrigger,
                is_enter_exit_or_next_iter: node.op.is_transfer(),
                is_any_consumer_merge_or_control_trigger: false,
                frame_name: node.frame_name.clone(),
                parallel_iterations: (node.op == OpKind::Enter).then(|| {
                    node.effective_parallel_iterations(cfg.config.default_parallel_iterations)
                }),
                value: node.value,
            });
        }

        // Output edges, in destination order.
        for (dst, p) in parsed.iter().enumerate() {
            for (k, &(src, slot)) in p.data.iter().enumerate() {
                let edge = EdgeInfo {
                    dst_id: dst,
                    output_slot: slot,
                    input_slot: input_start[dst] + k,
                    is_last: false,
                };
                nodes[src].output_edges.push(edge);
            }
            for &src in p.control.iter() {
                nodes[src]
                    .output_control_edges
                    .push(ControlEdgeInfo { dst_id: dst });
            }
        }

        let special: Vec<bool> = nodes
            .iter()
            .map(|n| n.is_merge || n.is_control_trigger)
            .collect();
        for node in nodes.iter_mut() {
            mark_last_uses(&mut node.output_edges);
            node.is_any_consumer_merge_or_control_trigger = node
                .output_edges
                .iter()
                .map(|e| e.dst_id)
                .chain(node.output_control_edges.iter().map(|e| e.dst_id))
                .any(|dst| special[dst]);
        }

        // Pending-count templates and frame input counts.
        for info in frames.values_mut() {
            let mut template = PendingCounts::new(info.nodes.len());
            for &id in info.nodes.iter() {
                template.set_initial_count(nodes[id].pending_id, nodes[id].initial_pending_count());
            }
            info.pending_counts = template;
        }
        for node in nodes.iter().filter(|n| n.is_enter) {
            if let Some(info) = node.frame_name.as_ref().and_then(|f| frames.get_mut(f)) {
                info.input_count += 1;
            }
        }

        let fetch = cfg
            .config
            .fetch
            .iter()
            .map(|name| lookup(name.as_str()))
            .collect::<Result<Vec<_>>>()?;

        for info in frames.values() {
            debug!(
                frame = %info.name,
                nodes = info.nodes.len(),
                total_inputs = info.total_inputs,
                input_count = info.input_count,
                "static frame laid out"
            );
        }

        Ok(Self {
            nodes,
            frames,
            by_name,
            roots,
            fetch,
        })
    }

    pub fn node(&self, id: NodeId) -> &NodeItem {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[NodeItem] {
        &self.nodes
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Nodes with no inputs at all; they seed the root frame.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes listed in `[config].fetch`.
    pub fn fetch(&self) -> &[NodeId] {
        &self.fetch
    }

    pub fn frame_info(&self, name: &str) -> Option<&FrameInfo> {
        self.frames.get(name)
    }

    /// All static frames, sorted by name.
    pub fn frame_infos(&self) -> Vec<&FrameInfo> {
        let mut infos: Vec<_> = self.frames.values().collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl FrameInfo {
    fn empty(name: String, parent: Option<String>) -> Self {
        Self {
            name,
            parent,
            input_count: 0,
            total_inputs: 0,
            pending_counts: PendingCounts::default(),
            nodes: Vec::new(),
        }
    }
}

/// Flag the last edge reading each output slot.
fn mark_last_uses(edges: &mut [EdgeInfo]) {
    let mut seen: Vec<usize> = Vec::new();
    for edge in edges.iter_mut().rev() {
        if !seen.contains(&edge.output_slot) {
            seen.push(edge.output_slot);
            edge.is_last = true;
        }
    }
}
