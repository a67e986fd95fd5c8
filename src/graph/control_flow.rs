// src/graph/control_flow.rs

//! Static frame inference.
//!
//! Every node is assigned to the static frame it executes in by a BFS from
//! the root nodes:
//! - outputs of an Enter belong to the Enter's `frame_name`
//! - outputs of an Exit belong to the frame enclosing the Exit's frame
//! - every other output stays in the frame of its source

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use crate::errors::{LoopflowError, Result};
use crate::graph::NodeId;

/// Minimal per-node view needed for inference.
pub(crate) struct FlowNode<'a> {
    pub name: &'a str,
    pub is_enter: bool,
    pub is_exit: bool,
    pub is_next_iteration: bool,
    pub enter_frame: Option<&'a str>,
    /// Data and control consumers, in edge order.
    pub consumers: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub(crate) struct ControlFlowInfo {
    /// Static frame of each node.
    pub frame_of: Vec<String>,
    /// Parent static frame of every non-root frame.
    pub parent_of: HashMap<String, String>,
}

pub(crate) fn build_control_flow_info(
    nodes: &[FlowNode<'_>],
    roots: &[NodeId],
) -> Result<ControlFlowInfo> {
    let mut frame_of: Vec<Option<String>> = vec![None; nodes.len()];
    // Enter node that opened the frame a node lives in.
    let mut parent_enter: Vec<Option<NodeId>> = vec![None; nodes.len()];
    let mut parent_of: HashMap<String, String> = HashMap::new();

    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for &root in roots {
        frame_of[root] = Some(String::new());
        queue.push_back(root);
    }

    while let Some(curr) = queue.pop_front() {
        let node = &nodes[curr];
        let curr_frame = frame_of[curr].clone().unwrap_or_default();

        // The root frame only ever runs iteration 0.
        if node.is_next_iteration && parent_enter[curr].is_none() {
            return Err(LoopflowError::ConfigError(format!(
                "next_iteration node '{}' is in the root frame",
                node.name
            )));
        }

        let (out_frame, out_parent) = if node.is_enter {
            let child = node.enter_frame.unwrap_or_default().to_string();
            record_parent(&mut parent_of, &child, &curr_frame)?;
            (child, Some(curr))
        } else if node.is_exit {
            let Some(enter) = parent_enter[curr] else {
                return Err(LoopflowError::ConfigError(format!(
                    "exit node '{}' is in the root frame",
                    node.name
                )));
            };
            let outer = frame_of[enter].clone().unwrap_or_default();
            (outer, parent_enter[enter])
        } else {
            (curr_frame.clone(), parent_enter[curr])
        };

        for &out in node.consumers.iter() {
            match &frame_of[out] {
                Some(existing) if *existing != out_frame => {
                    return Err(LoopflowError::ConfigError(format!(
                        "node '{}' is reached from frames '{}' and '{}'",
                        nodes[out].name,
                        display_frame(existing),
                        display_frame(&out_frame)
                    )));
                }
                Some(_) => {}
                None => {
                    trace!(node = nodes[out].name, frame = %out_frame, "assigned static frame");
                    frame_of[out] = Some(out_frame.clone());
                    parent_enter[out] = out_parent;
                    queue.push_back(out);
                }
            }
        }
    }

    let mut resolved = Vec::with_capacity(nodes.len());
    for (id, frame) in frame_of.into_iter().enumerate() {
        match frame {
            Some(frame) => resolved.push(frame),
            None => {
                return Err(LoopflowError::ConfigError(format!(
                    "node '{}' is not reachable from any root node",
                    nodes[id].name
                )));
            }
        }
    }

    // Frames entered by an Enter that has no consumers still need a parent.
    for (id, node) in nodes.iter().enumerate() {
        if let Some(child) = node.enter_frame {
            record_parent(&mut parent_of, child, &resolved[id])?;
        }
    }

    Ok(ControlFlowInfo {
        frame_of: resolved,
        parent_of,
    })
}

fn record_parent(parent_of: &mut HashMap<String, String>, child: &str, parent: &str) -> Result<()> {
    if child == parent {
        return Err(LoopflowError::ConfigError(format!(
            "frame '{child}' is entered from inside itself"
        )));
    }
    match parent_of.get(child) {
        Some(existing) if existing != parent => Err(LoopflowError::ConfigError(format!(
            "frame '{}' is entered from frames '{}' and '{}'",
            child,
            display_frame(existing),
            display_frame(parent)
        ))),
        Some(_) => Ok(()),
        None => {
            parent_of.insert(child.to_string(), parent.to_string());
            Ok(())
        }
    }
}

fn display_frame(name: &str) -> &str {
    if name.is_empty() { "<root>" } else { name }
}
