// src/propagator/entry.rs

use std::fmt;
use std::sync::Arc;

use crate::graph::NodeId;
use crate::propagator::frame::FrameState;

/// Iteration index within a frame.
pub type IterNum = usize;

/// A value travelling along an edge, or the absence of one.
///
/// `NoValue` marks a dead value: its producer sat on an untaken branch. It
/// still counts as an arrived input for readiness purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<V> {
    NoValue,
    Value(V),
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Entry::NoValue
    }
}

impl<V> Entry<V> {
    pub fn is_dead(&self) -> bool {
        matches!(self, Entry::NoValue)
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::NoValue => None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::NoValue => None,
        }
    }

    /// Move the value out, leaving `NoValue` behind.
    pub fn take(&mut self) -> Entry<V> {
        std::mem::take(self)
    }
}

impl<V> From<V> for Entry<V> {
    fn from(v: V) -> Self {
        Entry::Value(v)
    }
}

/// A node that is ready to run, bound to the frame and iteration it must run
/// in.
///
/// Dead tagged nodes are still handed to the executor; it is expected to
/// skip the computation and report the node back with dead outputs.
pub struct TaggedNode<V> {
    pub node_id: NodeId,
    pub frame: Arc<FrameState<V>>,
    pub iter: IterNum,
    pub is_dead: bool,
}

impl<V> TaggedNode<V> {
    pub fn new(node_id: NodeId, frame: Arc<FrameState<V>>, iter: IterNum, is_dead: bool) -> Self {
        Self {
            node_id,
            frame,
            iter,
            is_dead,
        }
    }

    pub fn frame_name(&self) -> &str {
        self.frame.frame_name()
    }
}

impl<V> Clone for TaggedNode<V> {
    fn clone(&self) -> Self {
        Self {
            node_id: self.node_id,
            frame: Arc::clone(&self.frame),
            iter: self.iter,
            is_dead: self.is_dead,
        }
    }
}

impl<V> fmt::Debug for TaggedNode<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedNode")
            .field("node_id", &self.node_id)
            .field("frame", &self.frame.frame_name())
            .field("iter", &self.iter)
            .field("is_dead", &self.is_dead)
            .finish()
    }
}

/// Ready nodes produced by one propagation step, in activation order.
pub type TaggedNodeSeq<V> = Vec<TaggedNode<V>>;
