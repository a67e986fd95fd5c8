// src/propagator/iteration.rs

use crate::propagator::entry::{Entry, IterNum};
use crate::propagator::pending_counts::{AdjustResult, Handle, NodeState, PendingCounts};

/// State of one loop iteration within one frame.
///
/// Created from the frame's pending-count template when the frame starts the
/// iteration; dropped when the iteration retires.
#[derive(Debug)]
pub struct IterationState<V> {
    pub(crate) iter_num: IterNum,
    counts: PendingCounts,
    /// Input slots of every node in the frame, indexed by
    /// `NodeItem::input_start + k`.
    pub(crate) input_tensors: Vec<Entry<V>>,
    /// Nodes made ready in this iteration that have not completed yet.
    pub(crate) outstanding_ops: usize,
    /// Child frames spawned from this iteration that are still alive.
    pub(crate) outstanding_frame_count: usize,
}

impl<V> IterationState<V> {
    pub fn new(iter_num: IterNum, template: &PendingCounts, total_input_tensors: usize) -> Self {
        let mut input_tensors = Vec::with_capacity(total_input_tensors);
        input_tensors.resize_with(total_input_tensors, Entry::default);
        Self {
            iter_num,
            counts: template.clone(),
            input_tensors,
            outstanding_ops: 0,
            outstanding_frame_count: 0,
        }
    }

    pub fn iter_num(&self) -> IterNum {
        self.iter_num
    }

    pub fn outstanding_ops(&self) -> usize {
        self.outstanding_ops
    }

    pub fn outstanding_frame_count(&self) -> usize {
        self.outstanding_frame_count
    }

    /// Input slot `slot` of this iteration's buffer.
    pub fn input(&self, slot: usize) -> &Entry<V> {
        &self.input_tensors[slot]
    }

    pub fn node_state(&self, h: Handle) -> NodeState {
        self.counts.node_state(h)
    }

    pub fn pending(&self, h: Handle) -> u32 {
        self.counts.pending(h)
    }

    pub fn dead_count(&self, h: Handle) -> u32 {
        self.counts.dead_count(h)
    }

    pub(crate) fn decrement_pending(&mut self, h: Handle, by: u32) -> u32 {
        self.counts.decrement_pending(h, by)
    }

    pub(crate) fn mark_live(&mut self, h: Handle) {
        self.counts.mark_live(h)
    }

    pub(crate) fn increment_dead_count(&mut self, h: Handle) {
        self.counts.increment_dead_count(h)
    }

    pub(crate) fn adjust_for_activation(&mut self, h: Handle, increment_dead: bool) -> AdjustResult {
        self.counts.adjust_for_activation(h, increment_dead)
    }

    pub(crate) fn mark_started(&mut self, h: Handle) {
        self.counts.mark_started(h)
    }

    pub(crate) fn mark_completed(&mut self, h: Handle) {
        self.counts.mark_completed(h)
    }

    /// Number of input slots currently holding a live value.
    pub fn live_inputs(&self) -> usize {
        self.input_tensors.iter().filter(|e| !e.is_dead()).count()
    }
}
