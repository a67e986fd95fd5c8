// src/propagator/frame.rs

//! Dynamic frame instances.
//!
//! A [`FrameState`] is one execution of a static frame: the root frame, or
//! one run of a loop body entered from a particular parent iteration. It
//! owns a ring of live iterations and everything needed to start new ones.
//! All mutable state sits behind the frame's own mutex; [`LockedFrame`] is
//! the guard through which the propagator manipulates it.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::graph::{GraphView, NodeId, NodeItem};
use crate::propagator::activation::{activate_dead_exit, activate_nodes};
use crate::propagator::entry::{Entry, IterNum, TaggedNode, TaggedNodeSeq};
use crate::propagator::iteration::IterationState;
use crate::propagator::pending_counts::NodeState;
use crate::propagator::stats::StatsCounters;

/// 64-bit identifier derived from a dynamic frame name, for diagnostics.
///
/// The root frame is always id 0. Other ids are hashes and only comparable
/// within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            return Self::ROOT;
        }
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        FrameId(hasher.finish())
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The parent iteration a child frame was entered from.
pub(crate) struct FrameParent<V> {
    pub(crate) frame: Arc<FrameState<V>>,
    pub(crate) iter: IterNum,
}

pub struct FrameState<V> {
    frame_id: FrameId,
    frame_name: String,
    /// Static frame this instance executes; key into the graph's frame infos.
    info_name: String,
    parent: Option<FrameParent<V>>,
    max_parallel_iterations: usize,
    state: Mutex<FrameInner<V>>,
}

pub(crate) struct FrameInner<V> {
    /// Highest iteration number started so far.
    iteration_count: IterNum,
    /// Ring of live iterations; iteration `i` lives at `i % len`.
    iterations: Vec<Option<IterationState<V>>>,
    /// Enter inputs not yet received.
    num_pending_inputs: usize,
    num_outstanding_iterations: usize,
    /// Loop-invariant Enter values, replayed into every new iteration.
    inv_values: Vec<(NodeId, Entry<V>)>,
    /// NextIteration outputs deferred by the parallel-iterations limit.
    next_iter_roots: Vec<(NodeId, Entry<V>)>,
    /// Exits that fired dead in the newest iteration.
    dead_exits: Vec<NodeId>,
}

impl<V> FrameState<V> {
    /// Build a frame instance with its iteration 0 already in place.
    ///
    /// Panics if `info_name` is not a static frame of `graph` or if
    /// `max_parallel_iterations` is zero.
    pub(crate) fn new(
        graph: &GraphView,
        frame_name: String,
        info_name: &str,
        parent: Option<FrameParent<V>>,
        max_parallel_iterations: usize,
    ) -> Self {
        assert!(
            max_parallel_iterations >= 1,
            "frame '{frame_name}' needs at least one parallel iteration"
        );
        let info = graph
            .frame_info(info_name)
            .unwrap_or_else(|| panic!("no static frame '{info_name}' for frame '{frame_name}'"));

        let mut iterations = Vec::with_capacity(max_parallel_iterations + 1);
        iterations.resize_with(max_parallel_iterations + 1, || None);
        iterations[0] = Some(IterationState::new(0, &info.pending_counts, info.total_inputs));

        Self {
            frame_id: FrameId::from_name(&frame_name),
            frame_name,
            info_name: info_name.to_string(),
            parent,
            max_parallel_iterations,
            state: Mutex::new(FrameInner {
                iteration_count: 0,
                iterations,
                num_pending_inputs: info.input_count,
                num_outstanding_iterations: 1,
                inv_values: Vec::new(),
                next_iter_roots: Vec::new(),
                dead_exits: Vec::new(),
            }),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn frame_name(&self) -> &str {
        &self.frame_name
    }

    /// Static frame name (`""` for the root).
    pub fn static_name(&self) -> &str {
        &self.info_name
    }

    pub fn max_parallel_iterations(&self) -> usize {
        self.max_parallel_iterations
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn parent(&self) -> Option<&FrameParent<V>> {
        self.parent.as_ref()
    }

    pub(crate) fn lock<'a>(
        self: &'a Arc<Self>,
        graph: &'a GraphView,
        stats: &'a StatsCounters,
    ) -> LockedFrame<'a, V> {
        LockedFrame {
            frame: self,
            graph,
            stats,
            inner: self.state.lock(),
        }
    }

    /// Point-in-time view of the frame's counters.
    pub fn snapshot(&self) -> FrameSnapshot {
        let inner = self.state.lock();
        let mut live_iterations: Vec<IterationSnapshot> = inner
            .iterations
            .iter()
            .flatten()
            .map(|it| IterationSnapshot {
                iter_num: it.iter_num(),
                outstanding_ops: it.outstanding_ops(),
                outstanding_frame_count: it.outstanding_frame_count(),
            })
            .collect();
        live_iterations.sort_by_key(|it| it.iter_num);

        FrameSnapshot {
            frame_name: self.frame_name.clone(),
            frame_id: self.frame_id,
            parent: self
                .parent
                .as_ref()
                .map(|p| (p.frame.frame_name.clone(), p.iter)),
            max_parallel_iterations: self.max_parallel_iterations,
            iteration_count: inner.iteration_count,
            num_pending_inputs: inner.num_pending_inputs,
            num_outstanding_iterations: inner.num_outstanding_iterations,
            live_iterations,
            loop_invariants: inner.inv_values.len(),
            deferred_next_iterations: inner.next_iter_roots.len(),
            dead_exits: inner.dead_exits.len(),
        }
    }
}

impl<V> fmt::Debug for FrameState<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameState")
            .field("frame_name", &self.frame_name)
            .field("frame_id", &self.frame_id)
            .field("max_parallel_iterations", &self.max_parallel_iterations)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSnapshot {
    pub iter_num: IterNum,
    pub outstanding_ops: usize,
    pub outstanding_frame_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub frame_name: String,
    pub frame_id: FrameId,
    /// Parent frame name and parent iteration, `None` for the root.
    pub parent: Option<(String, IterNum)>,
    pub max_parallel_iterations: usize,
    pub iteration_count: IterNum,
    pub num_pending_inputs: usize,
    pub num_outstanding_iterations: usize,
    /// Live iterations, oldest first.
    pub live_iterations: Vec<IterationSnapshot>,
    pub loop_invariants: usize,
    pub deferred_next_iterations: usize,
    pub dead_exits: usize,
}

/// A frame with its mutex held.
pub(crate) struct LockedFrame<'a, V> {
    frame: &'a Arc<FrameState<V>>,
    graph: &'a GraphView,
    stats: &'a StatsCounters,
    inner: MutexGuard<'a, FrameInner<V>>,
}

impl<'a, V> LockedFrame<'a, V> {
    fn slot(&self, iter: IterNum) -> usize {
        iter % (self.frame.max_parallel_iterations + 1)
    }

    /// The live iteration `iter`, if any.
    pub(crate) fn iteration(&self, iter: IterNum) -> Option<&IterationState<V>> {
        self.inner.iterations[self.slot(iter)]
            .as_ref()
            .filter(|it| it.iter_num == iter)
    }

    pub(crate) fn iteration_mut(&mut self, iter: IterNum) -> &mut IterationState<V> {
        let slot = self.slot(iter);
        let frame = self.frame;
        match self.inner.iterations[slot].as_mut() {
            Some(it) if it.iter_num == iter => it,
            _ => panic!("frame '{}' has no live iteration {}", frame.frame_name, iter),
        }
    }

    fn live_iteration(&self, iter: IterNum) -> &IterationState<V> {
        self.iteration(iter).unwrap_or_else(|| {
            panic!(
                "frame '{}' has no live iteration {}",
                self.frame.frame_name, iter
            )
        })
    }

    pub(crate) fn iteration_count(&self) -> IterNum {
        self.inner.iteration_count
    }

    pub(crate) fn num_outstanding_iterations(&self) -> usize {
        self.inner.num_outstanding_iterations
    }

    pub(crate) fn decrement_pending_inputs(&mut self) {
        assert!(
            self.inner.num_pending_inputs > 0,
            "frame '{}' received more enter inputs than it has",
            self.frame.frame_name
        );
        self.inner.num_pending_inputs -= 1;
    }

    pub(crate) fn increment_outstanding_frame_count(&mut self, iter: IterNum) {
        self.iteration_mut(iter).outstanding_frame_count += 1;
    }

    pub(crate) fn decrement_outstanding_frame_count(&mut self, iter: IterNum) {
        let name = self.frame.frame_name.clone();
        let it = self.iteration_mut(iter);
        assert!(
            it.outstanding_frame_count > 0,
            "frame '{name}' iteration {iter} has no outstanding child frames"
        );
        it.outstanding_frame_count -= 1;
    }

    /// Remember a dead Exit, but only from the newest iteration: earlier
    /// iterations' exits are superseded by later ones.
    pub(crate) fn record_dead_exit(&mut self, node_id: NodeId, iter: IterNum) {
        if iter == self.inner.iteration_count {
            self.inner.dead_exits.push(node_id);
        }
    }

    pub(crate) fn take_dead_exits(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.inner.dead_exits)
    }

    pub(crate) fn defer_next_iteration(&mut self, node_id: NodeId, entry: Entry<V>) {
        trace!(
            frame = %self.frame.frame_name,
            node = %self.graph.node(node_id).name,
            "deferring next iteration"
        );
        self.inner.next_iter_roots.push((node_id, entry));
    }

    fn set_iteration(&mut self, iter: IterNum, state: Option<IterationState<V>>) {
        let slot = self.slot(iter);
        if state.is_some() {
            assert!(
                self.inner.iterations[slot].is_none(),
                "frame '{}' iteration slot {} is still occupied",
                self.frame.frame_name,
                slot
            );
        }
        self.inner.iterations[slot] = state;
    }

    /// True when iteration `iter` can retire.
    pub(crate) fn is_iteration_done(&self, iter: IterNum) -> bool {
        let it = self.live_iteration(iter);
        if it.outstanding_ops != 0 || it.outstanding_frame_count != 0 {
            return false;
        }
        if iter == 0 {
            self.inner.num_pending_inputs == 0
        } else {
            self.iteration(iter - 1).is_none()
        }
    }

    pub(crate) fn is_frame_done(&self) -> bool {
        self.inner.num_pending_inputs == 0 && self.inner.num_outstanding_iterations == 0
    }

    /// Snapshot of `node`'s readiness in iteration `iter`.
    pub(crate) fn node_state(&self, item: &NodeItem, iter: IterNum) -> NodeState {
        self.live_iteration(iter).node_state(item.pending_id)
    }

    /// Move the input slots of `item` out of iteration `iter`.
    pub(crate) fn take_inputs(&mut self, item: &NodeItem, iter: IterNum) -> Vec<Entry<V>> {
        let it = self.iteration_mut(iter);
        it.input_tensors[item.input_start..item.input_start + item.num_inputs]
            .iter_mut()
            .map(Entry::take)
            .collect()
    }

    pub(crate) fn mark_started(&mut self, item: &NodeItem, iter: IterNum) {
        self.iteration_mut(iter).mark_started(item.pending_id);
    }

    pub(crate) fn mark_completed(&mut self, item: &NodeItem, iter: IterNum) {
        self.iteration_mut(iter).mark_completed(item.pending_id);
    }

    /// Log pending and active nodes of every live iteration.
    pub(crate) fn dump(&self) {
        let info = self.graph.frame_info(&self.frame.info_name);
        let nodes: &[NodeId] = info.map(|i| i.nodes.as_slice()).unwrap_or_default();
        for it in self.inner.iterations.iter().flatten() {
            warn!(
                frame = %self.frame.frame_name,
                iter = it.iter_num,
                outstanding_ops = it.outstanding_ops,
                outstanding_frames = it.outstanding_frame_count,
                "  iteration"
            );
            for &id in nodes {
                let item = self.graph.node(id);
                match it.node_state(item.pending_id) {
                    NodeState::PendingNotReady | NodeState::PendingReady => warn!(
                        node = %item.name,
                        pending = it.pending(item.pending_id),
                        dead = it.dead_count(item.pending_id),
                        "    pending node"
                    ),
                    NodeState::Started => warn!(node = %item.name, "    active node"),
                    NodeState::Completed => {}
                }
            }
            warn!(live_inputs = it.live_inputs(), "    input slots in use");
        }
    }
}

impl<'a, V: Clone> LockedFrame<'a, V> {
    /// Deliver `outputs` of `item` to its consumers in iteration `iter`.
    pub(crate) fn activate_nodes(
        &mut self,
        item: &NodeItem,
        is_dead: bool,
        iter: IterNum,
        outputs: &mut [Entry<V>],
        ready: &mut TaggedNodeSeq<V>,
    ) {
        let graph = self.graph;
        let frame = self.frame;
        let it = self.iteration_mut(iter);
        activate_nodes(graph, item, is_dead, it, outputs, |dst, dead| {
            ready.push(TaggedNode::new(dst, Arc::clone(frame), iter, dead));
        });
    }

    /// Dead exits of a finished child frame arriving in iteration `iter`.
    pub(crate) fn activate_dead_exits(
        &mut self,
        dead_exits: &[NodeId],
        iter: IterNum,
        ready: &mut TaggedNodeSeq<V>,
    ) {
        let graph = self.graph;
        let frame = self.frame;
        let it = self.iteration_mut(iter);
        for &exit in dead_exits {
            activate_dead_exit(graph, graph.node(exit), it, |dst, dead| {
                ready.push(TaggedNode::new(dst, Arc::clone(frame), iter, dead));
            });
        }
    }

    /// Register a loop-invariant value and deliver it to every iteration
    /// started so far.
    pub(crate) fn add_loop_inv(&mut self, item: &NodeItem, entry: Entry<V>, ready: &mut TaggedNodeSeq<V>) {
        self.inner.inv_values.push((item.node_id, entry.clone()));
        let is_dead = entry.is_dead();
        for iter in 0..=self.inner.iteration_count {
            let mut outputs = vec![entry.clone()];
            self.activate_nodes(item, is_dead, iter, &mut outputs, ready);
        }
    }

    fn activate_loop_invs(&mut self, iter: IterNum, ready: &mut TaggedNodeSeq<V>) {
        let graph = self.graph;
        for k in 0..self.inner.inv_values.len() {
            let (node_id, entry) = self.inner.inv_values[k].clone();
            let is_dead = entry.is_dead();
            let mut outputs = vec![entry];
            self.activate_nodes(graph.node(node_id), is_dead, iter, &mut outputs, ready);
        }
    }

    fn activate_nexts(&mut self, iter: IterNum, ready: &mut TaggedNodeSeq<V>) {
        let graph = self.graph;
        let roots = std::mem::take(&mut self.inner.next_iter_roots);
        for (node_id, entry) in roots {
            let is_dead = entry.is_dead();
            let mut outputs = vec![entry];
            self.activate_nodes(graph.node(node_id), is_dead, iter, &mut outputs, ready);
        }
    }

    /// Start the next iteration, replaying deferred NextIteration values
    /// and loop invariants into it.
    pub(crate) fn increment_iteration(&mut self, ready: &mut TaggedNodeSeq<V>) -> IterNum {
        self.inner.iteration_count += 1;
        let next = self.inner.iteration_count;

        let info = self
            .graph
            .frame_info(&self.frame.info_name)
            .unwrap_or_else(|| panic!("no static frame '{}'", self.frame.info_name));
        let state = IterationState::new(next, &info.pending_counts, info.total_inputs);
        self.set_iteration(next, Some(state));
        self.inner.num_outstanding_iterations += 1;
        self.inner.dead_exits.clear();
        self.stats.iteration_started();
        trace!(frame = %self.frame.frame_name, iter = next, "started iteration");

        self.activate_nexts(next, ready);
        self.activate_loop_invs(next, ready);
        next
    }

    /// Retire finished iterations starting at `iter`, oldest first. Returns
    /// true when the frame as a whole is done.
    pub(crate) fn cleanup_iterations(&mut self, iter: IterNum, ready: &mut TaggedNodeSeq<V>) -> bool {
        let mut curr = iter;
        while curr <= self.inner.iteration_count && self.is_iteration_done(curr) {
            self.set_iteration(curr, None);
            self.inner.num_outstanding_iterations -= 1;
            self.stats.iteration_retired();
            trace!(frame = %self.frame.frame_name, iter = curr, "retired iteration");
            curr += 1;

            if !self.inner.next_iter_roots.is_empty() {
                self.increment_iteration(ready);
            }
        }
        self.is_frame_done()
    }

    /// One node of iteration `iter` completed.
    pub(crate) fn decrement_outstanding_ops(&mut self, iter: IterNum, ready: &mut TaggedNodeSeq<V>) -> bool {
        let name = self.frame.frame_name.clone();
        let it = self.iteration_mut(iter);
        assert!(
            it.outstanding_ops > 0,
            "frame '{name}' iteration {iter} has no outstanding ops"
        );
        it.outstanding_ops -= 1;
        if it.outstanding_ops != 0 {
            return false;
        }
        self.cleanup_iterations(iter, ready)
    }
}
