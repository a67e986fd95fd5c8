// src/propagator/state.rs

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::graph::{GraphView, NodeId, NodeItem};
use crate::propagator::entry::{Entry, IterNum, TaggedNode, TaggedNodeSeq};
use crate::propagator::frame::{FrameParent, FrameSnapshot, FrameState};
use crate::propagator::pending_counts::NodeState;
use crate::propagator::stats::{PropagatorStats, StatsCounters};

/// Execution state of one run of a graph.
///
/// Owns the root frame and the table of live frames. All methods take
/// `&self` and may be called from many worker threads at once; frames are
/// protected by their own locks and the table by a global one that is only
/// taken when frames are created or removed.
///
/// Lock order is global table first, then parent frame, then child frame.
pub struct PropagatorState<V> {
    graph: Arc<GraphView>,
    root_frame: Arc<FrameState<V>>,
    outstanding_frames: Mutex<HashMap<String, Arc<FrameState<V>>>>,
    stats: StatsCounters,
}

impl<V> PropagatorState<V> {
    pub fn new(graph: Arc<GraphView>) -> Self {
        let root_frame = Arc::new(FrameState::new(&graph, String::new(), "", None, 1));
        let mut outstanding_frames = HashMap::new();
        outstanding_frames.insert(String::new(), Arc::clone(&root_frame));

        let stats = StatsCounters::default();
        stats.frame_created();
        stats.iteration_started();

        Self {
            graph,
            root_frame,
            outstanding_frames: Mutex::new(outstanding_frames),
            stats,
        }
    }

    pub fn graph(&self) -> &Arc<GraphView> {
        &self.graph
    }

    pub fn root_frame(&self) -> &Arc<FrameState<V>> {
        &self.root_frame
    }

    /// Seed iteration 0 of the root frame with `roots`.
    ///
    /// Every root must have no data or control inputs.
    pub fn activate_roots(&self, roots: &[NodeId], ready: &mut TaggedNodeSeq<V>) {
        let mut root = self.root_frame.lock(&self.graph, &self.stats);
        for &id in roots {
            let item = self.graph.node(id);
            assert_eq!(
                item.num_operands(),
                0,
                "root node '{}' has inputs",
                item.name
            );
            ready.push(TaggedNode::new(id, Arc::clone(&self.root_frame), 0, false));
        }
        root.iteration_mut(0).outstanding_ops += roots.len();
    }

    /// Move the inputs of a ready node out of its iteration.
    pub fn take_inputs(&self, tagged: &TaggedNode<V>) -> Vec<Entry<V>> {
        let item = self.graph.node(tagged.node_id);
        tagged
            .frame
            .lock(&self.graph, &self.stats)
            .take_inputs(item, tagged.iter)
    }

    pub fn mark_started(&self, tagged: &TaggedNode<V>) {
        let item = self.graph.node(tagged.node_id);
        tagged
            .frame
            .lock(&self.graph, &self.stats)
            .mark_started(item, tagged.iter);
    }

    pub fn mark_completed(&self, tagged: &TaggedNode<V>) {
        let item = self.graph.node(tagged.node_id);
        tagged
            .frame
            .lock(&self.graph, &self.stats)
            .mark_completed(item, tagged.iter);
    }

    /// Readiness state of a tagged node in its iteration.
    pub fn node_state(&self, tagged: &TaggedNode<V>) -> NodeState {
        let item = self.graph.node(tagged.node_id);
        tagged
            .frame
            .lock(&self.graph, &self.stats)
            .node_state(item, tagged.iter)
    }

    /// True once the root frame has been torn down.
    pub fn is_finished(&self) -> bool {
        self.outstanding_frames.lock().is_empty()
    }

    /// Names of all live frames, sorted.
    pub fn frame_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.outstanding_frames.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn frame_snapshot(&self, name: &str) -> Option<FrameSnapshot> {
        let frame = self.outstanding_frames.lock().get(name).cloned()?;
        Some(frame.snapshot())
    }

    pub fn stats(&self) -> PropagatorStats {
        self.stats.snapshot()
    }

    /// Log every live frame with its pending and running nodes.
    pub fn dump_state(&self) {
        let frames = self.outstanding_frames.lock();
        warn!(frames = frames.len(), "dumping propagator state");
        let mut names: Vec<&String> = frames.keys().collect();
        names.sort();
        for name in names {
            warn!(frame = %name, "frame");
            frames[name].lock(&self.graph, &self.stats).dump();
        }
    }

    fn decrement_outstanding_ops(
        &self,
        frame: &Arc<FrameState<V>>,
        iter: IterNum,
        ready: &mut TaggedNodeSeq<V>,
    ) -> bool
    where
        V: Clone,
    {
        frame
            .lock(&self.graph, &self.stats)
            .decrement_outstanding_ops(iter, ready)
    }
}

impl<V: Clone> PropagatorState<V> {
    /// Deliver the outputs of a completed node and collect the nodes that
    /// became ready as a result.
    ///
    /// `outputs` must hold one entry per output slot of the node; a dead
    /// tagged node reports all of them as `NoValue`.
    pub fn propagate_outputs(
        &self,
        tagged: &TaggedNode<V>,
        mut outputs: Vec<Entry<V>>,
        ready: &mut TaggedNodeSeq<V>,
    ) {
        let graph = &*self.graph;
        let item = graph.node(tagged.node_id);
        let input_frame = &tagged.frame;
        let input_iter = tagged.iter;
        let is_dead = tagged.is_dead;

        let is_frame_done = if !item.is_enter_exit_or_next_iter {
            let mut frame = input_frame.lock(graph, &self.stats);
            frame.activate_nodes(item, is_dead, input_iter, &mut outputs, ready);
            frame.decrement_outstanding_ops(input_iter, ready)
        } else if item.is_enter {
            let child = self.find_or_create_child_frame(input_frame, input_iter, item);
            {
                let mut child = child.lock(graph, &self.stats);
                if item.is_constant_enter {
                    let entry = outputs.into_iter().next().unwrap_or_default();
                    child.add_loop_inv(item, entry, ready);
                } else {
                    child.activate_nodes(item, is_dead, 0, &mut outputs, ready);
                }
                child.decrement_pending_inputs();
            }
            self.decrement_outstanding_ops(input_frame, input_iter, ready)
        } else if item.is_exit {
            if is_dead {
                let mut frame = input_frame.lock(graph, &self.stats);
                frame.record_dead_exit(item.node_id, input_iter);
                frame.decrement_outstanding_ops(input_iter, ready)
            } else {
                let parent = input_frame
                    .parent()
                    .unwrap_or_else(|| panic!("exit node '{}' ran in the root frame", item.name));
                {
                    let mut outer = parent.frame.lock(graph, &self.stats);
                    outer.activate_nodes(item, false, parent.iter, &mut outputs, ready);
                }
                self.decrement_outstanding_ops(input_frame, input_iter, ready)
            }
        } else {
            assert!(
                item.is_next_iteration,
                "node '{}' is not a transfer node",
                item.name
            );
            let mut frame = input_frame.lock(graph, &self.stats);
            // A dead NextIteration stops here: deadness never crosses into
            // the next iteration.
            if !is_dead {
                let is_newest = input_iter == frame.iteration_count();
                if is_newest
                    && frame.num_outstanding_iterations() == input_frame.max_parallel_iterations()
                {
                    let entry = outputs.into_iter().next().unwrap_or_default();
                    frame.defer_next_iteration(item.node_id, entry);
                } else {
                    let output_iter = if is_newest {
                        frame.increment_iteration(ready)
                    } else {
                        input_iter + 1
                    };
                    frame.activate_nodes(item, false, output_iter, &mut outputs, ready);
                }
            }
            frame.decrement_outstanding_ops(input_iter, ready)
        };

        if is_frame_done {
            if let Some((parent, parent_iter)) = self.delete_frame(input_frame, ready) {
                self.cleanup_frames_iterations(&parent, parent_iter, ready);
            }
        }
    }

    /// Find the child frame entered by `item` from iteration `iter` of
    /// `frame`, creating it if this is the first Enter to arrive.
    ///
    /// The frame is built outside the global lock; if another thread
    /// registered the same name in the meantime, the local instance is
    /// discarded and the registered one returned.
    pub(crate) fn find_or_create_child_frame(
        &self,
        frame: &Arc<FrameState<V>>,
        iter: IterNum,
        item: &NodeItem,
    ) -> Arc<FrameState<V>> {
        let enter_name = item
            .frame_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| panic!("enter node '{}' has no frame_name", item.name));
        let child_name = format!("{};{};{}", frame.frame_name(), iter, enter_name);

        if let Some(existing) = self.outstanding_frames.lock().get(&child_name) {
            return Arc::clone(existing);
        }

        let parallel_iterations = item
            .parallel_iterations
            .unwrap_or_else(|| panic!("enter node '{}' has no parallel_iterations", item.name));
        let parent = FrameParent {
            frame: Arc::clone(frame),
            iter,
        };
        let candidate = Arc::new(FrameState::new(
            &self.graph,
            child_name.clone(),
            enter_name,
            Some(parent),
            parallel_iterations,
        ));

        let mut frames = self.outstanding_frames.lock();
        if let Some(existing) = frames.get(&child_name) {
            self.stats.frame_discarded();
            return Arc::clone(existing);
        }
        frame
            .lock(&self.graph, &self.stats)
            .increment_outstanding_frame_count(iter);
        frames.insert(child_name, Arc::clone(&candidate));
        self.stats.frame_created();
        self.stats.iteration_started();

        debug!(
            frame = %candidate.frame_name(),
            parent = %frame.frame_name(),
            parent_iter = iter,
            parallel_iterations,
            "created frame"
        );
        candidate
    }

    /// Tear down a finished frame: forward its dead exits into the parent
    /// iteration and remove it from the table.
    ///
    /// Returns the parent frame and iteration, if any.
    pub(crate) fn delete_frame(
        &self,
        frame: &Arc<FrameState<V>>,
        ready: &mut TaggedNodeSeq<V>,
    ) -> Option<(Arc<FrameState<V>>, IterNum)> {
        let parent = frame.parent().map(|p| (Arc::clone(&p.frame), p.iter));

        if let Some((parent_frame, parent_iter)) = parent.as_ref() {
            let mut outer = parent_frame.lock(&self.graph, &self.stats);
            let mut inner = frame.lock(&self.graph, &self.stats);
            let dead_exits = inner.take_dead_exits();
            outer.activate_dead_exits(&dead_exits, *parent_iter, ready);
        }

        let removed = self.outstanding_frames.lock().remove(frame.frame_name());
        assert!(
            removed.is_some(),
            "frame '{}' removed more than once",
            frame.frame_name()
        );
        self.stats.frame_deleted();
        debug!(frame = %frame.frame_name(), "deleted frame");

        parent
    }

    /// A child frame of iteration `iter` of `frame` went away. Retire what
    /// can be retired, cascading up the parent chain while frames finish.
    pub(crate) fn cleanup_frames_iterations(
        &self,
        frame: &Arc<FrameState<V>>,
        iter: IterNum,
        ready: &mut TaggedNodeSeq<V>,
    ) {
        let mut next = Some((Arc::clone(frame), iter));
        while let Some((frame, iter)) = next.take() {
            let is_frame_done = {
                let mut locked = frame.lock(&self.graph, &self.stats);
                locked.decrement_outstanding_frame_count(iter);
                locked.cleanup_iterations(iter, ready)
            };
            if is_frame_done {
                next = self.delete_frame(&frame, ready);
            }
        }
    }
}

impl<V> std::fmt::Debug for PropagatorState<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagatorState")
            .field("frames", &self.frame_names())
            .field("stats", &self.stats())
            .finish()
    }
}
