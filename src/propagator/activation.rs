// src/propagator/activation.rs

//! Successor activation: the readiness and deadness rules applied when a
//! node's outputs arrive at its consumers within one iteration.
//!
//! Two algorithms are provided. [`activate_nodes_plain`] only looks at the
//! pending counts and is valid when no consumer is a merge or control
//! trigger; [`activate_nodes_merge_aware`] inspects every destination.
//! Both agree wherever the plain path is valid. [`activate_nodes`] picks one
//! from the precomputed `is_any_consumer_merge_or_control_trigger` flag.
//!
//! Every ready destination increments the iteration's `outstanding_ops` and
//! is reported through `on_ready(dst_id, is_dead)` in edge order.

use crate::graph::{GraphView, NodeId, NodeItem};
use crate::propagator::entry::Entry;
use crate::propagator::iteration::IterationState;

pub fn activate_nodes<V, F>(
    graph: &GraphView,
    item: &NodeItem,
    is_dead: bool,
    iter_state: &mut IterationState<V>,
    outputs: &mut [Entry<V>],
    on_ready: F,
) where
    V: Clone,
    F: FnMut(NodeId, bool),
{
    if item.is_any_consumer_merge_or_control_trigger {
        activate_nodes_merge_aware(graph, item, is_dead, iter_state, outputs, on_ready);
    } else {
        activate_nodes_plain(graph, item, is_dead, iter_state, outputs, on_ready);
    }
}

pub fn activate_nodes_plain<V, F>(
    graph: &GraphView,
    item: &NodeItem,
    is_dead: bool,
    iter_state: &mut IterationState<V>,
    outputs: &mut [Entry<V>],
    mut on_ready: F,
) where
    V: Clone,
    F: FnMut(NodeId, bool),
{
    for e in item.output_edges.iter() {
        let dst_pending_id = graph.node(e.dst_id).pending_id;
        let src = &mut outputs[e.output_slot];
        let value_dead = src.is_dead();

        let adjust = iter_state.adjust_for_activation(dst_pending_id, is_dead || value_dead);
        if !value_dead {
            iter_state.input_tensors[e.input_slot] = move_or_clone(src, e.is_last);
        }
        if !adjust.any_pending {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, adjust.any_dead);
        }
    }

    for e in item.output_control_edges.iter() {
        let dst_pending_id = graph.node(e.dst_id).pending_id;
        let adjust = iter_state.adjust_for_activation(dst_pending_id, is_dead);
        if !adjust.any_pending {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, adjust.any_dead);
        }
    }
}

pub fn activate_nodes_merge_aware<V, F>(
    graph: &GraphView,
    item: &NodeItem,
    is_dead: bool,
    iter_state: &mut IterationState<V>,
    outputs: &mut [Entry<V>],
    mut on_ready: F,
) where
    V: Clone,
    F: FnMut(NodeId, bool),
{
    for e in item.output_edges.iter() {
        let dst = graph.node(e.dst_id);
        let h = dst.pending_id;
        let value_dead = outputs[e.output_slot].is_dead();

        let dst_dead;
        let dst_ready;
        let need_input;

        if dst.is_merge {
            if !value_dead {
                // The low bit of pending is set until the first live input is
                // used; count == 1 means no control input is outstanding
                // either.
                let count = iter_state.pending(h);
                iter_state.mark_live(h);
                dst_dead = false;
                dst_ready = count == 1;
                need_input = count & 1 == 1;
            } else {
                // A dead Enter kills the merge outright: the whole loop sits
                // on an untaken branch.
                iter_state.increment_dead_count(h);
                let dead_cnt = iter_state.dead_count(h) as usize;
                dst_dead = dead_cnt == dst.num_inputs || item.is_enter;
                dst_ready = iter_state.pending(h) == 1 && dst_dead;
                need_input = false;
            }
        } else {
            let adjust = iter_state.adjust_for_activation(h, is_dead || value_dead);
            dst_dead = adjust.any_dead;
            dst_ready = !adjust.any_pending;
            need_input = !value_dead;
        }

        if need_input {
            iter_state.input_tensors[e.input_slot] =
                move_or_clone(&mut outputs[e.output_slot], e.is_last);
        }
        if dst_ready {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, dst_dead && !dst.is_control_trigger);
        }
    }

    for e in item.output_control_edges.iter() {
        let dst = graph.node(e.dst_id);
        let h = dst.pending_id;

        let (dst_ready, dst_dead) = if dst.is_merge {
            let count = iter_state.decrement_pending(h, 2);
            let dead = iter_state.dead_count(h) as usize == dst.num_inputs;
            (count == 0 || (count == 1 && dead), dead)
        } else {
            let adjust = iter_state.adjust_for_activation(h, is_dead);
            (!adjust.any_pending, adjust.any_dead)
        };

        if dst_ready {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, dst_dead && !dst.is_control_trigger);
        }
    }
}

/// Deliver a dead value from `item` (an Exit recorded as dead in a finished
/// child frame) to its consumers in the parent iteration.
pub(crate) fn activate_dead_exit<V, F>(
    graph: &GraphView,
    item: &NodeItem,
    iter_state: &mut IterationState<V>,
    mut on_ready: F,
) where
    F: FnMut(NodeId, bool),
{
    for e in item.output_edges.iter() {
        let dst = graph.node(e.dst_id);
        let h = dst.pending_id;

        let (dst_ready, dst_dead) = if dst.is_merge {
            iter_state.increment_dead_count(h);
            let dead = iter_state.dead_count(h) as usize == dst.num_inputs;
            (iter_state.pending(h) == 1 && dead, dead)
        } else {
            iter_state.increment_dead_count(h);
            (iter_state.decrement_pending(h, 1) == 0, true)
        };

        if dst_ready {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, dst_dead && !dst.is_control_trigger);
        }
    }

    for e in item.output_control_edges.iter() {
        let dst = graph.node(e.dst_id);
        let h = dst.pending_id;

        let (dst_ready, dst_dead) = if dst.is_merge {
            let count = iter_state.decrement_pending(h, 2);
            let dead = iter_state.dead_count(h) as usize == dst.num_inputs;
            (count == 0 || (count == 1 && dead), dead)
        } else {
            iter_state.increment_dead_count(h);
            (iter_state.decrement_pending(h, 1) == 0, true)
        };

        if dst_ready {
            iter_state.outstanding_ops += 1;
            on_ready(e.dst_id, dst_dead && !dst.is_control_trigger);
        }
    }
}

fn move_or_clone<V: Clone>(src: &mut Entry<V>, is_last: bool) -> Entry<V> {
    if is_last { src.take() } else { src.clone() }
}
