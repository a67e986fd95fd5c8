// src/propagator/mod.rs

//! Dynamic execution state of a dataflow graph with control flow.
//!
//! The propagator decides, each time a node completes, which downstream
//! nodes become ready and in which frame and iteration they run. It knows
//! nothing about how nodes compute; an executor drives it:
//!
//! 1. [`PropagatorState::activate_roots`] seeds the ready set.
//! 2. The executor runs each [`TaggedNode`], taking its inputs with
//!    [`PropagatorState::take_inputs`].
//! 3. [`PropagatorState::propagate_outputs`] delivers the outputs and
//!    returns the newly ready nodes.
//!
//! Invariant violations (unknown iterations, counter underflows, malformed
//! control-flow nodes) are programming errors and panic.

pub mod activation;
pub mod entry;
pub mod frame;
pub mod iteration;
pub mod pending_counts;
pub mod state;
pub mod stats;

pub use entry::{Entry, IterNum, TaggedNode, TaggedNodeSeq};
pub use frame::{FrameId, FrameSnapshot, FrameState, IterationSnapshot};
pub use iteration::IterationState;
pub use pending_counts::{AdjustResult, Handle, NodeState, PendingCounts};
pub use state::PropagatorState;
pub use stats::PropagatorStats;
