// src/propagator/pending_counts.rs

//! Per-node readiness counters.
//!
//! Every node in a frame owns one record in the frame's template
//! [`PendingCounts`]; each iteration works on its own clone. A record holds
//! the number of inputs still outstanding (`pending`), the number of dead
//! inputs that arrived (`dead_count`) and how far the executor got with it.
//!
//! Merge nodes reuse the low bit of `pending` as "no live input has arrived
//! yet": they start at `(control_inputs << 1) | 1`, each control input
//! subtracts 2 and the first live data input clears the bit.

/// Index of a node's record inside a frame's [`PendingCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    pub fn new(index: usize) -> Self {
        Handle(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle of a node within one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Still waiting for at least one input.
    PendingNotReady,
    /// All inputs arrived; not yet started.
    PendingReady,
    /// Handed to the executor.
    Started,
    /// Finished executing.
    Completed,
}

/// Outcome of [`PendingCounts::adjust_for_activation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustResult {
    /// At least one dead input has arrived.
    pub any_dead: bool,
    /// At least one input is still outstanding.
    pub any_pending: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    pending: u32,
    dead_count: u32,
    has_started: bool,
    has_completed: bool,
}

impl Counts {
    fn state(&self) -> NodeState {
        if self.has_completed {
            NodeState::Completed
        } else if self.has_started {
            NodeState::Started
        } else if self.pending == 0 {
            NodeState::PendingReady
        } else {
            NodeState::PendingNotReady
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PendingCounts {
    counts: Vec<Counts>,
}

impl PendingCounts {
    /// Create `len` zeroed records.
    pub fn new(len: usize) -> Self {
        Self {
            counts: vec![Counts::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Seed the initial pending count of a record (template construction).
    pub fn set_initial_count(&mut self, h: Handle, pending: u32) {
        self.counts[h.0] = Counts {
            pending,
            dead_count: 0,
            has_started: false,
            has_completed: false,
        };
    }

    pub fn node_state(&self, h: Handle) -> NodeState {
        self.counts[h.0].state()
    }

    pub fn pending(&self, h: Handle) -> u32 {
        self.counts[h.0].pending
    }

    pub fn dead_count(&self, h: Handle) -> u32 {
        self.counts[h.0].dead_count
    }

    /// Subtract `by` from the pending count and return what remains.
    pub fn decrement_pending(&mut self, h: Handle, by: u32) -> u32 {
        let c = &mut self.counts[h.0];
        assert!(
            c.pending >= by,
            "pending count underflow for handle {}: {} - {}",
            h.0,
            c.pending,
            by
        );
        c.pending -= by;
        c.pending
    }

    /// Clear the "no live input yet" bit of a merge node.
    ///
    /// Has no effect once the node is ready or started.
    pub fn mark_live(&mut self, h: Handle) {
        let c = &mut self.counts[h.0];
        if c.state() == NodeState::PendingNotReady {
            c.pending &= !1;
        }
    }

    /// Record a dead input. Only counted while the node is still waiting.
    pub fn increment_dead_count(&mut self, h: Handle) {
        let c = &mut self.counts[h.0];
        if c.state() == NodeState::PendingNotReady {
            c.dead_count += 1;
        }
    }

    /// Account for one arriving input (dead if `increment_dead`).
    pub fn adjust_for_activation(&mut self, h: Handle, increment_dead: bool) -> AdjustResult {
        let c = &mut self.counts[h.0];
        assert!(
            c.pending >= 1,
            "activation of handle {} with no pending inputs",
            h.0
        );
        if increment_dead {
            c.dead_count += 1;
        }
        c.pending -= 1;
        AdjustResult {
            any_dead: c.dead_count > 0,
            any_pending: c.pending > 0,
        }
    }

    /// Record that the executor picked the node up.
    ///
    /// A merge made ready by dead inputs is started with its pending count
    /// still at 1, so only a second start is rejected.
    pub fn mark_started(&mut self, h: Handle) {
        let c = &mut self.counts[h.0];
        assert!(!c.has_started, "handle {} started twice", h.0);
        c.has_started = true;
    }

    /// Record that the node finished. Pending and dead counts are left
    /// alone, so late inputs to a merge still see it as already fired.
    pub fn mark_completed(&mut self, h: Handle) {
        let c = &mut self.counts[h.0];
        assert_eq!(
            c.state(),
            NodeState::Started,
            "handle {} completed without being started",
            h.0
        );
        c.has_completed = true;
    }
}
