// src/propagator/stats.rs

use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters of one [`crate::propagator::PropagatorState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagatorStats {
    pub frames_created: u64,
    pub frames_deleted: u64,
    /// Frames built by a losing thread in a creation race and thrown away.
    pub frames_discarded: u64,
    pub iterations_started: u64,
    pub iterations_retired: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    frames_created: AtomicU64,
    frames_deleted: AtomicU64,
    frames_discarded: AtomicU64,
    iterations_started: AtomicU64,
    iterations_retired: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn frame_created(&self) {
        self.frames_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_deleted(&self) {
        self.frames_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_discarded(&self) {
        self.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn iteration_started(&self) {
        self.iterations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn iteration_retired(&self) {
        self.iterations_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PropagatorStats {
        PropagatorStats {
            frames_created: self.frames_created.load(Ordering::Relaxed),
            frames_deleted: self.frames_deleted.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            iterations_started: self.iterations_started.load(Ordering::Relaxed),
            iterations_retired: self.iterations_retired.load(Ordering::Relaxed),
        }
    }
}
