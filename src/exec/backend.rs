// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime hands ready nodes to an `ExecutorBackend` instead of running
//! them itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `KernelExecutorBackend` is the default implementation used by `loopflow`.
//!   Every ready node runs on its own Tokio task, so `propagate_outputs` is
//!   called from many workers concurrently.
//! - Tests can provide their own `ExecutorBackend` that, for example, runs
//!   nodes inline in a fixed order and records what was dispatched.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::node_runner::run_node;
use crate::propagator::{PropagatorState, TaggedNodeSeq};
use crate::types::Value;

/// Trait abstracting how ready nodes are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given nodes for execution.
    ///
    /// Every dispatched node must eventually be reported back with a
    /// `NodeCompleted` or `NodeFailed` event.
    fn spawn_ready_nodes(
        &mut self,
        nodes: TaggedNodeSeq<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor backend that runs the bundled integer kernels on Tokio tasks.
pub struct KernelExecutorBackend {
    propagator: Arc<PropagatorState<Value>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl KernelExecutorBackend {
    pub fn new(propagator: Arc<PropagatorState<Value>>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            propagator,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for KernelExecutorBackend {
    fn spawn_ready_nodes(
        &mut self,
        nodes: TaggedNodeSeq<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone handles so the spawned tasks don't borrow `self`.
        let propagator = Arc::clone(&self.propagator);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for tagged in nodes {
                let propagator = Arc::clone(&propagator);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let event = run_node(&propagator, tagged);
                    if tx.send(event).await.is_err() {
                        warn!("runtime event channel closed; dropping node result");
                    }
                });
            }
            Ok(())
        })
    }
}
