use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use loopflow::engine::RuntimeEvent;
use loopflow::errors::Result;
use loopflow::exec::{ExecutorBackend, run_node};
use loopflow::propagator::{PropagatorState, TaggedNodeSeq};
use loopflow::types::Value;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which nodes were dispatched (name, dead flag)
/// - runs them inline, in dispatch order, and reports each result
///   immediately.
///
/// Results are sent while the runtime is awaiting the dispatch, so give the
/// runtime channel room for the whole ready frontier (1024 is plenty for the
/// canned graphs).
pub struct RecordingExecutor {
    propagator: Arc<PropagatorState<Value>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingExecutor {
    pub fn new(
        propagator: Arc<PropagatorState<Value>>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<(String, bool)>>>,
    ) -> Self {
        Self {
            propagator,
            runtime_tx,
            dispatched,
        }
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn spawn_ready_nodes(
        &mut self,
        nodes: TaggedNodeSeq<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let propagator = Arc::clone(&self.propagator);
        let dispatched = Arc::clone(&self.dispatched);

        Box::pin(async move {
            for tagged in nodes {
                let name = propagator.graph().node(tagged.node_id).name.clone();
                dispatched.lock().push((name, tagged.is_dead));

                let event = run_node(&propagator, tagged);
                tx.send(event).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
