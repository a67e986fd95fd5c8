// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::propagator::TaggedNodeSeq;
use crate::types::Value;

use super::core::CoreRuntime;
use super::{CoreCommand, RunReport, RuntimeEvent};

/// Drives a run in response to `RuntimeEvent`s, and delegates node execution
/// to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches `roots`.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes commands returned by the core until it asks to stop.
    pub async fn run(mut self, roots: TaggedNodeSeq<Value>) -> Result<RunReport> {
        info!("loopflow runtime started");

        let mut step = self.core.start(roots);
        loop {
            for command in step.commands {
                self.execute_command(command).await?;
            }
            if !step.keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };
            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        info!(
            executed = self.core.report().nodes_executed,
            inflight = self.core.inflight(),
            "runtime exiting"
        );
        Ok(self.core.into_report())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchNodes(nodes) => {
                debug!(count = nodes.len(), "dispatching ready nodes");
                self.executor.spawn_ready_nodes(nodes).await?;
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}
