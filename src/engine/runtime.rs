// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::Scheduler;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::ledger::MarkerLedger;

use super::{EngineEvent, RunReport, TaskOutcome};

/// Drives the scheduler in response to `EngineEvent`s and delegates actual
/// command execution to an [`ExecutorBackend`].
///
/// This is a pure IO shell: all scheduling semantics live in the synchronous
/// [`Scheduler`]. The loop here only reads events from the channel, feeds
/// them in, and forwards the resulting dispatches to the executor.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    ledger: MarkerLedger,
    event_rx: mpsc::Receiver<EngineEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: Scheduler,
        ledger: MarkerLedger,
        event_rx: mpsc::Receiver<EngineEvent>,
        executor: E,
    ) -> Self {
        Self {
            scheduler,
            ledger,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// Dispatches the initial wave of ready tasks, then consumes events
    /// until the scheduler settles: every included task terminal and no
    /// action in flight.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("pipedag runtime started");

        self.dispatch().await?;

        while !self.scheduler.is_settled() {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    error!("event channel closed with tasks still in flight");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                EngineEvent::TaskCompleted { node, outcome } => {
                    self.on_completed(node, outcome).await?;
                }
                EngineEvent::HaltRequested => {
                    info!("halt requested; letting in-flight tasks finish");
                    self.scheduler.halt();
                }
            }
        }

        info!("runtime settled");
        Ok(self.scheduler.report())
    }

    /// Apply a completion, recording success in the ledger strictly before
    /// any dependent can be dispatched.
    async fn on_completed(&mut self, node: usize, outcome: TaskOutcome) -> Result<()> {
        let outcome = match outcome {
            TaskOutcome::Success => {
                let task = self.scheduler.graph().task(node);
                match self.ledger.record(task) {
                    Ok(()) => TaskOutcome::Success,
                    Err(err) => {
                        error!(task = %task.id, error = %err, "recording completion failed");
                        TaskOutcome::Failed(-1)
                    }
                }
            }
            failed => failed,
        };

        self.scheduler.on_completion(node, outcome);
        self.dispatch().await
    }

    async fn dispatch(&mut self) -> Result<()> {
        let actions = self.scheduler.dispatch(&self.ledger);
        if actions.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = actions.iter().map(|a| a.id.as_str()).collect();
        debug!(?ids, "spawning ready tasks");

        self.executor.spawn_ready_tasks(actions).await
    }
}
