// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production shell executor in [`runner`](super::runner).

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::info;

use crate::dag::ScheduledAction;
use crate::engine::EngineEvent;
use crate::errors::Result;
use crate::scratch::ScratchManager;

use super::runner::run_action;

/// Trait abstracting how scheduled actions are executed.
///
/// Production code uses [`ShellExecutorBackend`]; tests can provide their
/// own implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given actions for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `EngineEvent`s (tests)
    fn spawn_ready_tasks(
        &mut self,
        actions: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Shell executor backend used in production.
///
/// Wraps a background executor loop: the runtime calls `spawn_ready_tasks`,
/// which forwards the actions over an mpsc channel; the loop runs each
/// action in its own Tokio task so actions execute concurrently up to
/// whatever the scheduler dispatched.
pub struct ShellExecutorBackend {
    tx: mpsc::Sender<ScheduledAction>,
}

impl ShellExecutorBackend {
    /// Create a new shell executor backend, wiring it to the given runtime
    /// event sender. Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<EngineEvent>, scratch: ScratchManager) -> Self {
        let tx = spawn_executor(runtime_tx, scratch);
        Self { tx }
    }
}

impl ExecutorBackend for ShellExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        actions: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for action in actions {
                tx.send(action)
                    .await
                    .map_err(|e| anyhow!("executor channel closed: {e}"))?;
            }
            Ok(())
        })
    }
}

/// Spawn the background executor loop.
///
/// Each received action runs in its own Tokio task. Concurrency control is
/// entirely the scheduler's job: by the time an action arrives here it has
/// already been admitted under the jobs and thread budgets.
fn spawn_executor(
    runtime_tx: mpsc::Sender<EngineEvent>,
    scratch: ScratchManager,
) -> mpsc::Sender<ScheduledAction> {
    let (tx, mut rx) = mpsc::channel::<ScheduledAction>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(action) = rx.recv().await {
            let rt_tx = runtime_tx.clone();
            let scratch = scratch.clone();
            tokio::spawn(async move {
                run_action(action, scratch, rt_tx).await;
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
