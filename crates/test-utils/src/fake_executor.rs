use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pipedag::dag::ScheduledAction;
use pipedag::engine::{EngineEvent, TaskOutcome};
use pipedag::errors::Result;
use pipedag::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run" (in dispatch order)
/// - immediately reports `TaskCompleted` for each scheduled action, with
///   `Success` unless the task id is in the scripted failure set.
///
/// It never spawns processes and never touches the filesystem, so tests
/// must arrange outputs themselves (e.g. via `on_run` or pre-created files)
/// when the ledger is expected to accept the completion.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<EngineEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<String>,
    /// Called with each action before its completion event is sent; tests
    /// use this to create the declared output files.
    on_run: Option<Box<dyn Fn(&ScheduledAction) + Send>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<EngineEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            on_run: None,
        }
    }

    /// Make the given task id report `Failed(1)` instead of `Success`.
    pub fn fail_task(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn on_run(mut self, f: impl Fn(&ScheduledAction) + Send + 'static) -> Self {
        self.on_run = Some(Box::new(f));
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        actions: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing: Vec<bool> = actions
            .iter()
            .map(|a| self.failing.contains(&a.id))
            .collect();

        if let Some(on_run) = &self.on_run {
            for (action, &fails) in actions.iter().zip(&failing) {
                if !fails {
                    on_run(action);
                }
            }
        }

        Box::pin(async move {
            for (action, fails) in actions.into_iter().zip(failing) {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(action.id.clone());
                }

                let outcome = if fails {
                    TaskOutcome::Failed(1)
                } else {
                    TaskOutcome::Success
                };
                tx.send(EngineEvent::TaskCompleted {
                    node: action.node,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
