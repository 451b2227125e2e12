// src/exec/runner.rs

//! Individual action process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledAction;
use crate::engine::{EngineEvent, TaskOutcome};
use crate::scratch::ScratchManager;

/// Run a single action, emitting a `TaskCompleted` event when its process
/// exits, whatever the outcome.
///
/// Infrastructure failures (scratch dir, log file, spawn) are reported as
/// `Failed(-1)` so the scheduler can block dependents the same way it would
/// for a non-zero exit.
pub async fn run_action(
    action: ScheduledAction,
    scratch: ScratchManager,
    runtime_tx: mpsc::Sender<EngineEvent>,
) {
    let node = action.node;
    let id = action.id.clone();

    let outcome = match run_action_inner(action, &scratch).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(task = %id, error = %err, "action execution error");
            TaskOutcome::Failed(-1)
        }
    };

    let _ = runtime_tx
        .send(EngineEvent::TaskCompleted { node, outcome })
        .await;
}

async fn run_action_inner(
    action: ScheduledAction,
    scratch: &ScratchManager,
) -> Result<TaskOutcome> {
    // The scratch directory lives for exactly the duration of the process;
    // the guard removes it on every exit path unless retention is on.
    let scratch_dir = scratch.acquire(&action.id)?;
    let command = action
        .command
        .replace("{scratch}", &scratch_dir.path().to_string_lossy());

    for output in &action.outputs {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating output directory {parent:?}"))?;
            }
        }
    }

    info!(task = %action.id, cmd = %command, "starting action process");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&command).kill_on_drop(true);

    // Both streams go to the task's log file; without one they are discarded.
    match &action.log {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating log directory {parent:?}"))?;
                }
            }
            let log_file = std::fs::File::create(log_path)
                .with_context(|| format!("creating log file {log_path:?}"))?;
            let stderr_file = log_file
                .try_clone()
                .with_context(|| format!("cloning log handle {log_path:?}"))?;
            cmd.stdout(Stdio::from(log_file)).stderr(Stdio::from(stderr_file));
        }
        None => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", action.id))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", action.id))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %action.id,
        exit_code = code,
        success = status.success(),
        "action process exited"
    );

    if status.success() {
        Ok(TaskOutcome::Success)
    } else {
        Ok(TaskOutcome::Failed(code))
    }
}
