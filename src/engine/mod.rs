// src/engine/mod.rs

//! Execution engine for pipedag.
//!
//! The scheduling semantics live in the synchronous [`crate::dag::Scheduler`]
//! state machine; [`runtime`] is the async IO shell around it, reacting to:
//! - task completion events from the executor
//! - halt requests (Ctrl-C)

pub mod runtime;

pub use runtime::Runtime;

use crate::dag::task::{SkipReason, TaskId, TaskState};

/// Outcome of a task action for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

/// Events flowing into the runtime from the executor or external signals.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A task action finished with a concrete outcome.
    TaskCompleted { node: usize, outcome: TaskOutcome },
    /// Stop dispatching new tasks; in-flight tasks finish (Ctrl-C).
    HaltRequested,
}

/// Final per-run accounting, grouped by terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: Vec<TaskId>,
    /// Skipped because outputs were already current; no action invoked.
    pub up_to_date: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    /// Never attempted because an upstream dependency failed.
    pub blocked: Vec<TaskId>,
    /// Never attempted because dispatch was halted (fail-fast or Ctrl-C).
    pub not_run: Vec<TaskId>,
}

impl RunReport {
    pub fn push(&mut self, id: TaskId, state: TaskState) {
        match state {
            TaskState::Succeeded => self.succeeded.push(id),
            TaskState::Skipped(SkipReason::UpToDate) => self.up_to_date.push(id),
            TaskState::Failed => self.failed.push(id),
            TaskState::Skipped(SkipReason::UpstreamFailed) => self.blocked.push(id),
            TaskState::Pending | TaskState::Ready | TaskState::Running => {
                self.not_run.push(id)
            }
        }
    }

    /// The run is a success only if every task reached Succeeded or
    /// Skipped-up-to-date.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty() && self.not_run.is_empty()
    }

    /// Human-readable summary for the end of a run.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "run {}: {} succeeded, {} up-to-date, {} failed, {} blocked, {} not run",
            if self.is_success() { "succeeded" } else { "FAILED" },
            self.succeeded.len(),
            self.up_to_date.len(),
            self.failed.len(),
            self.blocked.len(),
            self.not_run.len(),
        )];
        for id in &self.failed {
            lines.push(format!("  failed:  {id}"));
        }
        for id in &self.blocked {
            lines.push(format!("  blocked: {id}"));
        }
        for id in &self.not_run {
            lines.push(format!("  not run: {id}"));
        }
        lines.join("\n")
    }
}
