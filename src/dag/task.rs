// src/dag/task.rs

//! Concrete tasks: a template instantiated against one wildcard binding.

use std::path::PathBuf;

use crate::pattern::Binding;

/// Stable task identity, e.g. `trim(read=1,sample=S1)`.
pub type TaskId = String;

/// Why a task was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Every output/marker already exists and is current; the action was
    /// never invoked.
    UpToDate,
    /// A transitive dependency failed, so this task was never attempted.
    UpstreamFailed,
}

/// Per-run lifecycle state. Transitions are forward-only:
/// `Pending → Ready → Running → {Succeeded, Failed, Skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped(SkipReason),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped(_)
        )
    }

    /// True if a dependent may treat this dependency as satisfied.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Skipped(SkipReason::UpToDate)
        )
    }
}

/// A fully-resolved unit of work.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub template: String,
    pub binding: Binding,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub markers: Vec<PathBuf>,
    /// Declared thread requirement (may be clamped by the scheduler).
    pub threads: usize,
    /// Resolved shell command; only `{scratch}` is left for execution time.
    pub command: String,
    pub log: Option<PathBuf>,
}

impl Task {
    /// Canonical task identity for a template name and binding.
    pub fn make_id(template: &str, binding: &Binding) -> TaskId {
        if binding.is_empty() {
            return template.to_string();
        }
        let assigns: Vec<String> = binding
            .iter()
            .map(|(dim, value)| format!("{dim}={value}"))
            .collect();
        format!("{}({})", template, assigns.join(","))
    }

    /// All paths this task claims to produce (outputs plus markers).
    pub fn produced_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.outputs.iter().chain(&self.markers)
    }
}

/// Description of a task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledAction {
    /// Node index in the task graph; completion events carry it back.
    pub node: usize,
    pub id: TaskId,
    /// Command with `{scratch}` still unresolved.
    pub command: String,
    /// Effective thread count after clamping to the global budget.
    pub threads: usize,
    pub outputs: Vec<PathBuf>,
    pub log: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_is_stable_and_sorted_by_dimension() {
        let mut binding = Binding::new();
        binding.insert("sample".to_string(), "S1".to_string());
        binding.insert("read".to_string(), "2".to_string());
        // BTreeMap ordering puts `read` before `sample`.
        assert_eq!(Task::make_id("trim", &binding), "trim(read=2,sample=S1)");
    }

    #[test]
    fn nullary_task_id_is_the_template_name() {
        assert_eq!(Task::make_id("install_db", &Binding::new()), "install_db");
    }

    #[test]
    fn skipped_up_to_date_satisfies_dependents_but_blocked_does_not() {
        assert!(TaskState::Skipped(SkipReason::UpToDate).satisfies_dependents());
        assert!(!TaskState::Skipped(SkipReason::UpstreamFailed).satisfies_dependents());
        assert!(TaskState::Succeeded.satisfies_dependents());
        assert!(!TaskState::Failed.satisfies_dependents());
    }
}
