// src/dag/mod.rs

//! Concrete tasks, dependency resolution and scheduling.
//!
//! - [`task`] defines tasks, their lifecycle states and scheduled actions.
//! - [`graph`] derives the dependency DAG from output/input path matching.
//! - [`scheduler`] is the per-run state machine that decides what runs when,
//!   under the jobs and thread budgets.

pub mod graph;
pub mod scheduler;
pub mod task;

pub use graph::TaskGraph;
pub use scheduler::{Budgets, Scheduler};
pub use task::{ScheduledAction, SkipReason, Task, TaskId, TaskState};
