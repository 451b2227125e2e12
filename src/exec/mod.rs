// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the shell commands behind scheduled actions with
//! `tokio::process::Command` and reports back to the engine runtime via
//! `EngineEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `ShellExecutorBackend` used in production; tests replace it with a fake
//!   implementation that completes tasks without spawning processes.
//! - [`runner`] handles a single action: scratch directory, log capture,
//!   process lifecycle.

pub mod backend;
pub mod runner;

pub use backend::{ExecutorBackend, ShellExecutorBackend};
