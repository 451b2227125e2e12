// src/config/mod.rs

//! Pipeline configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate engine-wide invariants (`validate.rs`).
//!
//! Template-level pattern validation lives in the registry; graph-level
//! validation (cycles, unsatisfied inputs) happens during resolution.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_pipeline_path, load_and_validate, load_from_path};
pub use model::{EngineSection, PipelineFile, TemplateConfig};
pub use validate::validate_pipeline;
