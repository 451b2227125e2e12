// src/errors.rs

//! Crate-wide error types and exit-code mapping.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A template with this name is already registered.
    #[error("duplicate template '{0}'")]
    DuplicateTemplate(String),

    /// A path pattern or command template could not be parsed, or references
    /// a wildcard dimension the engine does not know about.
    #[error("malformed pattern '{pattern}' in template '{template}': {reason}")]
    MalformedPattern {
        template: String,
        pattern: String,
        reason: String,
    },

    /// Lookup of an unregistered template name.
    #[error("template not found: '{0}'")]
    TemplateNotFound(String),

    /// A pattern referenced a wildcard dimension absent from the binding and
    /// not gatherable from the binding universe.
    #[error("unresolved wildcard '{{{wildcard}}}' in template '{template}'")]
    UnresolvedWildcard {
        template: String,
        wildcard: String,
    },

    /// Two tasks claim to produce the same output path.
    #[error("duplicate output path {path:?}: produced by both '{first}' and '{second}'")]
    DuplicateOutput {
        path: PathBuf,
        first: String,
        second: String,
    },

    /// An input path has no producing task and does not exist on disk.
    #[error("unsatisfied input {path:?} required by task '{task}'")]
    UnsatisfiedInput { task: String, path: PathBuf },

    /// The dependency graph contains a cycle.
    #[error("cycle detected in task graph involving '{task}' via input {path:?}")]
    CyclicDependency { task: String, path: PathBuf },

    /// A `--target` path is produced by no task.
    #[error("no task produces target {0:?}")]
    UnknownTarget(PathBuf),

    /// Sample sheet could not be parsed.
    #[error("sample sheet error: {0}")]
    SampleTable(String),

    /// Pipeline configuration is semantically invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Process exit code for this error.
    ///
    /// - 2: configuration errors (reported before any execution)
    /// - 3: cyclic dependency graph
    /// - 4: unsatisfied input / unknown target
    /// - 1: everything else (IO, task failures are handled separately)
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::DuplicateTemplate(_)
            | EngineError::MalformedPattern { .. }
            | EngineError::TemplateNotFound(_)
            | EngineError::UnresolvedWildcard { .. }
            | EngineError::DuplicateOutput { .. }
            | EngineError::SampleTable(_)
            | EngineError::Config(_)
            | EngineError::Toml(_) => 2,
            EngineError::CyclicDependency { .. } => 3,
            EngineError::UnsatisfiedInput { .. } | EngineError::UnknownTarget(_) => 4,
            EngineError::Io(_) | EngineError::Other(_) => 1,
        }
    }
}

/// Exit code reported when the engine itself ran fine but at least one task
/// failed (or was blocked by a failure).
pub const EXIT_TASK_FAILURE: i32 = 1;

pub type Result<T> = std::result::Result<T, EngineError>;
