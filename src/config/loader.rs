// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::PipelineFile;
use crate::config::validate::validate_pipeline;
use crate::errors::Result;

/// Load a pipeline file from a given path and return the raw `PipelineFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let pipeline: PipelineFile = toml::from_str(&contents)?;
    Ok(pipeline)
}

/// Load a pipeline file and run basic validation. This is the entry point
/// the CLI uses: every error it returns maps to the configuration exit code.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let pipeline = load_from_path(&path)?;
    validate_pipeline(&pipeline)?;
    Ok(pipeline)
}

/// Default pipeline file path in the current working directory.
pub fn default_pipeline_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}
