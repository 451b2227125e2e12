// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{EngineError, Result};
use crate::pattern::PathPattern;
use crate::registry::{InputSpec, TaskTemplate};

/// Top-level pipeline definition as read from a TOML file.
///
/// ```toml
/// samples = "samples.tsv"
///
/// [engine]
/// jobs = 4
/// threads = 8
///
/// [template.trim]
/// wildcards = ["sample", "read"]
/// inputs = ["sample:fq{read}"]
/// outputs = ["trimmed/{sample}_{read}.fastq"]
/// threads = 2
/// cmd = "trimmer -t {threads} {input} > {output}"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineFile {
    /// Path to the sample sheet, relative to the working directory.
    pub samples: PathBuf,

    /// Engine-wide settings from `[engine]`.
    #[serde(default)]
    pub engine: EngineSection,

    /// All task templates from `[template.<name>]`, keyed by template name.
    #[serde(default)]
    pub template: BTreeMap<String, TemplateConfig>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Maximum number of simultaneously running tasks.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Global thread budget shared by all running tasks.
    #[serde(default = "default_threads_budget")]
    pub threads: usize,

    /// Values of the `read` wildcard dimension (paired-end reads by default).
    #[serde(default = "default_reads")]
    pub reads: Vec<String>,

    /// Root under which per-task scratch directories are created.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Directory for per-task log files when a template declares no `log`.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Treat an output older than any input as stale even if it exists.
    #[serde(default = "default_check_mtime")]
    pub check_mtime: bool,

    /// Keep scratch directories after tasks finish (debugging).
    #[serde(default)]
    pub retain_scratch: bool,
}

fn default_jobs() -> usize {
    1
}

fn default_threads_budget() -> usize {
    1
}

fn default_reads() -> Vec<String> {
    vec!["1".to_string(), "2".to_string()]
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".pipedag/scratch")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_check_mtime() -> bool {
    true
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            threads: default_threads_budget(),
            reads: default_reads(),
            scratch_dir: default_scratch_dir(),
            log_dir: default_log_dir(),
            check_mtime: default_check_mtime(),
            retain_scratch: false,
        }
    }
}

/// `[template.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    /// Shell command template. May reference declared wildcards plus the
    /// reserved placeholders (`{input}`, `{output}`, `{threads}`, ...).
    pub cmd: String,

    /// Wildcard dimensions this template expands over, in order.
    #[serde(default)]
    pub wildcards: Vec<String>,

    /// Input declarations: path patterns or `sample:<column>` lookups.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output path patterns.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Marker file patterns, touched on success.
    #[serde(default)]
    pub markers: Vec<String>,

    /// Per-task thread requirement.
    #[serde(default = "default_task_threads")]
    pub threads: usize,

    /// Optional log file pattern; defaults to `<log_dir>/<task id>.log`.
    #[serde(default)]
    pub log: Option<String>,
}

fn default_task_threads() -> usize {
    1
}

impl TemplateConfig {
    /// Convert this raw section into a [`TaskTemplate`], parsing every
    /// pattern. Pattern syntax errors carry the template name so the user
    /// can find the offending section.
    pub fn into_template(&self, name: &str) -> Result<TaskTemplate> {
        let malformed = |pattern: &str, reason: String| EngineError::MalformedPattern {
            template: name.to_string(),
            pattern: pattern.to_string(),
            reason,
        };

        let parse = |raw: &str| {
            PathPattern::parse(raw).map_err(|e| malformed(raw, e.reason))
        };

        let inputs = self
            .inputs
            .iter()
            .map(|raw| InputSpec::parse(raw).map_err(|e| malformed(raw, e.reason)))
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(|raw| parse(raw))
            .collect::<Result<Vec<_>>>()?;
        let markers = self
            .markers
            .iter()
            .map(|raw| parse(raw))
            .collect::<Result<Vec<_>>>()?;
        let log = self.log.as_deref().map(|raw| parse(raw)).transpose()?;
        let command = parse(&self.cmd)?;

        Ok(TaskTemplate {
            name: name.to_string(),
            wildcards: self.wildcards.clone(),
            inputs,
            outputs,
            markers,
            threads: self.threads,
            command,
            log,
        })
    }
}
