// src/registry.rs

//! Task Template Registry.
//!
//! Templates are parsed and validated when registered, so every pattern error
//! surfaces before any expansion or execution. Registration is the only
//! mutation; lookups hand out shared references.

use std::collections::BTreeMap;

use crate::errors::{EngineError, Result};
use crate::pattern::{PathPattern, PatternSyntaxError};

/// Placeholders the command template may use in addition to the template's
/// wildcard dimensions. `{scratch}` is substituted at execution time; the
/// rest are resolved at instantiation.
pub const COMMAND_PLACEHOLDERS: &[&str] = &[
    "input", "inputs", "output", "outputs", "log", "threads", "scratch",
];

/// One input declaration of a template.
#[derive(Debug, Clone)]
pub enum InputSpec {
    /// A path pattern, possibly referencing wildcard dimensions. Referencing
    /// a dimension the template does not declare turns this into a gather
    /// input: it expands over every value of that dimension.
    Path(PathPattern),
    /// A lookup into the sample sheet: the resolved path is the bound
    /// sample's entry under this column. The column name may itself contain
    /// wildcards (e.g. `fq{read}`).
    SampleColumn(PathPattern),
}

impl InputSpec {
    /// Parse an input declaration string. `sample:<column>` selects a sample
    /// sheet column; anything else is a path pattern.
    pub fn parse(raw: &str) -> std::result::Result<Self, PatternSyntaxError> {
        match raw.strip_prefix("sample:") {
            Some(column) => Ok(InputSpec::SampleColumn(PathPattern::parse(column)?)),
            None => Ok(InputSpec::Path(PathPattern::parse(raw)?)),
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        match self {
            InputSpec::Path(p) | InputSpec::SampleColumn(p) => p,
        }
    }
}

/// A registered task template: one pipeline stage, uninstantiated.
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub name: String,
    /// Wildcard dimensions this template is expanded over, in declaration
    /// order (e.g. `["sample", "read"]`). May be empty for one-shot stages
    /// such as database installation.
    pub wildcards: Vec<String>,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<PathPattern>,
    /// Zero-byte marker files recorded by the ledger on success. A template
    /// must declare at least one output or marker.
    pub markers: Vec<PathPattern>,
    /// Declared thread requirement (>= 1).
    pub threads: usize,
    /// Shell command template.
    pub command: PathPattern,
    pub log: Option<PathPattern>,
}

/// Stores templates by name.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    /// Wildcard dimensions the engine knows about (`sample`, `read`, ...).
    known_dimensions: Vec<String>,
    templates: BTreeMap<String, TaskTemplate>,
}

impl TemplateRegistry {
    pub fn new(known_dimensions: Vec<String>) -> Self {
        Self {
            known_dimensions,
            templates: BTreeMap::new(),
        }
    }

    /// Register a template, validating its patterns.
    ///
    /// Fails with [`EngineError::DuplicateTemplate`] if the name is taken and
    /// [`EngineError::MalformedPattern`] if any pattern references an unknown
    /// dimension (outputs are held to the stricter rule that they may only
    /// reference *declared* dimensions, so each binding yields a unique path).
    pub fn register(&mut self, template: TaskTemplate) -> Result<()> {
        if self.templates.contains_key(&template.name) {
            return Err(EngineError::DuplicateTemplate(template.name));
        }
        self.validate(&template)?;
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&TaskTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| EngineError::TemplateNotFound(name.to_string()))
    }

    /// All templates in name order.
    pub fn templates(&self) -> impl Iterator<Item = &TaskTemplate> {
        self.templates.values()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn validate(&self, template: &TaskTemplate) -> Result<()> {
        let malformed = |pattern: &PathPattern, reason: String| EngineError::MalformedPattern {
            template: template.name.clone(),
            pattern: pattern.raw().to_string(),
            reason,
        };

        for dim in &template.wildcards {
            if !self.known_dimensions.iter().any(|d| d == dim) {
                return Err(EngineError::Config(format!(
                    "template '{}' declares unknown wildcard dimension '{}'",
                    template.name, dim
                )));
            }
        }

        if template.outputs.is_empty() && template.markers.is_empty() {
            return Err(EngineError::Config(format!(
                "template '{}' declares no outputs or markers",
                template.name
            )));
        }
        if template.threads == 0 {
            return Err(EngineError::Config(format!(
                "template '{}' declares a thread requirement of 0",
                template.name
            )));
        }

        // Outputs, markers and the log pattern must be fully determined by
        // the declared dimensions.
        for pattern in template
            .outputs
            .iter()
            .chain(&template.markers)
            .chain(&template.log)
        {
            for name in pattern.wildcards() {
                if !template.wildcards.iter().any(|d| d == name) {
                    return Err(malformed(
                        pattern,
                        format!("references undeclared wildcard dimension '{name}'"),
                    ));
                }
            }
        }

        // Inputs may additionally reference other known dimensions (gather).
        for input in &template.inputs {
            let pattern = input.pattern();
            for name in pattern.wildcards() {
                let declared = template.wildcards.iter().any(|d| d == name);
                let known = self.known_dimensions.iter().any(|d| d == name);
                if !declared && !known {
                    return Err(malformed(
                        pattern,
                        format!("references undefined wildcard dimension '{name}'"),
                    ));
                }
            }
        }

        // Commands may reference declared dimensions plus the reserved
        // execution placeholders.
        for name in template.command.wildcards() {
            let declared = template.wildcards.iter().any(|d| d == name);
            let reserved = COMMAND_PLACEHOLDERS.contains(&name);
            if !declared && !reserved {
                return Err(malformed(
                    &template.command,
                    format!("command references unknown placeholder '{name}'"),
                ));
            }
        }

        Ok(())
    }
}
