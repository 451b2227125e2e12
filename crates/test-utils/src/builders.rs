#![allow(dead_code)]

use std::path::PathBuf;

use pipedag::config::TemplateConfig;
use pipedag::dag::Task;
use pipedag::pattern::Binding;

/// Builder for `TemplateConfig` to simplify test setup.
pub struct TemplateConfigBuilder {
    template: TemplateConfig,
}

impl TemplateConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            template: TemplateConfig {
                cmd: cmd.to_string(),
                wildcards: vec![],
                inputs: vec![],
                outputs: vec![],
                markers: vec![],
                threads: 1,
                log: None,
            },
        }
    }

    pub fn wildcard(mut self, dim: &str) -> Self {
        self.template.wildcards.push(dim.to_string());
        self
    }

    pub fn input(mut self, spec: &str) -> Self {
        self.template.inputs.push(spec.to_string());
        self
    }

    pub fn output(mut self, pattern: &str) -> Self {
        self.template.outputs.push(pattern.to_string());
        self
    }

    pub fn marker(mut self, pattern: &str) -> Self {
        self.template.markers.push(pattern.to_string());
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.template.threads = n;
        self
    }

    pub fn log(mut self, pattern: &str) -> Self {
        self.template.log = Some(pattern.to_string());
        self
    }

    pub fn build(self) -> TemplateConfig {
        self.template
    }
}

/// Builder for concrete `Task`s, for tests that bypass expansion.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            task: Task {
                id: id.to_string(),
                template: id.to_string(),
                binding: Binding::new(),
                inputs: vec![],
                outputs: vec![],
                markers: vec![],
                threads: 1,
                command: format!("echo {id}"),
                log: None,
            },
        }
    }

    pub fn input(mut self, path: &str) -> Self {
        self.task.inputs.push(PathBuf::from(path));
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.task.outputs.push(PathBuf::from(path));
        self
    }

    pub fn marker(mut self, path: &str) -> Self {
        self.task.markers.push(PathBuf::from(path));
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.task.threads = n;
        self
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.task.command = cmd.to_string();
        self
    }

    pub fn log(mut self, path: &str) -> Self {
        self.task.log = Some(PathBuf::from(path));
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Render a tab-separated sample sheet from a header and rows.
pub fn sample_sheet(columns: &[&str], rows: &[&[&str]]) -> String {
    let mut out = String::new();
    out.push_str(&columns.join("\t"));
    out.push('\n');
    for row in rows {
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}
