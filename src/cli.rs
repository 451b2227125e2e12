// src/cli.rs

//! CLI argument parsing using `clap` (derive feature).

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Expand task templates over a sample sheet and execute the resulting DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve the task graph and execute it.
    Run(RunArgs),
}

/// Arguments for `pipedag run`.
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Path to the pipeline file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Pipeline.toml")]
    pub pipeline: String,

    /// Override the sample sheet path from the pipeline file.
    #[arg(long, value_name = "PATH")]
    pub samples: Option<PathBuf>,

    /// Only build these output paths (plus everything they depend on).
    /// May be given multiple times.
    #[arg(long, value_name = "PATH")]
    pub target: Vec<PathBuf>,

    /// Maximum number of tasks running at the same time.
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Global thread budget (sum of in-flight tasks' thread requirements).
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Resolve and print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep executing independent branches after a task failure.
    /// Without this flag, a failure stops dispatch of further tasks
    /// (in-flight tasks are still allowed to finish).
    #[arg(long)]
    pub keep_going: bool,

    /// Keep per-task scratch directories instead of deleting them
    /// (for debugging failed actions).
    #[arg(long)]
    pub retain_scratch: bool,
}

/// Log level as exposed on the CLI and the `PIPEDAG_LOG` variable.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_aliases_case_insensitively() {
        assert!(matches!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn)));
        assert!(matches!(" debug ".parse::<LogLevel>(), Ok(LogLevel::Debug)));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_level_maps_onto_tracing_levels() {
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }
}
