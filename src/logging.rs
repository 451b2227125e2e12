// src/logging.rs

//! Logging setup for `pipedag` using `tracing` + `tracing-subscriber`.
//!
//! Level selection: the `--log-level` flag wins, then the `PIPEDAG_LOG`
//! environment variable, then `info`. Everything goes to stderr; stdout
//! carries the dry-run plan and the final run report.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = cli_level
        .or_else(|| std::env::var("PIPEDAG_LOG").ok()?.parse().ok())
        .map(tracing::Level::from)
        .unwrap_or(tracing::Level::INFO);

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
