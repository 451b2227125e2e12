// src/scratch.rs

//! Temp-Space Manager: per-task scratch directories.
//!
//! Every action gets a private directory that exists before the process
//! starts and is removed when the [`ScratchDir`] guard drops, on every exit
//! path. Retention (for debugging) keeps the directory instead. Directories
//! are namespaced by sanitized task id plus a random suffix, so concurrent
//! tasks never collide.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ScratchManager {
    root: PathBuf,
    retain: bool,
}

impl ScratchManager {
    pub fn new(root: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            root: root.into(),
            retain,
        }
    }

    /// Create a scratch directory for the given task.
    pub fn acquire(&self, task_id: &str) -> Result<ScratchDir> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating scratch root {:?}", self.root))?;

        let prefix = format!("{}.", sanitize_id(task_id));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)
            .with_context(|| format!("creating scratch dir for task '{task_id}'"))?;

        debug!(task = %task_id, path = ?dir.path(), "scratch directory acquired");
        Ok(ScratchDir {
            dir: Some(dir),
            retain: self.retain,
        })
    }
}

/// Scoped handle to a task's scratch directory.
///
/// Dropping the handle removes the directory unless retention was requested.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    retain: bool,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .expect("scratch dir accessed after drop")
            .path()
    }

    /// Flag this directory for retention (e.g. after a failed action).
    pub fn retain(&mut self) {
        self.retain = true;
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.retain {
                let path = dir.keep();
                info!(path = ?path, "retaining scratch directory");
            }
            // Otherwise TempDir removes the tree on drop.
        }
    }
}

/// Filesystem-safe rendition of a task id.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
            c
        } else {
            '-'
        })
        .collect()
}
