// src/ledger.rs

//! Output Store / Marker Ledger.
//!
//! Decides which tasks can be skipped because their outputs already exist
//! and are current, and records successful completions. Existence is the
//! primary signal (marker files are zero-byte); mtime comparison against
//! inputs can be layered on top. No content hashing.

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::dag::task::Task;
use crate::errors::Result;
use crate::fs::FileSystem;

#[derive(Debug, Clone)]
pub struct MarkerLedger {
    fs: Arc<dyn FileSystem>,
    /// When true, an output older than any input is considered stale even if
    /// it exists.
    check_mtime: bool,
}

impl MarkerLedger {
    pub fn new(fs: Arc<dyn FileSystem>, check_mtime: bool) -> Self {
        Self { fs, check_mtime }
    }

    /// True if every declared output and marker of `task` exists and, when
    /// mtime checking is enabled, no input is newer than the oldest output.
    ///
    /// Markers take part in the existence check only; a marker's timestamp
    /// carries no meaning beyond "this ran once".
    pub fn is_up_to_date(&self, task: &Task) -> bool {
        for path in task.produced_paths() {
            if !self.fs.exists(path) {
                return false;
            }
        }

        if self.check_mtime && !task.inputs.is_empty() && !task.outputs.is_empty() {
            let oldest_output = match self.min_mtime(&task.outputs) {
                Some(t) => t,
                None => return false,
            };
            for input in &task.inputs {
                match self.fs.mtime(input) {
                    Ok(input_mtime) if input_mtime > oldest_output => {
                        debug!(task = %task.id, input = ?input, "input newer than outputs; stale");
                        return false;
                    }
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        }

        true
    }

    /// Record a successful completion.
    ///
    /// Verifies the action actually produced its declared outputs, then
    /// creates marker files durably. Called exactly once per succeeded task,
    /// strictly before any dependent is dispatched.
    pub fn record(&self, task: &Task) -> Result<()> {
        for output in &task.outputs {
            if !self.fs.exists(output) {
                return Err(anyhow!(
                    "task '{}' reported success but output {:?} is missing",
                    task.id,
                    output
                )
                .into());
            }
        }
        for marker in &task.markers {
            self.fs.touch(marker)?;
            debug!(task = %task.id, marker = ?marker, "marker recorded");
        }
        Ok(())
    }

    fn min_mtime(&self, paths: &[std::path::PathBuf]) -> Option<SystemTime> {
        let mut min: Option<SystemTime> = None;
        for path in paths {
            match self.fs.mtime(path) {
                Ok(t) => {
                    min = Some(match min {
                        Some(m) if m < t => m,
                        _ => t,
                    });
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "could not stat output");
                    return None;
                }
            }
        }
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pattern::Binding;
    use std::path::PathBuf;

    fn task(inputs: &[&str], outputs: &[&str], markers: &[&str]) -> Task {
        Task {
            id: "t".to_string(),
            template: "t".to_string(),
            binding: Binding::new(),
            inputs: inputs.iter().map(PathBuf::from).collect(),
            outputs: outputs.iter().map(PathBuf::from).collect(),
            markers: markers.iter().map(PathBuf::from).collect(),
            threads: 1,
            command: "true".to_string(),
            log: None,
        }
    }

    #[test]
    fn missing_output_is_not_up_to_date() {
        let fs = Arc::new(MockFileSystem::new());
        let ledger = MarkerLedger::new(fs, true);
        assert!(!ledger.is_up_to_date(&task(&[], &["out.txt"], &[])));
    }

    #[test]
    fn existing_outputs_and_markers_are_up_to_date() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("out.txt", "data");
        fs.add_file("done.marker", "");
        let ledger = MarkerLedger::new(fs, true);
        assert!(ledger.is_up_to_date(&task(&[], &["out.txt"], &["done.marker"])));
    }

    #[test]
    fn input_newer_than_output_is_stale() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("in.fq", "");
        fs.add_file("out.txt", "data");
        fs.bump_mtime("in.fq");
        let ledger = MarkerLedger::new(fs, true);
        assert!(!ledger.is_up_to_date(&task(&["in.fq"], &["out.txt"], &[])));
    }

    #[test]
    fn mtime_check_can_be_disabled() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("in.fq", "");
        fs.add_file("out.txt", "data");
        fs.bump_mtime("in.fq");
        let ledger = MarkerLedger::new(fs, false);
        assert!(ledger.is_up_to_date(&task(&["in.fq"], &["out.txt"], &[])));
    }

    #[test]
    fn record_touches_markers() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("out.txt", "data");
        let ledger = MarkerLedger::new(fs.clone(), true);
        let t = task(&[], &["out.txt"], &["stage/.done"]);

        ledger.record(&t).unwrap();
        assert!(fs.is_file(std::path::Path::new("stage/.done")));
        assert!(ledger.is_up_to_date(&t));
    }

    #[test]
    fn record_rejects_missing_output() {
        let fs = Arc::new(MockFileSystem::new());
        let ledger = MarkerLedger::new(fs, true);
        assert!(ledger.record(&task(&[], &["never-made.txt"], &[])).is_err());
    }

    #[test]
    fn marker_only_task_is_up_to_date_on_existence_alone() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("db/.installed", "");
        // Even with a newer input: markers carry no timestamp semantics.
        fs.add_file("db/source.tar", "");
        fs.bump_mtime("db/source.tar");
        let ledger = MarkerLedger::new(fs, true);
        assert!(ledger.is_up_to_date(&task(&["db/source.tar"], &[], &["db/.installed"])));
    }
}
