// src/fs/mock.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
struct MockFile {
    contents: Vec<u8>,
    /// Logical modification tick; each write increments the global clock, so
    /// tests can reason about "newer than" without real time.
    mtime_tick: u64,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockFile>,
    dirs: HashSet<PathBuf>,
    clock: u64,
}

/// In-memory filesystem for tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the next modification tick.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let tick = state.clock;
        state.files.insert(
            path.as_ref().to_path_buf(),
            MockFile {
                contents: contents.into(),
                mtime_tick: tick,
            },
        );
    }

    /// Pretend `path` was modified just now (bumps it past everything else).
    pub fn bump_mtime(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let tick = state.clock;
        if let Some(file) = state.files.get_mut(path.as_ref()) {
            file.mtime_tick = tick;
        }
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.files.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(file) => String::from_utf8(file.contents.clone())
                .map_err(|e| anyhow!("invalid UTF-8 in {:?}: {}", path, e)),
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path)
    }

    fn mtime(&self, path: &Path) -> Result<SystemTime> {
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(file) => Ok(UNIX_EPOCH + Duration::from_secs(file.mtime_tick)),
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn touch(&self, path: &Path) -> Result<()> {
        self.add_file(path, Vec::new());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut current = path.to_path_buf();
        loop {
            state.dirs.insert(current.clone());
            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    current = parent.to_path_buf();
                }
                _ => break,
            }
        }
        Ok(())
    }
}
