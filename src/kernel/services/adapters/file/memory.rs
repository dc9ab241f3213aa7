//! In-memory file system for tests and headless runs.

use crate::kernel::services::ports::file::{FileError, FileSystem, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<FxHashMap<PathBuf, Vec<u8>>>,
    read_only: Mutex<FxHashSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), content.into());
        }
    }

    /// Writes to `path` fail with `PermissionDenied` until cleared.
    pub fn set_read_only(&self, path: impl Into<PathBuf>, read_only: bool) {
        if let Ok(mut set) = self.read_only.lock() {
            let path = path.into();
            if read_only {
                set.insert(path);
            } else {
                set.remove(&path);
            }
        }
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn contents_string(&self, path: &Path) -> Option<String> {
        self.contents(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn poisoned(path: &Path) -> FileError {
    FileError::io(path, io::Error::new(io::ErrorKind::Other, "file table poisoned"))
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().map_err(|_| poisoned(path))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| FileError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let denied = self
            .read_only
            .lock()
            .map(|set| set.contains(path))
            .unwrap_or(false);
        if denied {
            return Err(FileError::io(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        let mut files = self.files.lock().map_err(|_| poisoned(path))?;
        files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}
