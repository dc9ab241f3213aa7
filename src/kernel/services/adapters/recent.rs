//! 最近打开的文件（MRU，持久化为 recent.json）

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFiles {
    files: Vec<PathBuf>,
    #[serde(skip, default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

impl RecentFiles {
    pub fn new(limit: usize) -> Self {
        Self {
            files: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Loads the list, dropping entries that no longer exist. Missing or invalid
    /// files yield an empty list.
    pub fn load(path: &Path, limit: usize) -> Self {
        let mut recent = std::fs::read_to_string(path)
            .ok()
            .and_then(|data| match serde_json::from_str::<RecentFiles>(&data) {
                Ok(recent) => Some(recent),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "invalid recent files list");
                    None
                }
            })
            .unwrap_or_else(|| Self::new(limit));
        recent.limit = limit.max(1);
        recent.files.retain(|p| p.exists());
        recent.files.truncate(recent.limit);
        recent
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, data)
    }

    /// Moves `path` to the front.
    pub fn add(&mut self, path: &Path) -> bool {
        if self.files.first().is_some_and(|p| p == path) {
            return false;
        }
        self.files.retain(|p| p != path);
        self.files.insert(0, path.to_path_buf());
        self.files.truncate(self.limit);
        true
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_LIMIT)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/recent.rs"]
mod tests;
