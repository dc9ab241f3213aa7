//! 本地文件系统
//!
//! 写入前把旧内容复制到 `<path>.bak`，写失败时从备份恢复，成功后删除备份

use crate::kernel::services::ports::file::{FileError, FileSystem, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn create_backup(path: &Path) -> Option<PathBuf> {
    if !path.is_file() {
        return None;
    }
    let backup = backup_path_for(path);
    match fs::copy(path, &backup) {
        Ok(_) => Some(backup),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "backup before save failed");
            None
        }
    }
}

fn restore_backup(backup: &Path, path: &Path) {
    match fs::copy(backup, path) {
        Ok(_) => {
            let _ = fs::remove_file(backup);
            tracing::info!(path = %path.display(), "restored file from backup after failed save");
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "restore from backup failed; backup kept"
            );
        }
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if path.is_dir() {
            return Err(FileError::NotAFile(path.to_path_buf()));
        }
        fs::read(path).map_err(|e| FileError::io(path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if path.is_dir() {
            return Err(FileError::NotAFile(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(FileError::NotFound(parent.to_path_buf()));
            }
        }

        let backup = create_backup(path);
        match write_bytes(path, bytes) {
            Ok(()) => {
                if let Some(backup) = backup {
                    let _ = fs::remove_file(backup);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(backup) = backup {
                    restore_backup(&backup, path);
                }
                Err(FileError::io(path, e))
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/file/local.rs"]
mod tests;
