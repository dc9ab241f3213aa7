//! 编辑会话管理器
//!
//! - 按插入顺序保存打开的缓冲区（标签顺序）
//! - 活动缓冲区 id（若存在，必须指向集合中的缓冲区）
//! - 每个缓冲区独立的撤销/重做栈与保存点（clean marker）
//! - 文件读写经由 FileSystem 端口；异步路径拆成 begin/finish 两半

mod buffer;
mod error;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ropey::Rope;

use crate::kernel::services::ports::compiler::SourceSnapshot;
use crate::kernel::services::ports::file::{FileError, FileSystem};
use crate::models::{CleanMarker, EditCommand, EditHistoryConfig, Pos, Selection};

pub use buffer::{Buffer, BufferId};
pub use error::SessionError;

pub type Result<T> = std::result::Result<T, SessionError>;

const UNTITLED_PREFIX: &str = "Untitled-";

/// Notifications for the UI collaborator (re-render / re-highlight).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BufferOpened(BufferId),
    ContentChanged { buffer: BufferId, version: u64 },
    ActiveChanged(Option<BufferId>),
    Saved { buffer: BufferId, path: PathBuf },
    BufferClosed(BufferId),
}

/// Everything a background writer needs; taken at save time.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub buffer: BufferId,
    pub path: PathBuf,
    pub text: Rope,
    pub version: u64,
    pub marker: CleanMarker,
}

impl SaveRequest {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len_bytes());
        for chunk in self.text.chunks() {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        bytes
    }
}

pub struct Session {
    buffers: Vec<Buffer>,
    active: Option<BufferId>,
    next_id: u64,
    untitled_count: usize,
    fs: Arc<dyn FileSystem>,
    history_config: EditHistoryConfig,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            buffers: Vec::new(),
            active: None,
            next_id: 1,
            untitled_count: 0,
            fs,
            history_config: EditHistoryConfig::default(),
            events: Vec::new(),
        }
    }

    pub fn with_history_config(mut self, config: EditHistoryConfig) -> Self {
        self.history_config = config;
        self
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    // ==================== 查询 ====================

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    /// Tab order.
    pub fn buffer_ids(&self) -> Vec<BufferId> {
        self.buffers.iter().map(Buffer::id).collect()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id() == id)
    }

    pub fn active_id(&self) -> Option<BufferId> {
        self.active
    }

    pub fn active_buffer(&self) -> Option<&Buffer> {
        self.active.and_then(|id| self.buffer(id))
    }

    pub fn find_by_path(&self, path: &Path) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|b| b.path() == Some(path))
            .map(Buffer::id)
    }

    pub fn is_dirty(&self, id: BufferId) -> Result<bool> {
        Ok(self.get(id)?.is_dirty())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffers.iter().any(Buffer::is_dirty)
    }

    pub fn dirty_buffers(&self) -> Vec<BufferId> {
        self.buffers
            .iter()
            .filter(|b| b.is_dirty())
            .map(Buffer::id)
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ==================== 打开 / 新建 ====================

    /// Reads `path` and appends a clean buffer. A path that is already open returns the
    /// existing buffer without reloading it.
    pub fn open(&mut self, path: &Path, activate: bool) -> Result<BufferId> {
        if let Some(id) = self.find_by_path(path) {
            if activate {
                self.activate(id)?;
            }
            return Ok(id);
        }
        let bytes = self.fs.read(path)?;
        Ok(self.open_loaded(path.to_path_buf(), &bytes, activate))
    }

    /// Completion half of an async open.
    pub fn open_loaded(&mut self, path: PathBuf, bytes: &[u8], activate: bool) -> BufferId {
        if let Some(id) = self.find_by_path(&path) {
            tracing::debug!(buffer = %id, path = %path.display(), "already open");
            if activate {
                self.set_active(Some(id));
            }
            return id;
        }

        let content = decode_text(&path, bytes);
        let id = self.alloc_id();
        tracing::info!(buffer = %id, path = %path.display(), "opened");
        self.buffers
            .push(Buffer::from_file(id, path, &content, self.history_config));
        self.events.push(SessionEvent::BufferOpened(id));
        if activate {
            self.set_active(Some(id));
        }
        id
    }

    pub fn new_buffer(&mut self) -> BufferId {
        self.untitled_count += 1;
        let id = self.alloc_id();
        let title = format!("{UNTITLED_PREFIX}{}", self.untitled_count);
        tracing::debug!(buffer = %id, %title, "new buffer");
        self.buffers
            .push(Buffer::untitled(id, title, self.history_config));
        self.events.push(SessionEvent::BufferOpened(id));
        id
    }

    // ==================== 标签 ====================

    pub fn activate(&mut self, id: BufferId) -> Result<()> {
        self.get(id)?;
        self.set_active(Some(id));
        Ok(())
    }

    /// Ctrl+Tab: cycles forward in tab order, wrapping at the end.
    pub fn next_tab(&mut self) -> Option<BufferId> {
        self.cycle(1)
    }

    /// Ctrl+Shift+Tab.
    pub fn prev_tab(&mut self) -> Option<BufferId> {
        self.cycle(-1)
    }

    /// Alt+1..9 (0-based index). Out-of-range is a no-op.
    pub fn activate_index(&mut self, index: usize) -> Option<BufferId> {
        let id = self.buffers.get(index)?.id();
        self.set_active(Some(id));
        Some(id)
    }

    fn cycle(&mut self, step: isize) -> Option<BufferId> {
        let len = self.buffers.len();
        if len == 0 {
            return None;
        }
        let next = match self.active_index() {
            Some(i) => (i as isize + step).rem_euclid(len as isize) as usize,
            None => 0,
        };
        let id = self.buffers[next].id();
        self.set_active(Some(id));
        Some(id)
    }

    // ==================== 编辑 ====================

    /// Returns `false` when the command resolves to nothing (empty insert, empty range).
    pub fn apply_edit(&mut self, id: BufferId, command: &EditCommand) -> Result<bool> {
        let buffer = self.get_mut(id)?;
        if !buffer.apply(command)? {
            return Ok(false);
        }
        let version = buffer.version();
        self.events.push(SessionEvent::ContentChanged { buffer: id, version });
        Ok(true)
    }

    pub fn undo(&mut self, id: BufferId) -> Result<bool> {
        let buffer = self.get_mut(id)?;
        if !buffer.undo() {
            return Ok(false);
        }
        let version = buffer.version();
        self.events.push(SessionEvent::ContentChanged { buffer: id, version });
        Ok(true)
    }

    pub fn redo(&mut self, id: BufferId) -> Result<bool> {
        let buffer = self.get_mut(id)?;
        if !buffer.redo() {
            return Ok(false);
        }
        let version = buffer.version();
        self.events.push(SessionEvent::ContentChanged { buffer: id, version });
        Ok(true)
    }

    pub fn set_cursor(&mut self, id: BufferId, pos: Pos) -> Result<()> {
        let text = self.get_mut(id)?.text_mut();
        text.clear_selection();
        text.set_cursor(pos.0, pos.1);
        Ok(())
    }

    pub fn set_selection(&mut self, id: BufferId, selection: Option<Selection>) -> Result<()> {
        self.get_mut(id)?.text_mut().set_selection(selection);
        Ok(())
    }

    /// Immutable copy for the compiler; later edits cannot reach it.
    pub fn snapshot(&self, id: BufferId) -> Result<SourceSnapshot> {
        let buffer = self.get(id)?;
        Ok(SourceSnapshot {
            buffer: id,
            path: buffer.path().map(Path::to_path_buf),
            version: buffer.version(),
            text: buffer.rope().clone(),
        })
    }

    // ==================== 保存 ====================

    /// Synchronous save through the file-system collaborator.
    pub fn save(&mut self, id: BufferId, path_override: Option<&Path>) -> Result<PathBuf> {
        let request = self.begin_save(id, path_override)?;
        let result = self.fs.write(&request.path, &request.to_bytes());
        let path = request.path.clone();
        self.finish_save(request, result)?;
        Ok(path)
    }

    /// First half of a save: picks the target path and captures content + clean marker.
    pub fn begin_save(&self, id: BufferId, path_override: Option<&Path>) -> Result<SaveRequest> {
        let buffer = self.get(id)?;
        let path = path_override
            .or(buffer.path())
            .map(Path::to_path_buf)
            .ok_or(SessionError::NoPath(id))?;
        Ok(SaveRequest {
            buffer: id,
            path,
            text: buffer.rope().clone(),
            version: buffer.version(),
            marker: buffer.history().current_marker(),
        })
    }

    /// Second half: applies the write result. On failure the buffer is left untouched.
    pub fn finish_save(
        &mut self,
        request: SaveRequest,
        result: std::result::Result<(), FileError>,
    ) -> Result<()> {
        let SaveRequest {
            buffer: id,
            path,
            marker,
            version,
            ..
        } = request;
        if let Err(e) = result {
            tracing::warn!(buffer = %id, path = %path.display(), error = %e, "save failed");
            return Err(e.into());
        }

        let buffer = self.get_mut(id)?;
        if buffer.path() != Some(path.as_path()) {
            buffer.set_path(path.clone());
        }
        buffer.history_mut().mark_clean_at(marker);
        tracing::info!(
            buffer = %id,
            path = %path.display(),
            version,
            dirty = buffer.is_dirty(),
            "saved"
        );
        self.events.push(SessionEvent::Saved { buffer: id, path });
        Ok(())
    }

    // ==================== 关闭 ====================

    /// Removes the buffer. Dirty buffers need `force`. When the active buffer closes, the
    /// previous tab becomes active (or the new first tab, or none).
    pub fn close(&mut self, id: BufferId, force: bool) -> Result<()> {
        let index = self.index_of(id).ok_or(SessionError::NotFound(id))?;
        if !force && self.buffers[index].is_dirty() {
            return Err(SessionError::UnsavedChanges(id));
        }

        self.buffers.remove(index);
        tracing::debug!(buffer = %id, "closed");
        self.events.push(SessionEvent::BufferClosed(id));

        if self.active == Some(id) {
            let next = index
                .checked_sub(1)
                .or_else(|| (!self.buffers.is_empty()).then_some(0))
                .map(|i| self.buffers[i].id());
            self.set_active(next);
        }
        Ok(())
    }

    // ==================== 内部 ====================

    fn alloc_id(&mut self) -> BufferId {
        let id = BufferId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn set_active(&mut self, id: Option<BufferId>) {
        if self.active != id {
            self.active = id;
            self.events.push(SessionEvent::ActiveChanged(id));
        }
    }

    fn index_of(&self, id: BufferId) -> Option<usize> {
        self.buffers.iter().position(|b| b.id() == id)
    }

    fn active_index(&self) -> Option<usize> {
        self.active.and_then(|id| self.index_of(id))
    }

    fn get(&self, id: BufferId) -> Result<&Buffer> {
        self.buffer(id).ok_or(SessionError::NotFound(id))
    }

    fn get_mut(&mut self, id: BufferId) -> Result<&mut Buffer> {
        self.buffers
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or(SessionError::NotFound(id))
    }
}

/// UTF-8, falling back to Latin-1 so any file can be opened.
pub fn decode_text<'a>(path: &Path, bytes: &'a [u8]) -> Cow<'a, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::warn!(path = %path.display(), "file is not valid UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/session/mod.rs"]
mod tests;
