use std::fmt;
use std::path::{Path, PathBuf};

use ropey::Rope;

use crate::kernel::syntax::LanguageId;
use crate::models::{EditCommand, EditError, EditHistory, EditHistoryConfig, Pos, Selection, TextBuffer};

const DIRTY_PREFIX: &str = "● ";

/// Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Buffer {
    id: BufferId,
    path: Option<PathBuf>,
    title: String,
    text: TextBuffer,
    history: EditHistory,
    /// Bumped on every content change (edit, undo, redo).
    version: u64,
    language: Option<LanguageId>,
}

impl Buffer {
    pub(super) fn untitled(id: BufferId, title: String, config: EditHistoryConfig) -> Self {
        Self {
            id,
            path: None,
            title,
            text: TextBuffer::new(),
            history: EditHistory::new().with_config(config),
            version: 0,
            language: None,
        }
    }

    pub(super) fn from_file(
        id: BufferId,
        path: PathBuf,
        content: &str,
        config: EditHistoryConfig,
    ) -> Self {
        Self {
            id,
            title: title_for(&path),
            language: LanguageId::from_path(&path),
            path: Some(path),
            text: TextBuffer::from_text(content),
            history: EditHistory::new().with_config(config),
            version: 0,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Tab label; dirty buffers get a `● ` prefix.
    pub fn display_title(&self) -> String {
        if self.is_dirty() {
            format!("{DIRTY_PREFIX}{}", self.title)
        } else {
            self.title.clone()
        }
    }

    pub fn text(&self) -> &TextBuffer {
        &self.text
    }

    pub fn rope(&self) -> &Rope {
        self.text.rope()
    }

    pub fn cursor(&self) -> Pos {
        self.text.cursor()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.text.selection()
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn language(&self) -> Option<LanguageId> {
        self.language
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub(super) fn apply(&mut self, command: &EditCommand) -> Result<bool, EditError> {
        let Some(op) = self.text.apply_command(command)? else {
            return Ok(false);
        };
        tracing::trace!(buffer = %self.id, op = %op.to_json_line(), "edit");
        self.history.push(op);
        self.version += 1;
        Ok(true)
    }

    pub(super) fn undo(&mut self) -> bool {
        let Some(op) = self.history.undo() else {
            return false;
        };
        self.text.revert(op);
        self.version += 1;
        true
    }

    pub(super) fn redo(&mut self) -> bool {
        let Some(op) = self.history.redo() else {
            return false;
        };
        self.text.replay(op);
        self.version += 1;
        true
    }

    pub(super) fn text_mut(&mut self) -> &mut TextBuffer {
        &mut self.text
    }

    pub(super) fn history_mut(&mut self) -> &mut EditHistory {
        &mut self.history
    }

    pub(super) fn set_path(&mut self, path: PathBuf) {
        self.title = title_for(&path);
        self.language = LanguageId::from_path(&path);
        self.path = Some(path);
    }
}

fn title_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/session/buffer.rs"]
mod tests;
