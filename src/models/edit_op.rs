use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// (row, grapheme column)
pub type Pos = (usize, usize);

/// Process-wide edit identity; strictly increasing in creation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId(u64);

impl OpId {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpId({:x})", self.0)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Mutation request against a buffer, expressed in (row, column) positions.
///
/// Requests are resolved by [`crate::models::TextBuffer::apply_command`] into an
/// [`EditOp`] that records everything needed to reverse it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditCommand {
    Insert { at: Pos, text: String },
    Delete { start: Pos, end: Pos },
    Replace { start: Pos, end: Pos, text: String },
}

impl EditCommand {
    pub fn insert(at: Pos, text: impl Into<String>) -> Self {
        Self::Insert {
            at,
            text: text.into(),
        }
    }

    pub fn delete(start: Pos, end: Pos) -> Self {
        Self::Delete { start, end }
    }

    pub fn replace(start: Pos, end: Pos, text: impl Into<String>) -> Self {
        Self::Replace {
            start,
            end,
            text: text.into(),
        }
    }
}

/// 字符偏移（char index）上的原子变更
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Insert {
        char_offset: usize,
        text: CompactString,
    },
    Delete {
        start: usize,
        end: usize,
        deleted: CompactString,
    },
    Replace {
        start: usize,
        end: usize,
        deleted: CompactString,
        inserted: CompactString,
    },
}

impl OpKind {
    pub fn apply(&self, rope: &mut ropey::Rope) {
        match self {
            OpKind::Insert { char_offset, text } => {
                rope.insert(*char_offset, text);
            }
            OpKind::Delete { start, end, .. } => {
                rope.remove(*start..*end);
            }
            OpKind::Replace {
                start,
                end,
                inserted,
                ..
            } => {
                rope.remove(*start..*end);
                rope.insert(*start, inserted);
            }
        }
    }

    pub fn inverse(&self) -> OpKind {
        match self {
            OpKind::Insert { char_offset, text } => OpKind::Delete {
                start: *char_offset,
                end: char_offset + text.chars().count(),
                deleted: text.clone(),
            },
            OpKind::Delete { start, deleted, .. } => OpKind::Insert {
                char_offset: *start,
                text: deleted.clone(),
            },
            OpKind::Replace {
                start,
                deleted,
                inserted,
                ..
            } => OpKind::Replace {
                start: *start,
                end: start + inserted.chars().count(),
                deleted: inserted.clone(),
                inserted: deleted.clone(),
            },
        }
    }

    /// Char range touched after the op is applied.
    pub fn affected_range(&self) -> (usize, usize) {
        match self {
            OpKind::Insert { char_offset, text } => {
                (*char_offset, char_offset + text.chars().count())
            }
            OpKind::Delete { start, .. } => (*start, *start),
            OpKind::Replace {
                start, inserted, ..
            } => (*start, start + inserted.chars().count()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditOp {
    pub id: OpId,
    pub kind: OpKind,
    pub cursor_before: Pos,
    pub cursor_after: Pos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_before: Option<(Pos, Pos)>,
}

impl EditOp {
    pub fn new(kind: OpKind, cursor_before: Pos, cursor_after: Pos) -> Self {
        Self {
            id: OpId::new(),
            kind,
            cursor_before,
            cursor_after,
            selection_before: None,
        }
    }

    pub fn with_selection_before(mut self, selection: Option<(Pos, Pos)>) -> Self {
        self.selection_before = selection;
        self
    }

    pub fn inverse(&self) -> OpKind {
        self.kind.inverse()
    }

    pub fn apply(&self, rope: &mut ropey::Rope) {
        self.kind.apply(rope);
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/edit_op.rs"]
mod tests;
