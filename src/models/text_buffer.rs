//! 文本缓冲区模型
//!
//! 职责：
//! - 文本存储（Rope）
//! - 光标和选区管理
//! - 行列 ↔ 字符偏移映射
//! - 把 EditCommand 解析为可逆的 EditOp

use super::edit_op::{EditCommand, EditOp, OpKind, Pos};
use super::selection::Selection;
use compact_str::CompactString;
use ropey::{Rope, RopeSlice};
use std::borrow::Cow;
use std::io::{self, Write};
use unicode_segmentation::UnicodeSegmentation;

/// 从 RopeSlice 获取字符串，优先零拷贝
pub fn slice_to_cow(slice: RopeSlice<'_>) -> Cow<'_, str> {
    match slice.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(slice.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("position {row}:{col} is outside the buffer")]
    OutOfBounds { row: usize, col: usize },
}

#[derive(Clone)]
pub struct TextBuffer {
    rope: Rope,
    cursor: Pos,
    selection: Option<Selection>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::from_rope(Rope::new())
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_rope(Rope::from_str(text))
    }

    pub fn from_rope(rope: Rope) -> Self {
        Self {
            rope,
            cursor: (0, 0),
            selection: None,
        }
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// 流式写入到 Writer，避免大文件 OOM
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for chunk in self.rope.chunks() {
            writer.write_all(chunk.as_bytes())?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    /// Moves the cursor, clamped to the buffer.
    pub fn set_cursor(&mut self, row: usize, col: usize) {
        self.cursor = self.clamp_pos((row, col));
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection.map(|sel| {
            Selection::new(self.clamp_pos(sel.anchor()), self.clamp_pos(sel.cursor()))
        });
        if let Some(sel) = &self.selection {
            self.cursor = sel.cursor();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn has_selection(&self) -> bool {
        self.selection
            .as_ref()
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    pub fn line_slice(&self, row: usize) -> Option<RopeSlice<'_>> {
        if row < self.rope.len_lines() {
            Some(self.rope.line(row))
        } else {
            None
        }
    }

    pub fn line_grapheme_len(&self, row: usize) -> usize {
        let Some(slice) = self.line_slice(row) else {
            return 0;
        };
        let line = slice_to_cow(slice);
        let without_newline = line.strip_suffix('\n').unwrap_or(&line);
        let without_newline = without_newline
            .strip_suffix('\r')
            .unwrap_or(without_newline);
        without_newline.graphemes(true).count()
    }

    pub fn clamp_pos(&self, pos: Pos) -> Pos {
        let row = pos.0.min(self.rope.len_lines().saturating_sub(1));
        (row, pos.1.min(self.line_grapheme_len(row)))
    }

    pub fn is_valid_pos(&self, pos: Pos) -> bool {
        pos.0 < self.rope.len_lines() && pos.1 <= self.line_grapheme_len(pos.0)
    }

    pub fn pos_to_char(&self, pos: Pos) -> usize {
        self.rope.line_to_char(pos.0) + self.grapheme_to_char_index(pos.0, pos.1)
    }

    pub fn char_to_pos(&self, char_idx: usize) -> Pos {
        let char_idx = char_idx.min(self.rope.len_chars());
        let row = self.rope.char_to_line(char_idx);
        let line_start = self.rope.line_to_char(row);
        let prefix = slice_to_cow(self.rope.slice(line_start..char_idx));
        (row, prefix.graphemes(true).count())
    }

    pub fn grapheme_to_char_index(&self, row: usize, grapheme_index: usize) -> usize {
        let slice = self.rope.line(row);
        let line = slice_to_cow(slice);
        line.graphemes(true)
            .take(grapheme_index)
            .map(|g| g.chars().count())
            .sum()
    }

    fn checked_char(&self, pos: Pos) -> Result<usize, EditError> {
        if !self.is_valid_pos(pos) {
            return Err(EditError::OutOfBounds {
                row: pos.0,
                col: pos.1,
            });
        }
        Ok(self.pos_to_char(pos))
    }

    fn checked_range(&self, a: Pos, b: Pos) -> Result<(usize, usize), EditError> {
        let a = self.checked_char(a)?;
        let b = self.checked_char(b)?;
        Ok((a.min(b), a.max(b)))
    }

    fn slice_string(&self, start: usize, end: usize) -> CompactString {
        CompactString::from(slice_to_cow(self.rope.slice(start..end)))
    }

    /// 解析请求；返回 None 表示空操作（不进入历史）
    pub fn resolve(&self, command: &EditCommand) -> Result<Option<OpKind>, EditError> {
        let kind = match command {
            EditCommand::Insert { at, text } => {
                let char_offset = self.checked_char(*at)?;
                if text.is_empty() {
                    return Ok(None);
                }
                OpKind::Insert {
                    char_offset,
                    text: CompactString::from(text.as_str()),
                }
            }
            EditCommand::Delete { start, end } => {
                let (start, end) = self.checked_range(*start, *end)?;
                if start == end {
                    return Ok(None);
                }
                OpKind::Delete {
                    start,
                    end,
                    deleted: self.slice_string(start, end),
                }
            }
            EditCommand::Replace { start, end, text } => {
                let (start, end) = self.checked_range(*start, *end)?;
                match (start == end, text.is_empty()) {
                    (true, true) => return Ok(None),
                    (true, false) => OpKind::Insert {
                        char_offset: start,
                        text: CompactString::from(text.as_str()),
                    },
                    (false, true) => OpKind::Delete {
                        start,
                        end,
                        deleted: self.slice_string(start, end),
                    },
                    (false, false) => {
                        let deleted = self.slice_string(start, end);
                        if deleted.as_str() == text.as_str() {
                            return Ok(None);
                        }
                        OpKind::Replace {
                            start,
                            end,
                            deleted,
                            inserted: CompactString::from(text.as_str()),
                        }
                    }
                }
            }
        };
        Ok(Some(kind))
    }

    /// Validates and applies a request. The rope is untouched on error.
    pub fn apply_command(&mut self, command: &EditCommand) -> Result<Option<EditOp>, EditError> {
        let Some(kind) = self.resolve(command)? else {
            return Ok(None);
        };

        let cursor_before = self.cursor;
        let selection_before = self.selection.map(|s| (s.anchor(), s.cursor()));

        kind.apply(&mut self.rope);
        let (_, end) = kind.affected_range();
        let cursor_after = self.char_to_pos(end);
        self.cursor = cursor_after;
        self.selection = None;

        Ok(Some(
            EditOp::new(kind, cursor_before, cursor_after).with_selection_before(selection_before),
        ))
    }

    /// 撤销：应用逆操作并恢复编辑前的光标/选区
    pub fn revert(&mut self, op: &EditOp) {
        op.inverse().apply(&mut self.rope);
        self.cursor = op.cursor_before;
        self.selection = op
            .selection_before
            .map(|(anchor, cursor)| Selection::new(anchor, cursor));
    }

    /// 重做
    pub fn replay(&mut self, op: &EditOp) {
        op.apply(&mut self.rope);
        self.cursor = op.cursor_after;
        self.selection = None;
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/text_buffer.rs"]
mod tests;
