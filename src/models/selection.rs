//! 选区模型：anchor 固定，cursor 随编辑/移动变化

use super::edit_op::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    anchor: Pos,
    cursor: Pos,
}

impl Selection {
    pub fn new(anchor: Pos, cursor: Pos) -> Self {
        Self { anchor, cursor }
    }

    pub fn caret(pos: Pos) -> Self {
        Self::new(pos, pos)
    }

    pub fn anchor(&self) -> Pos {
        self.anchor
    }

    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    pub fn update_cursor(&mut self, pos: Pos) {
        self.cursor = pos;
    }

    /// Ordered `(start, end)` regardless of selection direction.
    pub fn range(&self) -> (Pos, Pos) {
        if self.anchor <= self.cursor {
            (self.anchor, self.cursor)
        } else {
            (self.cursor, self.anchor)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.cursor
    }

    pub fn contains(&self, pos: Pos) -> bool {
        let (start, end) = self.range();
        pos >= start && pos < end
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/selection.rs"]
mod tests;
