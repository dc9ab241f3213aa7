//! 键盘命令 → 光标移动 / EditCommand
//!
//! 只做纯计算；真正的修改交给 Session，这样撤销历史和脏标记只有一个入口。

use crate::core::Command;
use crate::models::{EditCommand, Pos, TextBuffer};

/// Target cursor for a movement command, `None` when the command is not a movement.
pub fn cursor_target(text: &TextBuffer, command: &Command) -> Option<Pos> {
    let (row, col) = text.cursor();
    let last_row = text.len_lines().saturating_sub(1);
    let target = match command {
        Command::CursorLeft => {
            if col > 0 {
                (row, col - 1)
            } else if row > 0 {
                (row - 1, text.line_grapheme_len(row - 1))
            } else {
                (row, col)
            }
        }
        Command::CursorRight => {
            if col < text.line_grapheme_len(row) {
                (row, col + 1)
            } else if row < last_row {
                (row + 1, 0)
            } else {
                (row, col)
            }
        }
        Command::CursorUp => text.clamp_pos((row.saturating_sub(1), col)),
        Command::CursorDown => text.clamp_pos(((row + 1).min(last_row), col)),
        Command::CursorLineStart => (row, 0),
        Command::CursorLineEnd => (row, text.line_grapheme_len(row)),
        _ => return None,
    };
    Some(target)
}

/// Edit for a typing command at the cursor. A non-empty selection is replaced.
pub fn edit_for(text: &TextBuffer, command: &Command, tab_size: u8) -> Option<EditCommand> {
    let cursor = text.cursor();
    let selection = text.selection().filter(|s| !s.is_empty()).map(|s| s.range());

    let insert = |s: String| match selection {
        Some((start, end)) => EditCommand::replace(start, end, s),
        None => EditCommand::insert(cursor, s),
    };

    let edit = match command {
        Command::InsertChar(c) => insert(c.to_string()),
        Command::InsertNewline => insert("\n".to_string()),
        Command::InsertTab => insert(" ".repeat(usize::from(tab_size.max(1)))),
        Command::DeleteBackward => match selection {
            Some((start, end)) => EditCommand::delete(start, end),
            None => {
                let (row, col) = cursor;
                if col > 0 {
                    EditCommand::delete((row, col - 1), cursor)
                } else if row > 0 {
                    EditCommand::delete((row - 1, text.line_grapheme_len(row - 1)), cursor)
                } else {
                    return None;
                }
            }
        },
        Command::DeleteForward => match selection {
            Some((start, end)) => EditCommand::delete(start, end),
            None => {
                let (row, col) = cursor;
                if col < text.line_grapheme_len(row) {
                    EditCommand::delete(cursor, (row, col + 1))
                } else if row + 1 < text.len_lines() {
                    EditCommand::delete(cursor, (row + 1, 0))
                } else {
                    return None;
                }
            }
        },
        _ => return None,
    };
    Some(edit)
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/editing.rs"]
mod tests;
