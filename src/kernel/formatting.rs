//! 格式化结果 → 一个 Replace 编辑
//!
//! 只替换首尾相同行之间的部分，撤销一步即可还原。

use crate::models::{slice_to_cow, EditCommand, TextBuffer};

/// Minimal line-range replacement turning `text` into `formatted`; `None` when equal.
pub fn format_edit(text: &TextBuffer, formatted: &str) -> Option<EditCommand> {
    let current = slice_to_cow(text.rope().slice(..));
    if current == formatted {
        return None;
    }
    let old: Vec<&str> = current.split_inclusive('\n').collect();
    let new: Vec<&str> = formatted.split_inclusive('\n').collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let start = (prefix, 0);
    let end = if suffix == 0 {
        text.char_to_pos(text.len_chars())
    } else {
        (old.len() - suffix, 0)
    };
    let replacement: String = new[prefix..new.len() - suffix].concat();
    let command = if replacement.is_empty() {
        EditCommand::delete(start, end)
    } else if start == end {
        EditCommand::insert(start, replacement)
    } else {
        EditCommand::replace(start, end, replacement)
    };
    Some(command)
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/formatting.rs"]
mod tests;
