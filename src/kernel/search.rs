//! 查找 / 替换（Ctrl+F / Ctrl+H）
//!
//! 替换不直接改 Rope：生成普通的 EditCommand，交给 Session::apply_edit，
//! 因此可撤销并会标记脏状态。全部替换合成一个 Replace 操作，一步撤销。

use regex::{Regex, RegexBuilder};

use crate::kernel::session::BufferId;
use crate::models::{slice_to_cow, EditCommand, Pos, TextBuffer};

/// Buffer and content version a match list was computed against.
pub type MatchSource = (BufferId, u64);

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("empty search pattern")]
    EmptyPattern,
    #[error("invalid regex: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub pattern: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_sensitive: false,
            use_regex: false,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.use_regex = yes;
        self
    }

    pub fn compile(&self) -> Result<Regex, SearchError> {
        if self.pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        let source = if self.use_regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };
        Ok(RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .multi_line(true)
            .build()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Char offsets into the rope.
    pub start: usize,
    pub end: usize,
    pub start_pos: Pos,
    pub end_pos: Pos,
    start_byte: usize,
    end_byte: usize,
}

/// Non-empty matches in document order. Matches that begin or end inside a
/// grapheme cluster are skipped: positions cannot address them.
pub fn find_all(text: &TextBuffer, query: &SearchQuery) -> Result<Vec<Match>, SearchError> {
    let re = query.compile()?;
    let rope = text.rope();
    let haystack = slice_to_cow(rope.slice(..));
    Ok(re
        .find_iter(&haystack)
        .filter(|m| !m.is_empty())
        .filter_map(|m| {
            let start = rope.byte_to_char(m.start());
            let end = rope.byte_to_char(m.end());
            let start_pos = text.char_to_pos(start);
            let end_pos = text.char_to_pos(end);
            if text.pos_to_char(start_pos) != start || text.pos_to_char(end_pos) != end {
                return None;
            }
            Some(Match {
                start,
                end,
                start_pos,
                end_pos,
                start_byte: m.start(),
                end_byte: m.end(),
            })
        })
        .collect())
}

/// First match starting at or after `from` (char offset), wrapping to the first match.
pub fn find_next(matches: &[Match], from: usize) -> Option<usize> {
    if matches.is_empty() {
        return None;
    }
    Some(matches.iter().position(|m| m.start >= from).unwrap_or(0))
}

/// Last match starting before `from`, wrapping to the last match.
pub fn find_prev(matches: &[Match], from: usize) -> Option<usize> {
    if matches.is_empty() {
        return None;
    }
    Some(
        matches
            .iter()
            .rposition(|m| m.start < from)
            .unwrap_or(matches.len() - 1),
    )
}

/// Edit that replaces one match. Regex replacements expand `$1`/`${name}`.
pub fn replace_current(
    text: &TextBuffer,
    query: &SearchQuery,
    target: &Match,
    replacement: &str,
) -> Result<EditCommand, SearchError> {
    let re = query.compile()?;
    let haystack = slice_to_cow(text.rope().slice(..));
    let replaced = expand_one(&re, query, &haystack, target, replacement);
    Ok(EditCommand::replace(target.start_pos, target.end_pos, replaced))
}

/// One edit covering every match; `None` when nothing matches.
pub fn replace_all(
    text: &TextBuffer,
    query: &SearchQuery,
    replacement: &str,
) -> Result<Option<(EditCommand, usize)>, SearchError> {
    let matches = find_all(text, query)?;
    let (Some(first), Some(last)) = (matches.first(), matches.last()) else {
        return Ok(None);
    };
    let re = query.compile()?;
    let haystack = slice_to_cow(text.rope().slice(..));

    let mut out = String::with_capacity(last.end_byte - first.start_byte);
    let mut cursor = first.start_byte;
    for m in &matches {
        out.push_str(&haystack[cursor..m.start_byte]);
        out.push_str(&expand_one(&re, query, &haystack, m, replacement));
        cursor = m.end_byte;
    }

    let command = EditCommand::replace(first.start_pos, last.end_pos, out);
    Ok(Some((command, matches.len())))
}

fn expand_one(
    re: &Regex,
    query: &SearchQuery,
    haystack: &str,
    target: &Match,
    replacement: &str,
) -> String {
    if !query.use_regex {
        return replacement.to_string();
    }
    match re.captures_at(haystack, target.start_byte) {
        Some(caps) if caps.get(0).is_some_and(|m| m.start() == target.start_byte) => {
            let mut dst = String::new();
            caps.expand(replacement, &mut dst);
            dst
        }
        _ => replacement.to_string(),
    }
}

/// Find/replace bar state.
#[derive(Debug, Default)]
pub struct SearchState {
    pub visible: bool,
    pub replace_mode: bool,
    pub query: SearchQuery,
    pub replacement: String,
    pub matches: Vec<Match>,
    pub current: Option<usize>,
    pub error: Option<String>,
    source: Option<MatchSource>,
}

impl SearchState {
    pub fn open(&mut self, replace_mode: bool) {
        self.visible = true;
        self.replace_mode = replace_mode;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.invalidate();
    }

    /// Drops cached matches; the next lookup recomputes them.
    pub fn invalidate(&mut self) {
        self.matches.clear();
        self.current = None;
        self.source = None;
    }

    pub fn set_query(&mut self, query: SearchQuery, source: MatchSource, text: &TextBuffer) {
        self.query = query;
        self.refresh(source, text);
    }

    /// Whether `matches` were computed for this buffer at this version.
    pub fn is_fresh(&self, source: MatchSource) -> bool {
        self.source == Some(source)
    }

    /// Recomputes matches after the buffer changed.
    pub fn refresh(&mut self, source: MatchSource, text: &TextBuffer) {
        self.error = None;
        self.current = None;
        self.source = Some(source);
        match find_all(text, &self.query) {
            Ok(matches) => self.matches = matches,
            Err(SearchError::EmptyPattern) => self.matches.clear(),
            Err(e) => {
                self.matches.clear();
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.current.and_then(|i| self.matches.get(i))
    }

    pub fn next(&mut self, from: usize) -> Option<Match> {
        self.current = find_next(&self.matches, from);
        self.current_match().copied()
    }

    pub fn prev(&mut self, from: usize) -> Option<Match> {
        self.current = find_prev(&self.matches, from);
        self.current_match().copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/search.rs"]
mod tests;
