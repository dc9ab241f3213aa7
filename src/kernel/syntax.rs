//! Syntax highlighting (tree-sitter-c). Read-only: never touches buffers.

use ropey::Rope;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    C,
}

impl LanguageId {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("c" | "h") => Some(Self::C),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::C => "C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Comment,
    String,
    Number,
    Type,
    Keyword,
    Function,
    Preprocessor,
}

impl HighlightKind {
    pub const ALL: [Self; 7] = [
        Self::Comment,
        Self::String,
        Self::Number,
        Self::Type,
        Self::Keyword,
        Self::Function,
        Self::Preprocessor,
    ];

    /// Children of these nodes are not visited.
    const fn is_leaf(self) -> bool {
        matches!(self, Self::Comment | Self::String | Self::Type | Self::Number)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::String => "string",
            Self::Number => "number",
            Self::Type => "type",
            Self::Keyword => "keyword",
            Self::Function => "function",
            Self::Preprocessor => "preprocessor",
        }
    }
}

/// Byte range. Absolute from [`Highlighter::highlight`], line-relative after [`split_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

pub trait Highlighter: Send + Sync {
    fn highlight(&self, text: &Rope, language: LanguageId) -> Vec<HighlightSpan>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterHighlighter;

impl TreeSitterHighlighter {
    pub fn new() -> Self {
        Self
    }
}

impl Highlighter for TreeSitterHighlighter {
    fn highlight(&self, text: &Rope, language: LanguageId) -> Vec<HighlightSpan> {
        let mut parser = Parser::new();
        let set = match language {
            LanguageId::C => parser.set_language(tree_sitter_c::language()),
        };
        if let Err(e) = set {
            tracing::error!(language = language.name(), error = %e, "tree-sitter language mismatch");
            return Vec::new();
        }
        let Some(tree) = parse_rope(&mut parser, text) else {
            return Vec::new();
        };
        collect_highlights(&tree, text.len_bytes())
    }
}

/// Splits absolute spans into per-line spans with offsets relative to each line start.
pub fn split_lines(rope: &Rope, spans: &[HighlightSpan]) -> Vec<Vec<HighlightSpan>> {
    let total_lines = rope.len_lines().max(1);
    let end_byte = rope.len_bytes();
    let mut per_line = vec![Vec::new(); total_lines];

    for span in spans {
        let span_start = span.start.min(end_byte);
        let span_end = span.end.min(end_byte);
        if span_start >= span_end {
            continue;
        }

        let first_line = rope.byte_to_line(span_start);
        let last_line = rope
            .byte_to_line(span_end.saturating_sub(1))
            .min(total_lines.saturating_sub(1));
        for (line, line_spans) in per_line
            .iter_mut()
            .enumerate()
            .take(last_line.saturating_add(1))
            .skip(first_line)
        {
            let line_start = rope.line_to_byte(line);
            let line_end = rope.line_to_byte((line + 1).min(total_lines));

            let s = span_start.max(line_start);
            let e = span_end.min(line_end);
            if s >= e {
                continue;
            }
            line_spans.push(HighlightSpan {
                start: s - line_start,
                end: e - line_start,
                kind: span.kind,
            });
        }
    }

    for line_spans in &mut per_line {
        line_spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        merge_adjacent_spans(line_spans);
    }
    per_line
}

fn parse_rope(parser: &mut Parser, rope: &Rope) -> Option<Tree> {
    let mut cache = RopeChunkCache::new(rope);
    parser.parse_with(&mut |byte_offset, _| cache.bytes_from(byte_offset), None)
}

struct RopeChunkCache<'a> {
    rope: &'a Rope,
    chunk: &'a str,
    start: usize,
    end: usize,
}

impl<'a> RopeChunkCache<'a> {
    fn new(rope: &'a Rope) -> Self {
        Self {
            rope,
            chunk: "",
            start: 0,
            end: 0,
        }
    }

    fn bytes_from(&mut self, byte_offset: usize) -> &'a [u8] {
        if byte_offset >= self.rope.len_bytes() {
            return &[];
        }
        if byte_offset < self.start || byte_offset >= self.end {
            let (chunk, chunk_start, _, _) = self.rope.chunk_at_byte(byte_offset);
            self.chunk = chunk;
            self.start = chunk_start;
            self.end = chunk_start + chunk.len();
        }
        let rel = byte_offset.saturating_sub(self.start);
        &self.chunk.as_bytes()[rel..]
    }
}

fn collect_highlights(tree: &Tree, end_byte: usize) -> Vec<HighlightSpan> {
    let mut stack = vec![tree.root_node()];
    let mut spans = Vec::new();

    while let Some(node) = stack.pop() {
        if let Some(kind) = classify_node(node) {
            spans.push(HighlightSpan {
                start: node.start_byte().min(end_byte),
                end: node.end_byte().min(end_byte),
                kind,
            });
            if kind.is_leaf() {
                continue;
            }
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }

    spans.retain(|s| s.start < s.end);
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    // 外层优先：与前一个区间重叠的内层区间直接丢弃
    let mut out: Vec<HighlightSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if out.last().is_some_and(|prev| span.start < prev.end) {
            continue;
        }
        out.push(span);
    }
    out
}

fn classify_node(node: Node<'_>) -> Option<HighlightKind> {
    let kind = node.kind();

    if kind == "comment" {
        return Some(HighlightKind::Comment);
    }
    if matches!(
        kind,
        "string_literal" | "char_literal" | "system_lib_string" | "concatenated_string"
    ) {
        return Some(HighlightKind::String);
    }
    if kind == "number_literal" {
        return Some(HighlightKind::Number);
    }
    if matches!(
        kind,
        "primitive_type" | "type_identifier" | "sized_type_specifier"
    ) {
        return Some(HighlightKind::Type);
    }
    if kind.starts_with('#') {
        return Some(HighlightKind::Preprocessor);
    }
    if matches!(kind, "true" | "false" | "null") {
        return Some(HighlightKind::Keyword);
    }
    if !node.is_named() && is_c_keyword(kind) {
        return Some(HighlightKind::Keyword);
    }
    if kind == "identifier" {
        return classify_identifier(node);
    }
    None
}

fn classify_identifier(node: Node<'_>) -> Option<HighlightKind> {
    let parent = node.parent()?;
    match parent.kind() {
        "function_declarator" if is_field(parent, "declarator", node) => {
            Some(HighlightKind::Function)
        }
        "call_expression" if is_field(parent, "function", node) => Some(HighlightKind::Function),
        "preproc_function_def" | "preproc_def" if is_field(parent, "name", node) => {
            Some(HighlightKind::Preprocessor)
        }
        _ => None,
    }
}

fn is_field(parent: Node<'_>, field_name: &str, node: Node<'_>) -> bool {
    parent
        .child_by_field_name(field_name)
        .is_some_and(|field| field.start_byte() == node.start_byte() && field.end_byte() == node.end_byte())
}

fn is_c_keyword(kind: &str) -> bool {
    matches!(
        kind,
        "auto"
            | "break"
            | "case"
            | "const"
            | "continue"
            | "default"
            | "do"
            | "else"
            | "enum"
            | "extern"
            | "for"
            | "goto"
            | "if"
            | "inline"
            | "register"
            | "restrict"
            | "return"
            | "sizeof"
            | "static"
            | "struct"
            | "switch"
            | "typedef"
            | "union"
            | "volatile"
            | "while"
            | "_Atomic"
            | "_Noreturn"
            | "defined"
    )
}

fn merge_adjacent_spans(spans: &mut Vec<HighlightSpan>) {
    if spans.len() <= 1 {
        return;
    }
    let mut out: Vec<HighlightSpan> = Vec::with_capacity(spans.len());
    for span in spans.drain(..) {
        if let Some(prev) = out.last_mut() {
            if prev.kind == span.kind && span.start <= prev.end {
                prev.end = prev.end.max(span.end);
                continue;
            }
        }
        out.push(span);
    }
    *spans = out;
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/syntax.rs"]
mod tests;
