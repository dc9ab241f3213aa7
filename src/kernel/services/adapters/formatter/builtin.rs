//! 内置格式化：只按花括号深度重新缩进，不改动行内内容
//!
//! 块注释内部的行原样保留；预处理指令顶格。

use crate::kernel::services::ports::formatter::{FormatError, FormatRequest, Formatted, Formatter};
use crate::kernel::services::ports::runtime::BoxFuture;

pub const BUILTIN_TOOL: &str = "builtin";

#[derive(Debug, Clone, Copy)]
pub struct BuiltinFormatter {
    indent_width: usize,
}

impl BuiltinFormatter {
    pub fn new(indent_width: usize) -> Self {
        Self {
            indent_width: indent_width.max(1),
        }
    }
}

impl Default for BuiltinFormatter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Formatter for BuiltinFormatter {
    fn name(&self) -> String {
        BUILTIN_TOOL.to_string()
    }

    fn format(&self, request: FormatRequest) -> BoxFuture<Result<Formatted, FormatError>> {
        let text = reindent(&request.text, self.indent_width);
        Box::pin(async move {
            Ok(Formatted {
                text,
                tool: BUILTIN_TOOL.to_string(),
            })
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Scanner {
    in_block_comment: bool,
}

#[derive(Debug, Default)]
struct LineBraces {
    opens: usize,
    closes: usize,
}

impl Scanner {
    /// Counts braces outside comments and literals; carries block-comment state across lines.
    fn scan(&mut self, line: &str) -> LineBraces {
        let mut braces = LineBraces::default();
        let mut chars = line.chars().peekable();
        let mut quote: Option<char> = None;
        while let Some(ch) = chars.next() {
            if self.in_block_comment {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if let Some(q) = quote {
                match ch {
                    '\\' => {
                        chars.next();
                    }
                    c if c == q => quote = None,
                    _ => {}
                }
                continue;
            }
            match ch {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '"' | '\'' => quote = Some(ch),
                '{' => braces.opens += 1,
                '}' => braces.closes += 1,
                _ => {}
            }
        }
        braces
    }
}

/// Re-indents C source by brace depth. Line breaks, including a trailing one, are kept.
pub fn reindent(code: &str, indent_width: usize) -> String {
    let mut scanner = Scanner::default();
    let mut depth: usize = 0;
    let mut out: Vec<String> = Vec::new();

    for raw in code.split('\n') {
        let (line, cr) = match raw.strip_suffix('\r') {
            Some(line) => (line, "\r"),
            None => (raw, ""),
        };
        if scanner.in_block_comment {
            scanner.scan(line);
            out.push(raw.to_string());
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(cr.to_string());
            continue;
        }

        let leading_close = trimmed.starts_with('}');
        let depth_here = if leading_close {
            depth.saturating_sub(1)
        } else {
            depth
        };
        let indent = if trimmed.starts_with('#') {
            0
        } else {
            depth_here * indent_width
        };
        out.push(format!("{}{}{}", " ".repeat(indent), trimmed, cr));

        let LineBraces { opens, closes } = scanner.scan(trimmed);
        depth = (depth + opens).saturating_sub(closes);
    }
    out.join("\n")
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/formatter/builtin.rs"]
mod tests;
