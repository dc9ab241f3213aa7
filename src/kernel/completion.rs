//! 代码补全：C 关键字、标准库函数签名、预处理指令、头文件、代码片段和当前文件里声明的符号
//!
//! 纯计算：`complete` 根据光标前的文本决定候选，`CompletionItem::edit` 生成一个
//! EditCommand 交给 Session，因此接受补全是一步可撤销的编辑。

use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::kernel::session::BufferId;
use crate::models::{slice_to_cow, EditCommand, Pos, TextBuffer};

pub const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

pub struct StdFunction {
    pub name: &'static str,
    pub signature: &'static str,
    pub summary: &'static str,
}

const fn std_fn(
    name: &'static str,
    signature: &'static str,
    summary: &'static str,
) -> StdFunction {
    StdFunction {
        name,
        signature,
        summary,
    }
}

pub const C_STD_FUNCTIONS: &[StdFunction] = &[
    std_fn("printf", "int printf(const char *format, ...)", "Print formatted output to stdout"),
    std_fn("scanf", "int scanf(const char *format, ...)", "Read formatted input from stdin"),
    std_fn("fprintf", "int fprintf(FILE *stream, const char *format, ...)", "Print formatted output to a file"),
    std_fn("fscanf", "int fscanf(FILE *stream, const char *format, ...)", "Read formatted input from a file"),
    std_fn("sprintf", "int sprintf(char *str, const char *format, ...)", "Print formatted output to a string"),
    std_fn("sscanf", "int sscanf(const char *str, const char *format, ...)", "Read formatted input from a string"),
    std_fn("fopen", "FILE *fopen(const char *filename, const char *mode)", "Open a file"),
    std_fn("fclose", "int fclose(FILE *stream)", "Close a file"),
    std_fn("fread", "size_t fread(void *ptr, size_t size, size_t count, FILE *stream)", "Read from a file"),
    std_fn("fwrite", "size_t fwrite(const void *ptr, size_t size, size_t count, FILE *stream)", "Write to a file"),
    std_fn("malloc", "void *malloc(size_t size)", "Allocate memory"),
    std_fn("calloc", "void *calloc(size_t nmemb, size_t size)", "Allocate and zero-initialize memory"),
    std_fn("realloc", "void *realloc(void *ptr, size_t size)", "Reallocate memory"),
    std_fn("free", "void free(void *ptr)", "Free allocated memory"),
    std_fn("memcpy", "void *memcpy(void *dest, const void *src, size_t n)", "Copy memory area"),
    std_fn("memmove", "void *memmove(void *dest, const void *src, size_t n)", "Copy possibly overlapping memory area"),
    std_fn("memset", "void *memset(void *s, int c, size_t n)", "Fill memory with a constant byte"),
    std_fn("strlen", "size_t strlen(const char *s)", "Calculate the length of a string"),
    std_fn("strcpy", "char *strcpy(char *dest, const char *src)", "Copy a string"),
    std_fn("strncpy", "char *strncpy(char *dest, const char *src, size_t n)", "Copy a string with length limit"),
    std_fn("strcat", "char *strcat(char *dest, const char *src)", "Concatenate strings"),
    std_fn("strncat", "char *strncat(char *dest, const char *src, size_t n)", "Concatenate strings with length limit"),
    std_fn("strcmp", "int strcmp(const char *s1, const char *s2)", "Compare strings"),
    std_fn("strncmp", "int strncmp(const char *s1, const char *s2, size_t n)", "Compare strings with length limit"),
    std_fn("main", "int main(int argc, char *argv[])", "Program entry point"),
];

pub const C_PREPROCESSOR: &[&str] = &[
    "#include", "#define", "#undef", "#ifdef", "#ifndef", "#if", "#else", "#elif", "#endif",
    "#error", "#pragma",
];

pub const C_STD_HEADERS: &[&str] = &[
    "stdio.h", "stdlib.h", "string.h", "math.h", "ctype.h", "time.h", "stdarg.h", "stddef.h",
    "errno.h", "float.h", "limits.h", "assert.h", "signal.h", "setjmp.h", "locale.h",
    "iso646.h", "stdbool.h",
];

/// `$0` marks where the cursor lands after insertion.
const CURSOR_MARK: &str = "$0";

pub const C_SNIPPETS: &[(&str, &str)] = &[
    ("main", "int main(int argc, char *argv[]) {\n    $0\n    return 0;\n}"),
    ("for", "for (int i = 0; i < n; i++) {\n    $0\n}"),
    ("while", "while ($0) {\n    \n}"),
    ("if", "if ($0) {\n    \n}"),
    ("else", "else {\n    $0\n}"),
    ("ifelse", "if ($0) {\n    \n} else {\n    \n}"),
    (
        "switch",
        "switch ($0) {\n    case 0:\n        break;\n    default:\n        break;\n}",
    ),
    ("struct", "struct $0 {\n    \n};"),
    ("function", "void $0(void) {\n    \n}"),
    ("printf", "printf(\"%d\\n\", $0);"),
    ("scanf", "scanf(\"%d\", &$0);"),
    (
        "fopen",
        "FILE *file = fopen(\"$0\", \"r\");\nif (file == NULL) {\n    return 1;\n}",
    ),
    (
        "malloc",
        "int *ptr = malloc(n * sizeof *ptr);\nif (ptr == NULL) {\n    return 1;\n}$0",
    ),
    ("include", "#include <stdio.h>\n#include <stdlib.h>\n$0"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Keyword,
    Function,
    Variable,
    Struct,
    Enum,
    Typedef,
    Preprocessor,
    Header,
    Snippet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: String,
    insert_text: String,
    /// Cursor position after insertion, in chars from the start of `insert_text`.
    cursor_offset: usize,
}

impl CompletionItem {
    fn plain(label: impl Into<String>, kind: CompletionKind, detail: impl Into<String>) -> Self {
        let label = label.into();
        let cursor_offset = label.chars().count();
        Self {
            insert_text: label.clone(),
            label,
            kind,
            detail: detail.into(),
            cursor_offset,
        }
    }

    /// `name()` with the cursor between the parentheses.
    fn function(name: &str, signature: impl Into<String>) -> Self {
        Self {
            label: name.to_string(),
            kind: CompletionKind::Function,
            detail: signature.into(),
            insert_text: format!("{name}()"),
            cursor_offset: name.chars().count() + 1,
        }
    }

    fn snippet(name: &str, body: &str) -> Self {
        let (before, after) = body.split_once(CURSOR_MARK).unwrap_or((body, ""));
        Self {
            label: name.to_string(),
            kind: CompletionKind::Snippet,
            detail: format!("Snippet: {name}"),
            insert_text: format!("{before}{after}"),
            cursor_offset: before.chars().count(),
        }
    }

    pub fn insert_text(&self) -> &str {
        &self.insert_text
    }

    /// Replaces `start..end` (the typed prefix). Snippet continuation lines take `indent`.
    /// Returns the edit and the cursor to place afterwards.
    pub fn edit(&self, start: Pos, end: Pos, indent: &str) -> (EditCommand, Pos) {
        let (insert, cursor_offset) = if self.kind == CompletionKind::Snippet && !indent.is_empty()
        {
            indent_continuation(&self.insert_text, self.cursor_offset, indent)
        } else {
            (self.insert_text.clone(), self.cursor_offset)
        };
        let cursor = after_insert(start, &insert, cursor_offset);
        let command = if start == end {
            EditCommand::insert(start, insert)
        } else {
            EditCommand::replace(start, end, insert)
        };
        (command, cursor)
    }
}

fn indent_continuation(text: &str, cursor_offset: usize, indent: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len() + indent.len() * 4);
    let mut offset = cursor_offset;
    let indent_chars = indent.chars().count();
    for (i, ch) in text.chars().enumerate() {
        out.push(ch);
        if ch == '\n' {
            out.push_str(indent);
            if i < cursor_offset {
                offset += indent_chars;
            }
        }
    }
    (out, offset)
}

/// Cursor after inserting `insert` at `start`, `cursor_offset` chars in.
fn after_insert(start: Pos, insert: &str, cursor_offset: usize) -> Pos {
    let head: String = insert.chars().take(cursor_offset).collect();
    match head.rsplit_once('\n') {
        Some((before, tail)) => {
            let rows = before.matches('\n').count() + 1;
            (start.0 + rows, graphemes(tail))
        }
        None => (start.0, start.1 + graphemes(&head)),
    }
}

fn graphemes(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Candidates for the word being typed at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions {
    /// Start of the text the accepted item replaces; it ends at the cursor.
    pub start: Pos,
    pub prefix: String,
    pub items: Vec<CompletionItem>,
}

/// Text on the cursor's line before the cursor.
fn line_before_cursor(text: &TextBuffer, cursor: Pos) -> String {
    let (row, col) = cursor;
    let Some(line) = text.line_slice(row) else {
        return String::new();
    };
    let end = text.grapheme_to_char_index(row, col).min(line.len_chars());
    slice_to_cow(line.slice(..end)).into_owned()
}

fn include_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"#\s*include\s*<([^>]*)$"#).ok())
        .as_ref()
}

fn directive_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#(\w*)$").ok()).as_ref()
}

/// Candidates at `cursor`, `None` when the cursor is not after something completable.
pub fn complete(text: &TextBuffer, cursor: Pos) -> Option<Completions> {
    let before = line_before_cursor(text, cursor);
    let row = cursor.0;

    if let Some(caps) = include_regex().and_then(|re| re.captures(&before)) {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let start_col = graphemes(&before[..before.len() - prefix.len()]);
        let items = C_STD_HEADERS
            .iter()
            .filter(|h| h.starts_with(prefix))
            .map(|h| CompletionItem::plain(*h, CompletionKind::Header, "Standard header"))
            .collect();
        return Some(Completions {
            start: (row, start_col),
            prefix: prefix.to_string(),
            items,
        });
    }

    if let Some(caps) = directive_regex().and_then(|re| re.captures(&before)) {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let hash = before.len() - prefix.len() - 1;
        let items = C_PREPROCESSOR
            .iter()
            .filter(|d| d[1..].starts_with(prefix))
            .map(|d| CompletionItem::plain(*d, CompletionKind::Preprocessor, "Preprocessor directive"))
            .collect();
        return Some(Completions {
            start: (row, graphemes(&before[..hash])),
            prefix: format!("#{prefix}"),
            items,
        });
    }

    let word_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(before.len(), |(i, _)| i);
    let prefix = &before[word_start..];
    if prefix.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    let symbols = scan_symbols(text);
    Some(Completions {
        start: (row, graphemes(&before[..word_start])),
        prefix: prefix.to_string(),
        items: general_items(prefix, &symbols),
    })
}

fn general_items(prefix: &str, symbols: &Symbols) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    items.extend(
        C_KEYWORDS
            .iter()
            .filter(|k| k.starts_with(prefix))
            .map(|k| CompletionItem::plain(*k, CompletionKind::Keyword, "C keyword")),
    );
    items.extend(
        C_STD_FUNCTIONS
            .iter()
            .filter(|f| f.name.starts_with(prefix))
            .map(|f| CompletionItem::function(f.name, f.signature)),
    );
    // 正在输入的词本身不算候选
    let declared = |name: &str| name.starts_with(prefix) && name != prefix;
    items.extend(
        symbols
            .functions
            .iter()
            .filter(|f| declared(&f.name) && !is_std_function(&f.name))
            .map(|f| CompletionItem::function(&f.name, f.signature.clone())),
    );
    items.extend(
        symbols
            .variables
            .iter()
            .filter(|(name, _)| declared(name))
            .map(|(name, ty)| {
                CompletionItem::plain(name, CompletionKind::Variable, format!("Variable of type {ty}"))
            }),
    );
    items.extend(
        symbols
            .structs
            .iter()
            .filter(|s| declared(s))
            .map(|s| CompletionItem::plain(s, CompletionKind::Struct, "User-defined struct")),
    );
    items.extend(
        symbols
            .enums
            .iter()
            .filter(|e| declared(e))
            .map(|e| CompletionItem::plain(e, CompletionKind::Enum, "User-defined enum")),
    );
    items.extend(
        symbols
            .typedefs
            .iter()
            .filter(|(alias, _)| declared(alias))
            .map(|(alias, original)| {
                CompletionItem::plain(alias, CompletionKind::Typedef, format!("Type alias for {original}"))
            }),
    );
    items.extend(
        C_SNIPPETS
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, body)| CompletionItem::snippet(name, body)),
    );
    items
}

fn is_std_function(name: &str) -> bool {
    C_STD_FUNCTIONS.iter().any(|f| f.name == name)
}

fn is_keyword(word: &str) -> bool {
    C_KEYWORDS.contains(&word)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub signature: String,
}

/// Declarations found in one buffer, in first-seen order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    pub functions: Vec<FunctionSymbol>,
    pub variables: Vec<(String, String)>,
    pub structs: Vec<String>,
    pub enums: Vec<String>,
    pub typedefs: Vec<(String, String)>,
}

fn regex_cell(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Regex scan for functions, variables, structs, enums and typedefs.
pub fn scan_symbols(text: &TextBuffer) -> Symbols {
    static FUNCTION: OnceLock<Option<Regex>> = OnceLock::new();
    static VARIABLE: OnceLock<Option<Regex>> = OnceLock::new();
    static STRUCT: OnceLock<Option<Regex>> = OnceLock::new();
    static ENUM: OnceLock<Option<Regex>> = OnceLock::new();
    static TYPEDEF: OnceLock<Option<Regex>> = OnceLock::new();

    let source = slice_to_cow(text.rope().slice(..));
    let mut symbols = Symbols::default();

    if let Some(re) = regex_cell(
        &FUNCTION,
        r"(?m)^[ \t]*((?:struct\s+|enum\s+|unsigned\s+|signed\s+|const\s+|static\s+)*\w+[\s\*]+)(\w+)\s*\(([^)]*)\)",
    ) {
        for caps in re.captures_iter(&source) {
            let name = &caps[2];
            let return_type = caps[1].trim();
            if is_keyword(name) || return_type == "return" || return_type == "else" {
                continue;
            }
            let params = caps[3].split_whitespace().collect::<Vec<_>>().join(" ");
            let signature = format!("{return_type} {name}({params})");
            if !symbols.functions.iter().any(|f| f.name == name) {
                symbols.functions.push(FunctionSymbol {
                    name: name.to_string(),
                    signature,
                });
            }
        }
    }

    if let Some(re) = regex_cell(
        &VARIABLE,
        r"\b(int|char|float|double|long|short|unsigned|signed|struct\s+\w+|enum\s+\w+|\w+)\s+\*?(\w+)\s*(?:\[[^\]]*\])?\s*(?:=[^;]*)?;",
    ) {
        for caps in re.captures_iter(&source) {
            let ty = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
            let name = &caps[2];
            if is_keyword(name) || matches!(ty.as_str(), "return" | "goto" | "case" | "else") {
                continue;
            }
            if !symbols.variables.iter().any(|(n, _)| n == name) {
                symbols.variables.push((name.to_string(), ty));
            }
        }
    }

    if let Some(re) = regex_cell(&STRUCT, r"\bstruct\s+(\w+)\s*\{") {
        for caps in re.captures_iter(&source) {
            push_unique(&mut symbols.structs, caps[1].to_string());
        }
    }

    if let Some(re) = regex_cell(&ENUM, r"\benum\s+(\w+)\s*\{") {
        for caps in re.captures_iter(&source) {
            push_unique(&mut symbols.enums, caps[1].to_string());
        }
    }

    if let Some(re) = regex_cell(&TYPEDEF, r"\btypedef\s+([^;{}]+?)\s+\**(\w+)\s*;") {
        for caps in re.captures_iter(&source) {
            let alias = caps[2].to_string();
            if !symbols.typedefs.iter().any(|(a, _)| *a == alias) {
                symbols.typedefs.push((alias, caps[1].trim().to_string()));
            }
        }
    }

    symbols
}

/// Signature of the call the cursor is inside, with the argument index under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHelp {
    pub name: String,
    pub signature: String,
    pub summary: String,
    pub active_parameter: usize,
}

/// Looks back on the cursor's line for the innermost unclosed `name(`.
pub fn signature_help(text: &TextBuffer, cursor: Pos) -> Option<SignatureHelp> {
    let before = line_before_cursor(text, cursor);
    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut open = None;
    for (i, ch) in before.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' if depth > 0 => depth -= 1,
            '(' => {
                open = Some(i);
                break;
            }
            ',' if depth == 0 => commas += 1,
            _ => {}
        }
    }
    let head = before[..open?].trim_end();
    let name_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)?;
    let name = &head[name_start..];

    if let Some(f) = C_STD_FUNCTIONS.iter().find(|f| f.name == name) {
        return Some(SignatureHelp {
            name: name.to_string(),
            signature: f.signature.to_string(),
            summary: f.summary.to_string(),
            active_parameter: commas,
        });
    }
    scan_symbols(text)
        .functions
        .into_iter()
        .find(|f| f.name == name)
        .map(|f| SignatureHelp {
            name: f.name,
            signature: f.signature,
            summary: "User-defined function".to_string(),
            active_parameter: commas,
        })
}

/// Open completion list, tied to the buffer version it was computed for.
#[derive(Debug, Default)]
pub struct CompletionState {
    pub items: Vec<CompletionItem>,
    pub selected: usize,
    pub prefix: String,
    anchor: Option<CompletionAnchor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionAnchor {
    pub buffer: BufferId,
    pub version: u64,
    pub start: Pos,
    pub end: Pos,
}

impl CompletionState {
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<CompletionAnchor> {
        self.anchor
    }

    /// Opens (or refilters) the list. An empty candidate list closes it.
    pub fn show(&mut self, buffer: BufferId, version: u64, cursor: Pos, completions: Completions) {
        if completions.items.is_empty() {
            self.close();
            return;
        }
        let keep = self.selected_item().map(|item| item.label.clone());
        self.items = completions.items;
        self.selected = keep
            .and_then(|label| self.items.iter().position(|i| i.label == label))
            .unwrap_or(0);
        self.prefix = completions.prefix;
        self.anchor = Some(CompletionAnchor {
            buffer,
            version,
            start: completions.start,
            end: cursor,
        });
    }

    pub fn close(&mut self) -> bool {
        let was_active = self.is_active();
        self.items.clear();
        self.selected = 0;
        self.prefix.clear();
        self.anchor = None;
        was_active
    }

    pub fn selected_item(&self) -> Option<&CompletionItem> {
        self.items.get(self.selected)
    }

    pub fn select_next(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.selected = (self.selected + 1) % self.items.len();
        true
    }

    pub fn select_prev(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.items.len() - 1);
        true
    }
}

/// Leading whitespace of `row`, used to indent multi-line snippets.
pub fn line_indent(text: &TextBuffer, row: usize) -> String {
    text.line_slice(row)
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/completion.rs"]
mod tests;
