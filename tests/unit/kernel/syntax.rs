use super::*;

fn kinds_of(source: &str) -> Vec<(String, HighlightKind)> {
    let rope = Rope::from_str(source);
    TreeSitterHighlighter::new()
        .highlight(&rope, LanguageId::C)
        .into_iter()
        .map(|s| (source[s.start..s.end].to_string(), s.kind))
        .collect()
}

fn has(spans: &[(String, HighlightKind)], text: &str, kind: HighlightKind) -> bool {
    spans.iter().any(|(t, k)| t == text && *k == kind)
}

#[test]
fn language_detected_from_extension() {
    assert_eq!(LanguageId::from_path(Path::new("a.c")), Some(LanguageId::C));
    assert_eq!(LanguageId::from_path(Path::new("inc/a.h")), Some(LanguageId::C));
    assert_eq!(LanguageId::from_path(Path::new("notes.txt")), None);
    assert_eq!(LanguageId::from_path(Path::new("Makefile")), None);
}

#[test]
fn highlights_basic_c_program() {
    let src = "#include <stdio.h>\n// entry\nint main(void) {\n    printf(\"hi %d\\n\", 42);\n    return 0;\n}\n";
    let spans = kinds_of(src);

    assert!(has(&spans, "#include", HighlightKind::Preprocessor));
    assert!(has(&spans, "<stdio.h>", HighlightKind::String));
    assert!(has(&spans, "// entry", HighlightKind::Comment));
    assert!(has(&spans, "int", HighlightKind::Type));
    assert!(has(&spans, "main", HighlightKind::Function));
    assert!(has(&spans, "printf", HighlightKind::Function));
    assert!(has(&spans, "\"hi %d\\n\"", HighlightKind::String));
    assert!(has(&spans, "42", HighlightKind::Number));
    assert!(has(&spans, "return", HighlightKind::Keyword));
}

#[test]
fn spans_are_sorted_and_disjoint() {
    let src = "struct p { int x; };\nstatic int f(int a) { if (a) return a; return -1; }\n";
    let rope = Rope::from_str(src);
    let spans = TreeSitterHighlighter::new().highlight(&rope, LanguageId::C);
    assert!(!spans.is_empty());
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}

#[test]
fn split_lines_makes_offsets_line_relative() {
    let src = "/* a\nb */ int x;\n";
    let rope = Rope::from_str(src);
    let spans = TreeSitterHighlighter::new().highlight(&rope, LanguageId::C);
    let lines = split_lines(&rope, &spans);
    assert_eq!(lines.len(), rope.len_lines());

    assert_eq!(lines[0][0].kind, HighlightKind::Comment);
    assert_eq!((lines[0][0].start, lines[0][0].end), (0, 5));
    assert_eq!(lines[1][0].kind, HighlightKind::Comment);
    assert_eq!((lines[1][0].start, lines[1][0].end), (0, 4));
    assert!(lines[1]
        .iter()
        .any(|s| s.kind == HighlightKind::Type && (s.start, s.end) == (5, 8)));
}

#[test]
fn split_lines_merges_adjacent_same_kind() {
    let rope = Rope::from_str("abcdef");
    let spans = [
        HighlightSpan { start: 0, end: 2, kind: HighlightKind::Keyword },
        HighlightSpan { start: 2, end: 4, kind: HighlightKind::Keyword },
        HighlightSpan { start: 4, end: 6, kind: HighlightKind::Type },
    ];
    let lines = split_lines(&rope, &spans);
    assert_eq!(lines[0].len(), 2);
    assert_eq!((lines[0][0].start, lines[0][0].end), (0, 4));
}
