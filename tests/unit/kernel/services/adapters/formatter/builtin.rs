use super::*;

#[test]
fn nested_blocks_are_indented_by_depth() {
    let code = "int main(void) {\nif (x) {\ny();\n} else {\nz();\n}\nreturn 0;\n}\n";
    assert_eq!(
        reindent(code, 4),
        "int main(void) {\n    if (x) {\n        y();\n    } else {\n        z();\n    }\n    return 0;\n}\n"
    );
}

#[test]
fn braces_in_strings_and_comments_do_not_count() {
    let code = "void f(void) {\nputs(\"{\"); // {\nchar c = '}';\n}\n";
    assert_eq!(
        reindent(code, 2),
        "void f(void) {\n  puts(\"{\"); // {\n  char c = '}';\n}\n"
    );
}

#[test]
fn block_comment_bodies_are_left_alone() {
    let code = "/* header\n   keep   this\n*/\nint x;\n";
    assert_eq!(reindent(code, 4), code);
}

#[test]
fn preprocessor_lines_stay_in_column_zero() {
    let code = "void f(void) {\n    #ifdef DEBUG\n  log();\n#endif\n}";
    assert_eq!(
        reindent(code, 4),
        "void f(void) {\n#ifdef DEBUG\n    log();\n#endif\n}"
    );
}

#[test]
fn crlf_line_endings_survive() {
    assert_eq!(reindent("{\r\nx;\r\n}\r\n", 4), "{\r\n    x;\r\n}\r\n");
}

#[test]
fn unbalanced_closers_do_not_underflow() {
    assert_eq!(reindent("}\n}\nx;", 4), "}\n}\nx;");
}

#[test]
fn formatter_port_reports_builtin_tool() {
    let formatter = BuiltinFormatter::default();
    let request = FormatRequest {
        buffer: crate::kernel::session::BufferId::new(1),
        version: 0,
        file_name: "a.c".to_string(),
        text: "{\nx;\n}".to_string(),
    };
    let formatted = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(formatter.format(request))
        .unwrap();
    assert_eq!(formatted.tool, "builtin");
    assert_eq!(formatted.text, "{\n    x;\n}");
}
