use super::*;
use crate::kernel::session::BufferId;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

fn request(text: &str) -> FormatRequest {
    FormatRequest {
        buffer: BufferId::new(1),
        version: 3,
        file_name: "main.c".to_string(),
        text: text.to_string(),
    }
}

#[test]
fn tool_arguments_follow_the_configured_style() {
    let source = Path::new("/tmp/x/main.c");
    assert_eq!(
        FormatTool::ClangFormat.args("Google", source),
        vec!["-style=Google".to_string(), "/tmp/x/main.c".to_string()]
    );
    let astyle = FormatTool::Astyle.args("Google", source);
    assert_eq!(astyle[0], "--style=google");
    assert!(astyle.contains(&"--suffix=none".to_string()));
    assert_eq!(FormatTool::Indent.args("Google", source), vec!["/tmp/x/main.c".to_string()]);
}

#[test]
fn tools_are_tried_in_fixed_order() {
    let formatter = SystemFormatter::new(&FormatterSettings::default(), 4);
    assert_eq!(formatter.name(), "clang-format,astyle,indent");
}

#[test]
fn without_tools_falls_back_to_builtin_reindent() {
    let formatter = SystemFormatter::new(&FormatterSettings::default(), 4).with_tools(Vec::new());
    let formatted = block_on(formatter.format(request("int main(void) {\nreturn 0;\n}\n"))).unwrap();
    assert_eq!(formatted.tool, "builtin");
    assert_eq!(formatted.text, "int main(void) {\n    return 0;\n}\n");
}

#[test]
fn disabled_fallback_reports_unavailable() {
    let settings = FormatterSettings {
        fallback: false,
        ..FormatterSettings::default()
    };
    let formatter = SystemFormatter::new(&settings, 4).with_tools(Vec::new());
    let err = block_on(formatter.format(request("int x;\n"))).unwrap_err();
    assert!(matches!(err, FormatError::Unavailable));
    assert!(err.to_string().contains("clang-format"));
}
