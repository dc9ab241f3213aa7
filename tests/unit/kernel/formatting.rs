use super::*;

fn apply(text: &str, formatted: &str) -> (Option<EditCommand>, String) {
    let mut buffer = TextBuffer::from_text(text);
    let command = format_edit(&buffer, formatted);
    if let Some(command) = &command {
        buffer.apply_command(command).unwrap();
    }
    (command, buffer.text())
}

#[test]
fn identical_text_needs_no_edit() {
    let (command, _) = apply("int x;\n", "int x;\n");
    assert!(command.is_none());
}

#[test]
fn only_changed_lines_are_replaced() {
    let (command, result) = apply(
        "int main(void) {\nreturn 0;\n}\n",
        "int main(void) {\n    return 0;\n}\n",
    );
    assert_eq!(
        command,
        Some(EditCommand::replace((1, 0), (2, 0), "    return 0;\n"))
    );
    assert_eq!(result, "int main(void) {\n    return 0;\n}\n");
}

#[test]
fn appended_and_removed_tails() {
    let (command, result) = apply("a\n", "a\nb\n");
    assert_eq!(command, Some(EditCommand::insert((1, 0), "b\n")));
    assert_eq!(result, "a\nb\n");

    let (command, result) = apply("a\nb\n", "a\n");
    assert_eq!(command, Some(EditCommand::delete((1, 0), (2, 0))));
    assert_eq!(result, "a\n");
}

#[test]
fn missing_final_newline_is_handled() {
    let (_, result) = apply("{\nx;\n}", "{\n    x;\n}\n");
    assert_eq!(result, "{\n    x;\n}\n");
}
