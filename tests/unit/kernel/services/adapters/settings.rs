use super::*;
use crate::kernel::services::ports::settings::ThemeModeSetting;
use tempfile::tempdir;

#[test]
fn parse_keybinding_reads_modifiers_and_function_keys() {
    assert_eq!(
        parse_keybinding("ctrl+shift+s"),
        Some(Key::ctrl_shift(KeyCode::Char('s')))
    );
    assert_eq!(parse_keybinding("F5"), Some(Key::simple(KeyCode::F(5))));
    assert_eq!(
        parse_keybinding("shift+f5"),
        Some(Key::shift(KeyCode::F(5)))
    );
    assert_eq!(parse_keybinding("alt+3"), Some(Key::alt(KeyCode::Char('3'))));
    assert_eq!(parse_keybinding("ctrl + tab"), Some(Key::ctrl(KeyCode::Tab)));
}

#[test]
fn parse_keybinding_uppercase_letter_implies_shift() {
    assert_eq!(
        parse_keybinding("ctrl+S"),
        Some(Key::ctrl_shift(KeyCode::Char('s')))
    );
}

#[test]
fn parse_keybinding_rejects_garbage() {
    assert_eq!(parse_keybinding(""), None);
    assert_eq!(parse_keybinding("ctrl+"), None);
    assert_eq!(parse_keybinding("ctrl+nope"), None);
}

#[test]
fn load_settings_from_missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let settings = load_settings_from(&dir.path().join("settings.json"));
    assert_eq!(settings.editor.tab_size, 4);
    assert_eq!(settings.compiler.compile_timeout_secs, 10);
    assert!(settings.keybindings.is_empty());
}

#[test]
fn load_settings_from_invalid_json_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    let settings = load_settings_from(&path);
    assert_eq!(settings.theme.mode, ThemeModeSetting::Dark);
}

#[test]
fn partial_settings_fill_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"theme":{"mode":"light"},"keybindings":[{"key":"f6","command":"run"}]}"#,
    )
    .unwrap();
    let settings = load_settings_from(&path);
    assert_eq!(settings.theme.mode, ThemeModeSetting::Light);
    assert_eq!(settings.editor.max_undo, 1000);
    assert_eq!(settings.keybindings.len(), 1);
    assert_eq!(
        parse_command(&settings.keybindings[0].command),
        Command::CompileAndRun
    );
}

#[test]
fn write_then_read_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut settings = Settings::default();
    settings.compiler.extra_flags = vec!["-O2".to_string()];
    write_settings(&path, &settings).unwrap();
    let loaded = read_settings(&path).unwrap();
    assert_eq!(loaded.compiler.extra_flags, vec!["-O2".to_string()]);
}
