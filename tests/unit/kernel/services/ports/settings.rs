use super::*;

#[test]
fn empty_object_deserializes_to_defaults() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings.editor.tab_size, 4);
    assert_eq!(settings.editor.recent_files_limit, 10);
    assert_eq!(settings.theme.mode, ThemeModeSetting::Dark);
    assert!(settings.compiler.path.is_none());
    assert_eq!(settings.compiler.output_capacity, 5000);
    assert_eq!(settings.formatter.style, "Google");
    assert!(settings.formatter.fallback);
}

#[test]
fn formatter_section_is_partial() {
    let settings: Settings =
        serde_json::from_str(r#"{"formatter":{"style":"LLVM","fallback":false}}"#).unwrap();
    assert_eq!(settings.formatter.style, "LLVM");
    assert_eq!(settings.formatter.timeout_secs, 5);
    assert!(!settings.formatter.fallback);
}

#[test]
fn theme_overrides_are_keyed_by_role() {
    let settings: Settings =
        serde_json::from_str(r##"{"theme":{"mode":"light","light":{"keyword":"#112233"}}}"##)
            .unwrap();
    assert_eq!(settings.theme.mode, ThemeModeSetting::Light);
    assert_eq!(
        settings.theme.light.get("keyword").map(String::as_str),
        Some("#112233")
    );
    assert!(settings.theme.dark.is_empty());
}

#[test]
fn default_settings_serialize_without_empty_overrides() {
    let json = serde_json::to_string(&Settings::default()).unwrap();
    assert!(!json.contains("\"dark\""));
    assert!(!json.contains("\"path\""));
}
