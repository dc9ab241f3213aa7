use super::*;
use std::collections::BTreeMap;

#[test]
fn default_is_dark_and_toggle_flips() {
    let mut theme = Theme::default();
    assert_eq!(theme.mode(), ThemeMode::Dark);
    assert_eq!(
        theme.color(Role::Syntax(HighlightKind::Keyword)),
        Color::Rgb { r: 0x56, g: 0x9c, b: 0xd6 }
    );

    assert_eq!(theme.toggle(), ThemeMode::Light);
    assert_eq!(
        theme.color(Role::Syntax(HighlightKind::Keyword)),
        Color::Rgb { r: 0, g: 0, b: 0xff }
    );
    assert_eq!(theme.toggle(), ThemeMode::Dark);
}

#[test]
fn parse_color_accepts_hex_and_names() {
    assert_eq!(parse_color("#ce9178"), Some(Color::Rgb { r: 0xce, g: 0x91, b: 0x78 }));
    assert_eq!(parse_color(" RED "), Some(Color::AnsiValue(1)));
    assert_eq!(parse_color("reset"), Some(Color::Reset));
    assert_eq!(parse_color("#12345"), None);
    assert_eq!(parse_color("#gg0000"), None);
    assert_eq!(parse_color(""), None);
    assert_eq!(parse_color("chartreuse"), None);
}

#[test]
fn role_names_cover_syntax_kinds() {
    for kind in HighlightKind::ALL {
        assert_eq!(Role::parse(kind.name()), Some(Role::Syntax(kind)));
    }
    assert_eq!(Role::parse("Background"), Some(Role::Background));
    assert_eq!(Role::parse("sparkles"), None);
}

#[test]
fn settings_overrides_apply_per_mode() {
    let mut dark = BTreeMap::new();
    dark.insert("keyword".to_string(), "#010203".to_string());
    dark.insert("nonsense".to_string(), "#010203".to_string());
    dark.insert("string".to_string(), "not-a-colour".to_string());
    let settings = ThemeSettings {
        mode: ThemeModeSetting::Light,
        dark,
        light: BTreeMap::new(),
    };

    let mut theme = Theme::from_settings(&settings);
    assert_eq!(theme.mode(), ThemeMode::Light);
    assert_eq!(theme.palette(), &Palette::light());

    theme.set_mode(ThemeMode::Dark);
    assert_eq!(
        theme.color(Role::Syntax(HighlightKind::Keyword)),
        Color::Rgb { r: 1, g: 2, b: 3 }
    );
    assert_eq!(
        theme.color(Role::Syntax(HighlightKind::String)),
        Palette::dark().string
    );
}

#[test]
fn apply_overrides_counts_accepted_entries() {
    let mut palette = Palette::dark();
    let mut overrides = BTreeMap::new();
    overrides.insert("background".to_string(), "black".to_string());
    overrides.insert("preprocessor".to_string(), "#ffffff".to_string());
    overrides.insert("bogus".to_string(), "#ffffff".to_string());
    assert_eq!(palette.apply_overrides(&overrides), 2);
    assert_eq!(palette.background, Color::AnsiValue(0));
}
