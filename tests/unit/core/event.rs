use super::*;

#[test]
fn test_backtab_normalizes_to_shift_tab() {
    let event = KeyEvent::new(KeyCode::BackTab, KeyModifiers::CONTROL | KeyModifiers::SHIFT);
    assert_eq!(Key::from(event), Key::ctrl_shift(KeyCode::Tab));
}

#[test]
fn test_ctrl_uppercase_becomes_ctrl_shift() {
    let event = KeyEvent::new(KeyCode::Char('S'), KeyModifiers::CONTROL);
    assert_eq!(Key::from(event), Key::ctrl_shift(KeyCode::Char('s')));
}

#[test]
fn test_typed_char() {
    assert_eq!(Key::simple(KeyCode::Char('a')).typed_char(), Some('a'));
    assert_eq!(Key::shift(KeyCode::Char('A')).typed_char(), Some('A'));
    assert_eq!(Key::ctrl(KeyCode::Char('a')).typed_char(), None);
    assert_eq!(Key::simple(KeyCode::F(5)).typed_char(), None);
}
