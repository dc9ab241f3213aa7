use super::*;

#[test]
fn untitled_buffer_is_clean_and_pathless() {
    let buffer = Buffer::untitled(
        BufferId::new(1),
        "Untitled-1".to_string(),
        EditHistoryConfig::default(),
    );
    assert!(buffer.path().is_none());
    assert!(!buffer.is_dirty());
    assert_eq!(buffer.display_title(), "Untitled-1");
    assert_eq!(buffer.language(), None);
}

#[test]
fn display_title_marks_dirty() {
    let mut buffer = Buffer::from_file(
        BufferId::new(2),
        PathBuf::from("/src/main.c"),
        "",
        EditHistoryConfig::default(),
    );
    assert_eq!(buffer.title(), "main.c");
    assert_eq!(buffer.language(), Some(LanguageId::C));

    assert!(buffer.apply(&EditCommand::insert((0, 0), "x")).unwrap());
    assert_eq!(buffer.display_title(), "● main.c");
    assert!(buffer.undo());
    assert_eq!(buffer.display_title(), "main.c");
}

#[test]
fn version_bumps_on_every_content_change() {
    let mut buffer = Buffer::untitled(
        BufferId::new(3),
        "t".to_string(),
        EditHistoryConfig::default(),
    );
    buffer.apply(&EditCommand::insert((0, 0), "ab")).unwrap();
    buffer.undo();
    buffer.redo();
    assert_eq!(buffer.version(), 3);
    assert!(!buffer.redo());
    assert_eq!(buffer.version(), 3);
}

#[test]
fn history_limit_applies() {
    let mut buffer = Buffer::untitled(
        BufferId::new(4),
        "t".to_string(),
        EditHistoryConfig { max_undo: 2 },
    );
    for i in 0..5 {
        buffer
            .apply(&EditCommand::insert((0, i), "x"))
            .unwrap();
    }
    assert_eq!(buffer.history().undo_depth(), 2);
}

#[test]
fn buffer_id_display_is_raw_number() {
    assert_eq!(BufferId::new(7).to_string(), "7");
    assert_eq!(BufferId::new(7).raw(), 7);
}
