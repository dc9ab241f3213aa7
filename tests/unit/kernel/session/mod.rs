use super::*;
use crate::kernel::services::adapters::file::MemoryFileSystem;
use crate::models::EditError;

fn session_with(fs: MemoryFileSystem) -> (Session, Arc<MemoryFileSystem>) {
    let fs = Arc::new(fs);
    (Session::new(fs.clone()), fs)
}

fn empty_session() -> (Session, Arc<MemoryFileSystem>) {
    session_with(MemoryFileSystem::new())
}

fn text_of(session: &Session, id: BufferId) -> String {
    session.buffer(id).unwrap().rope().to_string()
}

fn insert(session: &mut Session, id: BufferId, at: Pos, text: &str) {
    assert!(session.apply_edit(id, &EditCommand::insert(at, text)).unwrap());
}

#[test]
fn undo_all_edits_restores_content_and_cursor() {
    let (mut s, _) = session_with(MemoryFileSystem::new().with_file("/w/a.c", "abc\n"));
    let id = s.open(Path::new("/w/a.c"), true).unwrap();
    s.set_cursor(id, (0, 2)).unwrap();
    let before_text = text_of(&s, id);
    let before_cursor = s.buffer(id).unwrap().cursor();

    insert(&mut s, id, (0, 2), "XY");
    insert(&mut s, id, (1, 0), "int main(){}\n");
    s.apply_edit(id, &EditCommand::delete((0, 0), (0, 1))).unwrap();
    s.apply_edit(id, &EditCommand::replace((1, 4), (1, 8), "foo"))
        .unwrap();
    let edits = 4;
    assert_ne!(text_of(&s, id), before_text);

    for _ in 0..edits {
        assert!(s.undo(id).unwrap());
    }
    assert_eq!(text_of(&s, id), before_text);
    assert_eq!(s.buffer(id).unwrap().cursor(), before_cursor);
    assert!(!s.undo(id).unwrap());
}

#[test]
fn edit_undo_redo_equals_direct_edit() {
    let (mut direct, _) = empty_session();
    let a = direct.new_buffer();
    insert(&mut direct, a, (0, 0), "int x = 1;");

    let (mut s, _) = empty_session();
    let b = s.new_buffer();
    insert(&mut s, b, (0, 0), "int x = 1;");
    assert!(s.undo(b).unwrap());
    assert_eq!(text_of(&s, b), "");
    assert!(s.redo(b).unwrap());

    assert_eq!(text_of(&s, b), text_of(&direct, a));
    assert_eq!(
        s.buffer(b).unwrap().cursor(),
        direct.buffer(a).unwrap().cursor()
    );
    assert!(!s.redo(b).unwrap());
}

#[test]
fn dirty_flag_follows_save_point_scenario() {
    let (mut s, fs) = empty_session();
    let a = s.new_buffer();
    assert!(!s.is_dirty(a).unwrap());

    insert(&mut s, a, (0, 0), "int main(){}");
    assert!(s.is_dirty(a).unwrap());

    let path = s.save(a, Some(Path::new("/w/a.c"))).unwrap();
    assert_eq!(path, PathBuf::from("/w/a.c"));
    assert!(!s.is_dirty(a).unwrap());
    assert_eq!(
        fs.contents_string(Path::new("/w/a.c")).as_deref(),
        Some("int main(){}")
    );
    assert_eq!(s.buffer(a).unwrap().title(), "a.c");

    s.undo(a).unwrap();
    assert!(s.is_dirty(a).unwrap());
    s.redo(a).unwrap();
    assert!(!s.is_dirty(a).unwrap());
}

#[test]
fn edit_after_save_is_dirty_and_undo_returns_to_clean() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "a");
    s.save(a, Some(Path::new("/w/a.c"))).unwrap();
    insert(&mut s, a, (0, 1), "b");
    assert!(s.is_dirty(a).unwrap());
    s.undo(a).unwrap();
    assert!(!s.is_dirty(a).unwrap());
    s.undo(a).unwrap();
    assert!(s.is_dirty(a).unwrap());
}

#[test]
fn save_point_unreachable_after_branching_edit() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "a");
    insert(&mut s, a, (0, 1), "b");
    s.save(a, Some(Path::new("/w/a.c"))).unwrap();
    s.undo(a).unwrap();
    insert(&mut s, a, (0, 1), "c");
    assert!(s.is_dirty(a).unwrap());
    s.undo(a).unwrap();
    assert!(s.is_dirty(a).unwrap());
}

#[test]
fn close_dirty_without_force_fails_and_keeps_buffers() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    let b = s.new_buffer();
    s.activate(a).unwrap();
    insert(&mut s, a, (0, 0), "x");

    let err = s.close(a, false).unwrap_err();
    assert!(matches!(err, SessionError::UnsavedChanges(id) if id == a));
    assert_eq!(s.buffer_ids(), vec![a, b]);
    assert_eq!(s.active_id(), Some(a));
    assert!(s.is_dirty(a).unwrap());

    s.close(a, true).unwrap();
    assert_eq!(s.buffer_ids(), vec![b]);
}

#[test]
fn next_tab_wraps_from_last_to_first() {
    let (mut s, _) = session_with(
        MemoryFileSystem::new()
            .with_file("/w/a.c", "")
            .with_file("/w/b.c", ""),
    );
    let a = s.open(Path::new("/w/a.c"), false).unwrap();
    let b = s.open(Path::new("/w/b.c"), false).unwrap();
    s.activate(b).unwrap();
    assert_eq!(s.next_tab(), Some(a));
    assert_eq!(s.active_id(), Some(a));
    assert_eq!(s.prev_tab(), Some(b));
    assert_eq!(s.prev_tab(), Some(a));
}

#[test]
fn activate_index_ignores_out_of_range() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    let b = s.new_buffer();
    assert_eq!(s.activate_index(1), Some(b));
    assert_eq!(s.activate_index(5), None);
    assert_eq!(s.active_id(), Some(b));
    assert_eq!(s.activate_index(0), Some(a));
}

#[test]
fn open_does_not_activate_unless_requested() {
    let (mut s, _) = session_with(
        MemoryFileSystem::new()
            .with_file("/w/a.c", "int a;\n")
            .with_file("/w/b.c", "int b;\n"),
    );
    let a = s.open(Path::new("/w/a.c"), false).unwrap();
    assert_eq!(s.active_id(), None);
    assert!(!s.is_dirty(a).unwrap());
    let b = s.open(Path::new("/w/b.c"), true).unwrap();
    assert_eq!(s.active_id(), Some(b));
    assert_eq!(s.buffer_ids(), vec![a, b]);
    assert_eq!(text_of(&s, a), "int a;\n");
}

#[test]
fn opening_same_path_twice_reuses_buffer() {
    let (mut s, fs) = session_with(MemoryFileSystem::new().with_file("/w/a.c", "v1"));
    let a = s.open(Path::new("/w/a.c"), false).unwrap();
    insert(&mut s, a, (0, 2), "!");
    fs.insert("/w/a.c", "v2 on disk");

    let again = s.open(Path::new("/w/a.c"), true).unwrap();
    assert_eq!(again, a);
    assert_eq!(s.len(), 1);
    assert_eq!(s.active_id(), Some(a));
    assert_eq!(text_of(&s, a), "v1!");
}

#[test]
fn open_missing_file_is_io_error_and_session_unchanged() {
    let (mut s, _) = empty_session();
    let existing = s.new_buffer();
    s.drain_events();
    let err = s.open(Path::new("/w/missing.c"), true).unwrap_err();
    assert!(matches!(err, SessionError::Io(FileError::NotFound(_))));
    assert_eq!(s.buffer_ids(), vec![existing]);
    assert_eq!(s.active_id(), None);
    assert!(s.drain_events().is_empty());
}

#[test]
fn unknown_id_is_not_found() {
    let (mut s, _) = empty_session();
    let ghost = BufferId::new(42);
    assert!(matches!(s.activate(ghost), Err(SessionError::NotFound(_))));
    assert!(matches!(
        s.apply_edit(ghost, &EditCommand::insert((0, 0), "x")),
        Err(SessionError::NotFound(_))
    ));
    assert!(matches!(s.undo(ghost), Err(SessionError::NotFound(_))));
    assert!(matches!(s.redo(ghost), Err(SessionError::NotFound(_))));
    assert!(matches!(s.save(ghost, None), Err(SessionError::NotFound(_))));
    assert!(matches!(s.close(ghost, true), Err(SessionError::NotFound(_))));
}

#[test]
fn out_of_range_edit_leaves_buffer_untouched() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "abc");
    let err = s
        .apply_edit(a, &EditCommand::delete((0, 1), (3, 0)))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidRange(EditError::OutOfBounds { .. })
    ));
    assert_eq!(text_of(&s, a), "abc");
    assert_eq!(s.buffer(a).unwrap().history().undo_depth(), 1);
}

#[test]
fn empty_edit_is_a_no_op() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    assert!(!s.apply_edit(a, &EditCommand::insert((0, 0), "")).unwrap());
    assert!(!s.is_dirty(a).unwrap());
    assert_eq!(s.buffer(a).unwrap().version(), 0);
}

#[test]
fn failed_save_keeps_dirty_state_and_history() {
    let (mut s, fs) = session_with(MemoryFileSystem::new().with_file("/w/a.c", "old"));
    let a = s.open(Path::new("/w/a.c"), true).unwrap();
    insert(&mut s, a, (0, 3), " new");
    fs.set_read_only("/w/a.c", true);

    let err = s.save(a, None).unwrap_err();
    assert!(matches!(err, SessionError::Io(FileError::Io { .. })));
    assert!(s.is_dirty(a).unwrap());
    assert_eq!(s.buffer(a).unwrap().history().undo_depth(), 1);
    assert_eq!(fs.contents_string(Path::new("/w/a.c")).as_deref(), Some("old"));
}

#[test]
fn untitled_save_without_path_needs_a_path() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    assert!(matches!(s.save(a, None), Err(SessionError::NoPath(_))));
}

#[test]
fn async_save_marks_the_captured_state_clean() {
    let (mut s, fs) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "one");
    let request = s.begin_save(a, Some(Path::new("/w/a.c"))).unwrap();
    insert(&mut s, a, (0, 3), " two");

    let bytes = request.to_bytes();
    fs.write(&request.path, &bytes).unwrap();
    s.finish_save(request, Ok(())).unwrap();

    assert!(s.is_dirty(a).unwrap());
    s.undo(a).unwrap();
    assert!(!s.is_dirty(a).unwrap());
    assert_eq!(fs.contents_string(Path::new("/w/a.c")).as_deref(), Some("one"));
}

#[test]
fn async_save_failure_reports_io_error() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "x");
    let request = s.begin_save(a, Some(Path::new("/w/a.c"))).unwrap();
    let err = s
        .finish_save(
            request,
            Err(FileError::NotFound(PathBuf::from("/w/a.c"))),
        )
        .unwrap_err();
    assert!(matches!(err, SessionError::Io(_)));
    assert!(s.is_dirty(a).unwrap());
    assert!(s.buffer(a).unwrap().path().is_none());
}

#[test]
fn closing_active_buffer_moves_to_previous_tab() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    let b = s.new_buffer();
    let c = s.new_buffer();

    s.activate(b).unwrap();
    s.close(b, false).unwrap();
    assert_eq!(s.active_id(), Some(a));
    assert_eq!(s.buffer_ids(), vec![a, c]);

    s.close(a, false).unwrap();
    assert_eq!(s.active_id(), Some(c));

    s.close(c, false).unwrap();
    assert_eq!(s.active_id(), None);
    assert!(s.is_empty());
}

#[test]
fn closing_inactive_buffer_keeps_active() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    let b = s.new_buffer();
    s.activate(b).unwrap();
    s.close(a, false).unwrap();
    assert_eq!(s.active_id(), Some(b));
}

#[test]
fn buffer_ids_are_not_reused() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    s.close(a, false).unwrap();
    let b = s.new_buffer();
    assert_ne!(a, b);
    assert_eq!(s.buffer(b).unwrap().title(), "Untitled-2");
}

#[test]
fn snapshot_is_isolated_from_later_edits() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    insert(&mut s, a, (0, 0), "int main(void) { return 1; }\n");
    let snapshot = s.snapshot(a).unwrap();
    insert(&mut s, a, (0, 0), "// edited\n");

    assert_eq!(snapshot.text.to_string(), "int main(void) { return 1; }\n");
    assert_eq!(snapshot.buffer, a);
    assert!(snapshot.version < s.buffer(a).unwrap().version());
}

#[test]
fn histories_are_independent_per_buffer() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    let b = s.new_buffer();
    insert(&mut s, a, (0, 0), "a");
    insert(&mut s, b, (0, 0), "b");
    s.undo(a).unwrap();
    assert_eq!(text_of(&s, a), "");
    assert_eq!(text_of(&s, b), "b");
    assert!(s.is_dirty(b).unwrap());
}

#[test]
fn events_report_lifecycle() {
    let (mut s, _) = empty_session();
    let a = s.new_buffer();
    s.activate(a).unwrap();
    insert(&mut s, a, (0, 0), "x");
    s.save(a, Some(Path::new("/w/x.c"))).unwrap();
    s.close(a, false).unwrap();

    assert_eq!(
        s.drain_events(),
        vec![
            SessionEvent::BufferOpened(a),
            SessionEvent::ActiveChanged(Some(a)),
            SessionEvent::ContentChanged { buffer: a, version: 1 },
            SessionEvent::Saved {
                buffer: a,
                path: PathBuf::from("/w/x.c")
            },
            SessionEvent::BufferClosed(a),
            SessionEvent::ActiveChanged(None),
        ]
    );
    assert!(s.drain_events().is_empty());
}

#[test]
fn has_unsaved_changes_reports_any_dirty_buffer() {
    let (mut s, _) = empty_session();
    let _a = s.new_buffer();
    let b = s.new_buffer();
    assert!(!s.has_unsaved_changes());
    insert(&mut s, b, (0, 0), "x");
    assert!(s.has_unsaved_changes());
    assert_eq!(s.dirty_buffers(), vec![b]);
}

#[test]
fn latin1_files_decode_without_loss_of_bytes() {
    let (mut s, _) = session_with(MemoryFileSystem::new().with_file("/w/l.c", vec![b'c', 0xE9]));
    let id = s.open(Path::new("/w/l.c"), false).unwrap();
    assert_eq!(text_of(&s, id), "c\u{e9}");
}

#[test]
fn save_as_renames_and_detects_language() {
    let (mut s, fs) = session_with(MemoryFileSystem::new().with_file("/w/notes.txt", "int x;"));
    let id = s.open(Path::new("/w/notes.txt"), true).unwrap();
    assert_eq!(s.buffer(id).unwrap().language(), None);
    s.save(id, Some(Path::new("/w/x.c"))).unwrap();
    let buffer = s.buffer(id).unwrap();
    assert_eq!(buffer.path(), Some(Path::new("/w/x.c")));
    assert_eq!(buffer.language(), Some(crate::kernel::syntax::LanguageId::C));
    assert_eq!(s.find_by_path(Path::new("/w/x.c")), Some(id));
    assert!(fs.exists(Path::new("/w/x.c")));
}
