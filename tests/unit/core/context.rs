use super::*;
use crate::kernel::services::adapters::compiler::{Script, ScriptedCompiler};
use crate::kernel::services::adapters::file::MemoryFileSystem;
use crate::kernel::services::adapters::formatter::BuiltinFormatter;
use crate::kernel::services::ports::compiler::{OutputLine, OutputStream, RunStatus};
use crate::kernel::{NotificationLevel, RunReport};
use crate::models::{EditCommand, Selection};
use crossterm::event::KeyCode;

fn ctx_with(fs: Arc<MemoryFileSystem>, compiler: ScriptedCompiler) -> ApplicationContext {
    ApplicationContext::init(ContextOptions {
        settings: Settings::default(),
        file_system: fs,
        compiler: Arc::new(compiler),
        formatter: Arc::new(BuiltinFormatter::new(4)),
        highlighter: Arc::new(TreeSitterHighlighter::new()),
        recent_files_path: None,
    })
    .unwrap()
}

fn wait_until(ctx: &mut ApplicationContext, done: impl Fn(&ApplicationContext) -> bool) -> bool {
    for _ in 0..100 {
        if done(ctx) {
            return true;
        }
        ctx.pump_blocking(Duration::from_millis(50));
    }
    done(ctx)
}

fn type_str(ctx: &mut ApplicationContext, text: &str) {
    for ch in text.chars() {
        ctx.handle_key(Key::simple(KeyCode::Char(ch)));
    }
}

fn active_text(ctx: &ApplicationContext) -> String {
    ctx.state()
        .session
        .active_buffer()
        .map(|b| b.rope().to_string())
        .unwrap_or_default()
}

fn open_sync(ctx: &mut ApplicationContext, path: &str) -> BufferId {
    ctx.open(path, true);
    let path = PathBuf::from(path);
    assert!(wait_until(ctx, |c| c.state().session.find_by_path(&path).is_some()));
    ctx.state().session.find_by_path(&path).unwrap()
}

#[test]
fn open_loads_in_background_and_records_recent() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/main.c", "int main;\n"));
    let mut ctx = ctx_with(fs, ScriptedCompiler::new());

    assert!(!ctx.open("/w/main.c", true));
    assert!(ctx.state().session.is_empty());

    let id = open_sync(&mut ctx, "/w/main.c");
    assert_eq!(ctx.state().session.active_id(), Some(id));
    assert_eq!(active_text(&ctx), "int main;\n");
    assert_eq!(ctx.recent_files(), &[PathBuf::from("/w/main.c")]);
    assert!(ctx
        .take_session_events()
        .contains(&SessionEvent::BufferOpened(id)));
}

#[test]
fn opening_a_missing_file_raises_an_error_notification() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.open("/w/nope.c", true);
    assert!(wait_until(&mut ctx, |c| !c.state().notifications.is_empty()));
    assert_eq!(ctx.state().notifications[0].level, NotificationLevel::Error);
    assert!(ctx.state().session.is_empty());
}

#[test]
fn typing_inserts_and_ctrl_z_undoes() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    assert!(ctx.handle_key(Key::ctrl(KeyCode::Char('n'))));

    type_str(&mut ctx, "ab");
    assert_eq!(active_text(&ctx), "ab");
    assert!(ctx.state().session.has_unsaved_changes());

    assert!(ctx.handle_key(Key::ctrl(KeyCode::Char('z'))));
    assert_eq!(active_text(&ctx), "a");
    assert!(ctx.handle_key(Key::ctrl(KeyCode::Char('y'))));
    assert_eq!(active_text(&ctx), "ab");
}

#[test]
fn saving_untitled_prompts_for_path_then_writes() {
    let fs = Arc::new(MemoryFileSystem::new());
    let mut ctx = ctx_with(fs.clone(), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    type_str(&mut ctx, "x");
    let id = ctx.state().session.active_id().unwrap();

    ctx.handle_key(Key::ctrl(KeyCode::Char('s')));
    assert_eq!(ctx.take_prompts(), vec![Prompt::SavePath { id }]);

    ctx.dispatch(Action::SaveAs {
        id,
        path: PathBuf::from("/w/new.c"),
    });
    assert!(wait_until(&mut ctx, |c| !c.state().session.has_unsaved_changes()));
    assert_eq!(fs.contents_string(Path::new("/w/new.c")).as_deref(), Some("x"));
    let buffer = ctx.state().session.buffer(id).unwrap();
    assert_eq!(buffer.path(), Some(Path::new("/w/new.c")));
    assert_eq!(ctx.recent_files(), &[PathBuf::from("/w/new.c")]);
}

#[test]
fn compile_and_run_streams_output_then_finishes() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/main.c", "int main(void){return 0;}\n"));
    let compiler = ScriptedCompiler::new();
    compiler.push(Script::exit(
        0,
        vec![OutputLine::new(OutputStream::Stdout, "hello")],
    ));
    let mut ctx = ctx_with(fs, compiler.clone());
    open_sync(&mut ctx, "/w/main.c");

    assert!(ctx.handle_key(Key::simple(KeyCode::F(5))));
    assert!(ctx.state().run.is_running());
    assert!(wait_until(&mut ctx, |c| !c.state().run.is_running()));

    let texts: Vec<String> = ctx.state().run.output().map(|l| l.text.clone()).collect();
    assert_eq!(texts.first().map(String::as_str), Some("[INFO] Compiling main.c..."));
    assert!(texts.iter().any(|t| t == "hello"));
    assert_eq!(
        texts.last().map(String::as_str),
        Some("[SUCCESS] Program exited with code 0")
    );
    assert!(matches!(
        ctx.state().run.last_report(),
        Some(RunReport::Finished(outcome)) if outcome.status == RunStatus::Exited(0)
    ));
    assert_eq!(compiler.received().len(), 1);
}

#[test]
fn second_run_warns_and_stop_cancels() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/loop.c", "int main(void){for(;;);}\n"));
    let compiler = ScriptedCompiler::new();
    compiler.push(Script::until_cancelled(Vec::new()));
    let mut ctx = ctx_with(fs, compiler);
    open_sync(&mut ctx, "/w/loop.c");

    ctx.handle_key(Key::simple(KeyCode::F(5)));
    ctx.handle_key(Key::simple(KeyCode::F(5)));
    let warning = ctx
        .state()
        .notifications
        .iter()
        .find(|n| n.level == NotificationLevel::Warning)
        .map(|n| n.message.clone());
    assert_eq!(warning.as_deref(), Some("A program is already running"));
    assert!(ctx.state().run.is_running());

    assert!(ctx.handle_key(Key::shift(KeyCode::F(5))));
    assert!(wait_until(&mut ctx, |c| !c.state().run.is_running()));
    assert!(matches!(
        ctx.state().run.last_report(),
        Some(RunReport::Finished(outcome)) if outcome.status == RunStatus::Cancelled
    ));
}

#[test]
fn run_compiles_the_snapshot_taken_at_start() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/m.c", "disk\n"));
    let compiler = ScriptedCompiler::new();
    compiler.push(Script::until_cancelled(Vec::new()));
    let mut ctx = ctx_with(fs, compiler.clone());
    open_sync(&mut ctx, "/w/m.c");

    type_str(&mut ctx, "mem");
    assert!(ctx.handle_key(Key::simple(KeyCode::F(5))));
    type_str(&mut ctx, "later");
    assert!(ctx.handle_key(Key::shift(KeyCode::F(5))));
    assert!(wait_until(&mut ctx, |c| !c.state().run.is_running()));

    let received = compiler.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].text.to_string(), "memdisk\n");
    assert_eq!(received[0].path.as_deref(), Some(Path::new("/w/m.c")));
    assert_eq!(active_text(&ctx), "memlaterdisk\n");
}

#[test]
fn closing_dirty_buffer_asks_before_discarding() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    type_str(&mut ctx, "x");
    let id = ctx.state().session.active_id().unwrap();

    ctx.handle_key(Key::ctrl(KeyCode::Char('w')));
    assert_eq!(ctx.take_prompts(), vec![Prompt::ConfirmDiscard { id }]);
    assert_eq!(ctx.state().session.len(), 1);

    ctx.dispatch(Action::ResolveDiscard { discard: false });
    assert_eq!(ctx.state().session.len(), 1);

    ctx.handle_key(Key::ctrl(KeyCode::Char('w')));
    ctx.take_prompts();
    ctx.dispatch(Action::ResolveDiscard { discard: true });
    assert!(ctx.state().session.is_empty());
    assert!(ctx
        .take_session_events()
        .contains(&SessionEvent::BufferClosed(id)));
}

#[test]
fn search_bar_captures_typing_and_walks_matches() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/a.c", "int a; int b;\n"));
    let mut ctx = ctx_with(fs, ScriptedCompiler::new());
    let id = open_sync(&mut ctx, "/w/a.c");

    ctx.handle_key(Key::ctrl(KeyCode::Char('f')));
    assert_eq!(ctx.keybinding_context(), KeybindingContext::SearchBar);
    type_str(&mut ctx, "inx");
    ctx.handle_key(Key::simple(KeyCode::Backspace));
    type_str(&mut ctx, "t");
    assert_eq!(ctx.state().search.query.pattern, "int");
    assert_eq!(ctx.state().search.matches.len(), 2);
    // 查询输入不改动缓冲区
    assert_eq!(active_text(&ctx), "int a; int b;\n");

    ctx.handle_key(Key::simple(KeyCode::Enter));
    let selection = ctx.state().session.buffer(id).unwrap().selection().copied();
    assert_eq!(selection, Some(Selection::new((0, 0), (0, 3))));

    ctx.handle_key(Key::simple(KeyCode::Enter));
    let selection = ctx.state().session.buffer(id).unwrap().selection().copied();
    assert_eq!(selection, Some(Selection::new((0, 7), (0, 10))));

    ctx.handle_key(Key::simple(KeyCode::Esc));
    assert!(!ctx.state().search.visible);
    assert_eq!(ctx.keybinding_context(), KeybindingContext::Editor);
}

#[test]
fn replace_current_from_search_bar() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/a.c", "int a; int b;\n"));
    let mut ctx = ctx_with(fs, ScriptedCompiler::new());
    open_sync(&mut ctx, "/w/a.c");

    ctx.handle_key(Key::ctrl(KeyCode::Char('h')));
    assert!(ctx.state().search.replace_mode);
    type_str(&mut ctx, "int");
    ctx.dispatch(Action::SetReplacement("long".to_string()));

    ctx.handle_key(Key::ctrl(KeyCode::Enter));
    assert_eq!(active_text(&ctx), "long a; int b;\n");
    assert_eq!(ctx.state().search.matches.len(), 1);
}

#[test]
fn highlights_follow_buffer_version() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/a.c", "int x;\n"));
    let mut ctx = ctx_with(fs, ScriptedCompiler::new());
    let id = open_sync(&mut ctx, "/w/a.c");

    let lines = ctx.highlights(id).unwrap();
    assert!(!lines[0].is_empty());
    let before = lines.len();

    ctx.dispatch(Action::Edit {
        id,
        command: EditCommand::insert((1, 0), "int y;\n"),
    });
    let after = ctx.highlights(id).unwrap().len();
    assert_eq!(after, before + 1);
}

#[test]
fn untitled_buffers_have_no_highlights() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    let id = ctx.state().session.active_id().unwrap();
    assert!(ctx.highlights(id).is_none());
}

#[test]
fn quit_with_unsaved_changes_needs_confirmation() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    type_str(&mut ctx, "x");
    let id = ctx.state().session.active_id().unwrap();

    ctx.handle_key(Key::ctrl(KeyCode::Char('q')));
    assert!(!ctx.quit_requested());
    assert_eq!(ctx.take_prompts(), vec![Prompt::ConfirmDiscard { id }]);

    ctx.dispatch(Action::ResolveDiscard { discard: true });
    assert!(ctx.quit_requested());
}

#[test]
fn shutdown_is_idempotent() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.shutdown();
    ctx.shutdown();
    assert!(!ctx.open("/w/a.c", true));
}

#[test]
fn ctrl_shift_f_formats_in_the_background() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/w/a.c", "int f() {\nreturn 1;\n}\n"));
    let mut ctx = ctx_with(fs, ScriptedCompiler::new());
    let id = open_sync(&mut ctx, "/w/a.c");

    ctx.handle_key(Key::ctrl_shift(KeyCode::Char('f')));
    assert!(wait_until(&mut ctx, |c| !c.state().notifications.is_empty()));
    assert_eq!(active_text(&ctx), "int f() {\n    return 1;\n}\n");
    assert_eq!(
        ctx.state().notifications[0].message,
        "Formatted with builtin"
    );
    assert!(ctx.state().session.is_dirty(id).unwrap());

    ctx.handle_key(Key::ctrl(KeyCode::Char('z')));
    assert_eq!(active_text(&ctx), "int f() {\nreturn 1;\n}\n");
}

#[test]
fn completion_list_takes_arrows_and_tab() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    type_str(&mut ctx, "pri");

    assert!(ctx.handle_key(Key::ctrl(KeyCode::Char(' '))));
    assert_eq!(ctx.keybinding_context(), KeybindingContext::Completion);
    ctx.handle_key(Key::simple(KeyCode::Down));
    ctx.handle_key(Key::simple(KeyCode::Up));
    // 列表打开时 Down/Up 不移动光标
    assert_eq!(ctx.state().session.active_buffer().unwrap().cursor(), (0, 3));

    ctx.handle_key(Key::simple(KeyCode::Tab));
    assert_eq!(active_text(&ctx), "printf()");
    assert_eq!(ctx.keybinding_context(), KeybindingContext::Editor);

    let help = ctx.signature_help().unwrap();
    assert_eq!(help.name, "printf");
    assert_eq!(help.active_parameter, 0);
}

#[test]
fn escape_closes_completion_without_editing() {
    let mut ctx = ctx_with(Arc::new(MemoryFileSystem::new()), ScriptedCompiler::new());
    ctx.handle_key(Key::ctrl(KeyCode::Char('n')));
    type_str(&mut ctx, "wh");
    ctx.handle_key(Key::ctrl(KeyCode::Char(' ')));
    assert_eq!(ctx.keybinding_context(), KeybindingContext::Completion);

    type_str(&mut ctx, "i");
    assert_eq!(ctx.state().completion.prefix, "whi");

    ctx.handle_key(Key::simple(KeyCode::Esc));
    assert_eq!(ctx.keybinding_context(), KeybindingContext::Editor);
    assert_eq!(active_text(&ctx), "whi");

    ctx.handle_key(Key::simple(KeyCode::Enter));
    assert_eq!(active_text(&ctx), "whi\n");
}
