//! 应用上下文：把 Store、快捷键、主题、高亮器和异步运行时装配在一起
//!
//! 生命周期是显式的：`init` 构建全部协作者，`shutdown` 取消运行并停止运行时。
//! 渲染层只读取状态；所有修改都经由 `dispatch`。

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use super::event::Key;
use super::Command;
use crate::kernel::services::adapters::compiler::SystemCompiler;
use crate::kernel::services::adapters::file::LocalFileSystem;
use crate::kernel::services::adapters::formatter::SystemFormatter;
use crate::kernel::services::adapters::recent::RecentFiles;
use crate::kernel::services::adapters::runtime::{AppMessage, AsyncRuntime};
use crate::kernel::services::adapters::{get_recent_files_path, KeybindingContext, KeybindingService};
use crate::kernel::services::ports::compiler::Compiler;
use crate::kernel::services::ports::file::FileSystem;
use crate::kernel::services::ports::formatter::Formatter;
use crate::kernel::services::ports::settings::Settings;
use crate::kernel::completion::{signature_help, SignatureHelp};
use crate::kernel::session::{BufferId, Session, SessionEvent};
use crate::kernel::syntax::{split_lines, HighlightSpan, Highlighter, TreeSitterHighlighter};
use crate::kernel::{Action, AppState, DispatchResult, Effect, Store};
use crate::models::EditHistoryConfig;

/// UI requests the context cannot answer on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    OpenPath,
    SavePath { id: BufferId },
    ConfirmDiscard { id: BufferId },
}

pub struct ContextOptions {
    pub settings: Settings,
    pub file_system: Arc<dyn FileSystem>,
    pub compiler: Arc<dyn Compiler>,
    pub formatter: Arc<dyn Formatter>,
    pub highlighter: Arc<dyn Highlighter>,
    /// `None` keeps the MRU list in memory only.
    pub recent_files_path: Option<PathBuf>,
}

impl ContextOptions {
    /// Local disk, autodetected system compiler and formatters, tree-sitter highlighting.
    pub fn from_settings(settings: Settings) -> Self {
        let compiler = SystemCompiler::detect(&settings.compiler);
        let formatter =
            SystemFormatter::new(&settings.formatter, usize::from(settings.editor.tab_size));
        Self {
            file_system: Arc::new(LocalFileSystem::new()),
            compiler: Arc::new(compiler),
            formatter: Arc::new(formatter),
            highlighter: Arc::new(TreeSitterHighlighter::new()),
            recent_files_path: get_recent_files_path(),
            settings,
        }
    }
}

struct HighlightCache {
    version: u64,
    lines: Vec<Vec<HighlightSpan>>,
}

pub struct ApplicationContext {
    store: Store,
    keybindings: KeybindingService,
    compiler: Arc<dyn Compiler>,
    formatter: Arc<dyn Formatter>,
    highlighter: Arc<dyn Highlighter>,
    runtime: Option<AsyncRuntime>,
    rx: Receiver<AppMessage>,
    recent: RecentFiles,
    recent_path: Option<PathBuf>,
    highlights: FxHashMap<BufferId, HighlightCache>,
    prompts: Vec<Prompt>,
    session_events: Vec<SessionEvent>,
    quit_requested: bool,
}

impl ApplicationContext {
    pub fn init(options: ContextOptions) -> std::io::Result<Self> {
        let ContextOptions {
            settings,
            file_system,
            compiler,
            formatter,
            highlighter,
            recent_files_path,
        } = options;

        let (tx, rx) = mpsc::channel();
        let runtime = AsyncRuntime::new(tx, file_system.clone())?;

        let history = EditHistoryConfig {
            max_undo: settings.editor.max_undo,
        };
        let session = Session::new(file_system).with_history_config(history);
        let store = Store::new(AppState::new(session, &settings));

        let mut keybindings = KeybindingService::with_defaults();
        let applied = keybindings.apply_rules(&settings.keybindings);
        if applied > 0 {
            tracing::info!(applied, "user keybindings loaded");
        }

        let limit = settings.editor.recent_files_limit;
        let recent = match &recent_files_path {
            Some(path) => RecentFiles::load(path, limit),
            None => RecentFiles::new(limit),
        };

        tracing::info!(
            compiler = %compiler.name(),
            formatter = %formatter.name(),
            "application context ready"
        );
        Ok(Self {
            store,
            keybindings,
            compiler,
            formatter,
            highlighter,
            runtime: Some(runtime),
            rx,
            recent,
            recent_path: recent_files_path,
            highlights: FxHashMap::default(),
            prompts: Vec::new(),
            session_events: Vec::new(),
            quit_requested: false,
        })
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn keybindings(&self) -> &KeybindingService {
        &self.keybindings
    }

    pub fn recent_files(&self) -> &[PathBuf] {
        self.recent.files()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn take_prompts(&mut self) -> Vec<Prompt> {
        std::mem::take(&mut self.prompts)
    }

    pub fn take_session_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.session_events)
    }

    /// Search bar keys first, then an open completion list, then editor and global bindings.
    pub fn keybinding_context(&self) -> KeybindingContext {
        if self.state().search.visible {
            KeybindingContext::SearchBar
        } else if self.state().completion.is_active() {
            KeybindingContext::Completion
        } else {
            KeybindingContext::Editor
        }
    }

    /// Returns whether the state changed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let context = self.keybinding_context();
        let action = match self.keybindings.resolve(context, &key).cloned() {
            Some(cmd) => match route_command(context, cmd) {
                Some(action) => action,
                None => return false,
            },
            None => match key.typed_char() {
                Some(ch) if context == KeybindingContext::SearchBar => Action::SearchAppend(ch),
                Some(ch) => Action::RunCommand(Command::InsertChar(ch)),
                None => return false,
            },
        };
        self.dispatch(action)
    }

    pub fn dispatch(&mut self, action: Action) -> bool {
        let DispatchResult {
            effects,
            state_changed,
        } = self.store.dispatch(action);
        for effect in effects {
            self.run_effect(effect);
        }
        let events = self.store.state_mut().session.drain_events();
        for event in &events {
            if let SessionEvent::BufferClosed(id) = event {
                self.highlights.remove(id);
            }
        }
        self.session_events.extend(events);
        state_changed
    }

    /// Applies every completion that has already arrived.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.dispatch(message_to_action(msg));
        }
        changed
    }

    /// Waits up to `timeout` for one completion, then drains the rest.
    /// Returns false when nothing arrived in time.
    pub fn pump_blocking(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.dispatch(message_to_action(msg));
                self.pump();
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("runtime channel closed");
                false
            }
        }
    }

    /// Starts an async open; the buffer appears after `pump`.
    pub fn open(&mut self, path: impl Into<PathBuf>, activate: bool) -> bool {
        self.dispatch(Action::OpenPath {
            path: path.into(),
            activate,
        })
    }

    /// Per-line highlight spans for `id`, recomputed when the buffer version moves.
    pub fn highlights(&mut self, id: BufferId) -> Option<&[Vec<HighlightSpan>]> {
        let buffer = self.store.state().session.buffer(id)?;
        let language = buffer.language()?;
        let version = buffer.version();
        let stale = self
            .highlights
            .get(&id)
            .map_or(true, |cache| cache.version != version);
        if stale {
            let spans = self.highlighter.highlight(buffer.rope(), language);
            let lines = split_lines(buffer.rope(), &spans);
            tracing::debug!(buffer = %id, version, spans = spans.len(), "highlighted");
            self.highlights.insert(id, HighlightCache { version, lines });
        }
        self.highlights.get(&id).map(|cache| cache.lines.as_slice())
    }

    /// Parameter hint for the call around the active buffer's cursor.
    pub fn signature_help(&self) -> Option<SignatureHelp> {
        let buffer = self.state().session.active_buffer()?;
        signature_help(buffer.text(), buffer.cursor())
    }

    /// Cancels any run and stops background work.
    pub fn shutdown(&mut self) {
        if self.store.state_mut().run.cancel() {
            tracing::info!("cancelled run on shutdown");
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown();
        }
        self.save_recent();
        tracing::info!("application context shut down");
    }

    fn run_effect(&mut self, effect: Effect) {
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!(?effect, "effect after shutdown ignored");
            return;
        };
        match effect {
            Effect::LoadFile { path, activate } => runtime.load_file(path, activate),
            Effect::WriteFile(request) => runtime.write_file(request),
            Effect::StartRun(started) => runtime.start_run(self.compiler.clone(), started),
            Effect::Format(request) => runtime.format(self.formatter.clone(), request),
            Effect::PromptOpenPath => self.prompts.push(Prompt::OpenPath),
            Effect::PromptSavePath { id } => self.prompts.push(Prompt::SavePath { id }),
            Effect::ConfirmDiscard { id } => self.prompts.push(Prompt::ConfirmDiscard { id }),
            Effect::RecordRecentFile(path) => {
                if self.recent.add(&path) {
                    self.save_recent();
                }
            }
            Effect::Quit => self.quit_requested = true,
        }
    }

    fn save_recent(&self) {
        let Some(path) = self.recent_path.as_deref() else {
            return;
        };
        if let Err(e) = write_recent(&self.recent, path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to save recent files");
        }
    }
}

impl Drop for ApplicationContext {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            self.shutdown();
        }
    }
}

fn write_recent(recent: &RecentFiles, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    recent.save(path)
}

/// 搜索栏有焦点时：退格编辑查询，补全和其余编辑/光标命令忽略
fn route_command(context: KeybindingContext, cmd: Command) -> Option<Action> {
    if context != KeybindingContext::SearchBar {
        return Some(Action::RunCommand(cmd));
    }
    match cmd {
        Command::DeleteBackward => Some(Action::SearchBackspace),
        Command::TriggerCompletion
        | Command::SelectNextCompletion
        | Command::SelectPrevCompletion
        | Command::AcceptCompletion => None,
        Command::Undo | Command::Redo => Some(Action::RunCommand(cmd)),
        cmd if cmd.is_edit_command() || cmd.is_cursor_command() => None,
        cmd => Some(Action::RunCommand(cmd)),
    }
}

fn message_to_action(msg: AppMessage) -> Action {
    match msg {
        AppMessage::FileLoaded {
            path,
            bytes,
            activate,
        } => Action::FileLoaded {
            path,
            bytes,
            activate,
        },
        AppMessage::FileLoadFailed { path, error } => Action::FileLoadFailed { path, error },
        AppMessage::FileSaved { request, result } => Action::FileSaved { request, result },
        AppMessage::RunOutput { run_id, line } => Action::RunOutput { run_id, line },
        AppMessage::RunFinished { run_id, result } => Action::RunFinished { run_id, result },
        AppMessage::FormatFinished {
            buffer,
            version,
            result,
        } => Action::FormatFinished {
            buffer,
            version,
            result,
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/context.rs"]
mod tests;
