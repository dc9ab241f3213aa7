use std::path::PathBuf;

use crate::core::Command;
use crate::kernel::completion::{complete, line_indent};
use crate::kernel::editing::{cursor_target, edit_for};
use crate::kernel::formatting::format_edit;
use crate::kernel::search::{find_next, replace_all, replace_current, MatchSource, SearchQuery};
use crate::kernel::services::ports::compiler::{CompilerError, OutputLine, RunOutcome};
use crate::kernel::services::ports::file::FileError;
use crate::kernel::services::ports::formatter::{FormatError, FormatRequest, Formatted};
use crate::kernel::session::{Buffer, BufferId, SaveRequest, Session, SessionError};
use crate::models::{EditCommand, Selection};

use super::{Action, AppState, Effect, NotificationLevel, PendingAction};

pub struct DispatchResult {
    pub effects: Vec<Effect>,
    pub state_changed: bool,
}

impl DispatchResult {
    fn none() -> Self {
        Self {
            effects: Vec::new(),
            state_changed: false,
        }
    }

    fn changed(state_changed: bool) -> Self {
        Self {
            effects: Vec::new(),
            state_changed,
        }
    }

    fn effect(effect: Effect, state_changed: bool) -> Self {
        Self {
            effects: vec![effect],
            state_changed,
        }
    }
}

pub struct Store {
    state: AppState,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        match action {
            Action::RunCommand(cmd) => self.dispatch_command(cmd),
            Action::OpenPath { path, activate } => self.open_path(path, activate),
            Action::SaveAs { id, path } => match self.state.session.begin_save(id, Some(&path)) {
                Ok(request) => DispatchResult::effect(Effect::WriteFile(request), false),
                Err(e) => self.surface(e),
            },
            Action::CloseBuffer { id, force } => self.close(id, force),
            Action::Edit { id, command } => self.edit(id, &command),
            Action::SetCursor { id, pos } => match self.state.session.set_cursor(id, pos) {
                Ok(()) => DispatchResult::changed(true),
                Err(e) => self.surface(e),
            },
            Action::SetSelection { id, selection } => {
                match self.state.session.set_selection(id, selection) {
                    Ok(()) => DispatchResult::changed(true),
                    Err(e) => self.surface(e),
                }
            }
            Action::ResolveDiscard { discard } => self.resolve_discard(discard),
            Action::DismissNotification(id) => {
                DispatchResult::changed(self.state.dismiss_notification(id))
            }

            Action::SearchSet(query) => self.set_query(query),
            Action::SearchAppend(ch) => {
                let mut query = self.state.search.query.clone();
                query.pattern.push(ch);
                self.set_query(query)
            }
            Action::SearchBackspace => {
                let mut query = self.state.search.query.clone();
                if query.pattern.pop().is_none() {
                    return DispatchResult::none();
                }
                self.set_query(query)
            }
            Action::SearchToggleCaseSensitive => {
                let query = self.state.search.query.clone();
                let flipped = !query.case_sensitive;
                self.set_query(query.case_sensitive(flipped))
            }
            Action::SearchToggleRegex => {
                let query = self.state.search.query.clone();
                let flipped = !query.use_regex;
                self.set_query(query.regex(flipped))
            }
            Action::SetReplacement(text) => {
                let changed = self.state.search.replacement != text;
                self.state.search.replacement = text;
                DispatchResult::changed(changed)
            }
            Action::ReplaceCurrent => self.replace_current(),
            Action::ReplaceAll => self.replace_all(),

            Action::FileLoaded {
                path,
                bytes,
                activate,
            } => {
                let id = self.state.session.open_loaded(path.clone(), &bytes, activate);
                self.refresh_search(id);
                DispatchResult::effect(Effect::RecordRecentFile(path), true)
            }
            Action::FileLoadFailed { path, error } => self.file_load_failed(path, error),
            Action::FileSaved { request, result } => self.file_saved(request, result),
            Action::RunOutput { run_id, line } => self.run_output(run_id, line),
            Action::RunFinished { run_id, result } => self.run_finished(run_id, result),
            Action::FormatFinished {
                buffer,
                version,
                result,
            } => self.format_finished(buffer, version, result),
        }
    }

    fn dispatch_command(&mut self, cmd: Command) -> DispatchResult {
        match cmd {
            Command::NewFile => {
                self.state.session.new_buffer();
                DispatchResult::changed(true)
            }
            Command::OpenFile => DispatchResult::effect(Effect::PromptOpenPath, false),
            Command::Save => {
                let Some(id) = self.state.session.active_id() else {
                    return DispatchResult::none();
                };
                match self.state.session.begin_save(id, None) {
                    Ok(request) => DispatchResult::effect(Effect::WriteFile(request), false),
                    Err(e) => self.surface(e),
                }
            }
            Command::SaveAs => match self.state.session.active_id() {
                Some(id) => DispatchResult::effect(Effect::PromptSavePath { id }, false),
                None => DispatchResult::none(),
            },
            Command::CloseTab => match self.state.session.active_id() {
                Some(id) => self.close(id, false),
                None => DispatchResult::none(),
            },
            Command::NextTab => self.switched(|s| s.next_tab()),
            Command::PrevTab => self.switched(|s| s.prev_tab()),
            Command::ActivateTab(n) => {
                let index = usize::from(n.max(1)) - 1;
                self.switched(|s| s.activate_index(index))
            }

            Command::Undo | Command::Redo => {
                let Some(id) = self.state.session.active_id() else {
                    return DispatchResult::none();
                };
                self.state.completion.close();
                let result = if cmd == Command::Undo {
                    self.state.session.undo(id)
                } else {
                    self.state.session.redo(id)
                };
                match result {
                    Ok(changed) => {
                        if changed {
                            self.refresh_search(id);
                        }
                        DispatchResult::changed(changed)
                    }
                    Err(e) => self.surface(e),
                }
            }
            cmd if cmd.is_cursor_command() => {
                let Some(buffer) = self.state.session.active_buffer() else {
                    return DispatchResult::none();
                };
                let id = buffer.id();
                let before = buffer.cursor();
                let Some(target) = cursor_target(buffer.text(), &cmd) else {
                    return DispatchResult::none();
                };
                let closed = self.state.completion.close();
                match self.state.session.set_cursor(id, target) {
                    Ok(()) => DispatchResult::changed(target != before || closed),
                    Err(e) => self.surface(e),
                }
            }
            cmd if cmd.is_edit_command() => {
                let Some(buffer) = self.state.session.active_buffer() else {
                    return DispatchResult::none();
                };
                let id = buffer.id();
                match edit_for(buffer.text(), &cmd, self.state.tab_size) {
                    Some(command) => self.edit(id, &command),
                    None => DispatchResult::none(),
                }
            }

            Command::Find | Command::Replace => {
                self.state.search.open(cmd == Command::Replace);
                if let Some(id) = self.state.session.active_id() {
                    self.refresh_search(id);
                }
                DispatchResult::changed(true)
            }
            Command::FindNext => self.find(true),
            Command::FindPrev => self.find(false),
            Command::ReplaceCurrent => self.replace_current(),
            Command::ReplaceAll => self.replace_all(),

            Command::TriggerCompletion => self.trigger_completion(),
            Command::SelectNextCompletion => {
                DispatchResult::changed(self.state.completion.select_next())
            }
            Command::SelectPrevCompletion => {
                DispatchResult::changed(self.state.completion.select_prev())
            }
            Command::AcceptCompletion => self.accept_completion(),
            Command::FormatDocument => self.format_document(),

            Command::CompileAndRun => self.compile_and_run(),
            Command::StopRun => DispatchResult::changed(self.state.run.cancel()),
            Command::ToggleTheme => {
                self.state.theme.toggle();
                DispatchResult::changed(true)
            }
            Command::Escape => {
                if self.state.completion.close() {
                    return DispatchResult::changed(true);
                }
                if self.state.search.visible {
                    self.state.search.close();
                    return DispatchResult::changed(true);
                }
                match self.state.notifications.last().map(|n| n.id) {
                    Some(id) => DispatchResult::changed(self.state.dismiss_notification(id)),
                    None => DispatchResult::none(),
                }
            }
            Command::Quit => {
                let dirty = self.state.session.dirty_buffers();
                match dirty.first() {
                    Some(&id) => {
                        self.state.pending = Some(PendingAction::Quit);
                        DispatchResult::effect(Effect::ConfirmDiscard { id }, true)
                    }
                    None => DispatchResult::effect(Effect::Quit, false),
                }
            }
            Command::Custom(name) => {
                tracing::debug!(command = %name, "unhandled custom command");
                DispatchResult::none()
            }
            // 其余编辑/光标命令已由上面的守卫分支处理
            _ => DispatchResult::none(),
        }
    }

    fn switched(&mut self, f: impl FnOnce(&mut Session) -> Option<BufferId>) -> DispatchResult {
        let before = self.state.session.active_id();
        let after = f(&mut self.state.session);
        if after.is_some() && after != before {
            self.state.completion.close();
            if let Some(id) = after {
                self.refresh_search(id);
            }
            return DispatchResult::changed(true);
        }
        DispatchResult::none()
    }

    fn open_path(&mut self, path: PathBuf, activate: bool) -> DispatchResult {
        if let Some(id) = self.state.session.find_by_path(&path) {
            tracing::debug!(buffer = %id, path = %path.display(), "already open");
            if activate {
                return match self.state.session.activate(id) {
                    Ok(()) => DispatchResult::changed(true),
                    Err(e) => self.surface(e),
                };
            }
            return DispatchResult::none();
        }
        DispatchResult::effect(Effect::LoadFile { path, activate }, false)
    }

    fn edit(&mut self, id: BufferId, command: &EditCommand) -> DispatchResult {
        match self.state.session.apply_edit(id, command) {
            Ok(changed) => {
                if changed {
                    self.refresh_search(id);
                    self.refresh_completion(id);
                }
                DispatchResult::changed(changed)
            }
            Err(e) => self.surface(e),
        }
    }

    fn close(&mut self, id: BufferId, force: bool) -> DispatchResult {
        match self.state.session.close(id, force) {
            Ok(()) => {
                if self.state.completion.anchor().is_some_and(|a| a.buffer == id) {
                    self.state.completion.close();
                }
                if self.state.pending == Some(PendingAction::CloseBuffer(id)) {
                    self.state.pending = None;
                }
                if self.state.session.is_empty() {
                    self.state.search.close();
                } else if let Some(active) = self.state.session.active_id() {
                    self.refresh_search(active);
                }
                DispatchResult::changed(true)
            }
            Err(SessionError::UnsavedChanges(id)) => {
                self.state.pending = Some(PendingAction::CloseBuffer(id));
                DispatchResult::effect(Effect::ConfirmDiscard { id }, true)
            }
            Err(e) => self.surface(e),
        }
    }

    fn resolve_discard(&mut self, discard: bool) -> DispatchResult {
        let Some(pending) = self.state.pending.take() else {
            return DispatchResult::none();
        };
        if !discard {
            return DispatchResult::changed(true);
        }
        match pending {
            PendingAction::CloseBuffer(id) => self.close(id, true),
            PendingAction::Quit => DispatchResult::effect(Effect::Quit, true),
        }
    }

    // ==================== 查找替换 ====================

    fn set_query(&mut self, query: SearchQuery) -> DispatchResult {
        let Some(buffer) = self.state.session.active_buffer() else {
            self.state.search.query = query;
            self.state.search.invalidate();
            return DispatchResult::changed(true);
        };
        let cursor = buffer.text().pos_to_char(buffer.cursor());
        self.state
            .search
            .set_query(query, match_source(buffer), buffer.text());
        // 输入时跳到光标之后的第一个匹配，但不移动光标
        self.state.search.current = find_next(&self.state.search.matches, cursor);
        DispatchResult::changed(true)
    }

    fn refresh_search(&mut self, id: BufferId) {
        if !self.state.search.visible || self.state.session.active_id() != Some(id) {
            return;
        }
        if let Some(buffer) = self.state.session.buffer(id) {
            self.state.search.refresh(match_source(buffer), buffer.text());
        }
    }

    fn find(&mut self, forward: bool) -> DispatchResult {
        let Some(buffer) = self.state.session.active_buffer() else {
            return DispatchResult::none();
        };
        let id = buffer.id();
        let text = buffer.text();
        // 搜索栏隐藏时编辑不会刷新匹配；按版本判断是否过期
        let source = match_source(buffer);
        if !self.state.search.is_fresh(source) {
            self.state.search.refresh(source, text);
        }
        let from = if forward {
            text.pos_to_char(buffer.cursor())
        } else {
            let start = buffer
                .selection()
                .map(|s| s.range().0)
                .unwrap_or_else(|| buffer.cursor());
            text.pos_to_char(start)
        };
        let found = if forward {
            self.state.search.next(from)
        } else {
            self.state.search.prev(from)
        };
        let Some(m) = found else {
            let pattern = self.state.search.query.pattern.clone();
            if !pattern.is_empty() && self.state.search.error.is_none() {
                self.state
                    .notify(NotificationLevel::Info, format!("No matches for '{pattern}'"));
            }
            return DispatchResult::changed(true);
        };
        match self
            .state
            .session
            .set_selection(id, Some(Selection::new(m.start_pos, m.end_pos)))
        {
            Ok(()) => DispatchResult::changed(true),
            Err(e) => self.surface(e),
        }
    }

    fn replace_current(&mut self) -> DispatchResult {
        let Some(buffer) = self.state.session.active_buffer() else {
            return DispatchResult::none();
        };
        let id = buffer.id();
        let source = match_source(buffer);
        if !self.state.search.is_fresh(source) {
            self.state.search.refresh(source, buffer.text());
        }
        let target = match self.state.search.current_match() {
            Some(m) => *m,
            None => {
                let from = buffer.text().pos_to_char(buffer.cursor());
                match self.state.search.next(from) {
                    Some(m) => m,
                    None => return DispatchResult::none(),
                }
            }
        };
        let command = match replace_current(
            buffer.text(),
            &self.state.search.query,
            &target,
            &self.state.search.replacement,
        ) {
            Ok(command) => command,
            Err(e) => {
                self.state.search.error = Some(e.to_string());
                return DispatchResult::changed(true);
            }
        };
        let result = self.edit(id, &command);
        // 光标停在替换文本之后；继续指向下一个匹配
        if let Some(buffer) = self.state.session.buffer(id) {
            let source = match_source(buffer);
            if !self.state.search.is_fresh(source) {
                self.state.search.refresh(source, buffer.text());
            }
            let from = buffer.text().pos_to_char(buffer.cursor());
            self.state.search.next(from);
        }
        result
    }

    fn replace_all(&mut self) -> DispatchResult {
        let Some(buffer) = self.state.session.active_buffer() else {
            return DispatchResult::none();
        };
        let id = buffer.id();
        let replaced = replace_all(
            buffer.text(),
            &self.state.search.query,
            &self.state.search.replacement,
        );
        match replaced {
            Ok(Some((command, count))) => {
                let result = self.edit(id, &command);
                self.state.notify(
                    NotificationLevel::Info,
                    format!("Replaced {count} occurrence(s)"),
                );
                DispatchResult::changed(result.state_changed || count > 0)
            }
            Ok(None) => DispatchResult::none(),
            Err(e) => {
                self.state.search.error = Some(e.to_string());
                DispatchResult::changed(true)
            }
        }
    }

    // ==================== 补全 ====================

    fn trigger_completion(&mut self) -> DispatchResult {
        let Some(buffer) = self.state.session.active_buffer() else {
            return DispatchResult::none();
        };
        let (id, version, cursor) = (buffer.id(), buffer.version(), buffer.cursor());
        match complete(buffer.text(), cursor) {
            Some(completions) if !completions.items.is_empty() => {
                self.state.completion.show(id, version, cursor, completions);
                DispatchResult::changed(true)
            }
            _ => DispatchResult::changed(self.state.completion.close()),
        }
    }

    /// 列表打开时编辑会重新过滤；词首位置变了（输入空格、退格越过词首）就关闭
    fn refresh_completion(&mut self, id: BufferId) {
        let Some(anchor) = self.state.completion.anchor() else {
            return;
        };
        if anchor.buffer != id {
            return;
        }
        let Some(buffer) = self.state.session.buffer(id) else {
            self.state.completion.close();
            return;
        };
        let (version, cursor) = (buffer.version(), buffer.cursor());
        match complete(buffer.text(), cursor) {
            Some(completions) if completions.start == anchor.start => {
                self.state.completion.show(id, version, cursor, completions);
            }
            _ => {
                self.state.completion.close();
            }
        }
    }

    fn accept_completion(&mut self) -> DispatchResult {
        let Some(anchor) = self.state.completion.anchor() else {
            return DispatchResult::none();
        };
        let item = self.state.completion.selected_item().cloned();
        self.state.completion.close();
        let (Some(item), Some(buffer)) = (item, self.state.session.buffer(anchor.buffer)) else {
            return DispatchResult::changed(true);
        };
        if buffer.version() != anchor.version || buffer.cursor() != anchor.end {
            tracing::debug!(buffer = %anchor.buffer, "stale completion dropped");
            return DispatchResult::changed(true);
        }
        let indent = line_indent(buffer.text(), anchor.start.0);
        let (command, cursor) = item.edit(anchor.start, anchor.end, &indent);
        let result = self.edit(anchor.buffer, &command);
        if !result.state_changed {
            return result;
        }
        match self.state.session.set_cursor(anchor.buffer, cursor) {
            Ok(()) => DispatchResult::changed(true),
            Err(e) => self.surface(e),
        }
    }

    // ==================== 格式化 ====================

    fn format_document(&mut self) -> DispatchResult {
        let Some(id) = self.state.session.active_id() else {
            return DispatchResult::none();
        };
        match self.state.session.snapshot(id) {
            Ok(snapshot) => {
                let request = FormatRequest::from_snapshot(&snapshot);
                tracing::debug!(buffer = %id, version = request.version, "format requested");
                DispatchResult::effect(Effect::Format(request), false)
            }
            Err(e) => self.surface(e),
        }
    }

    fn format_finished(
        &mut self,
        id: BufferId,
        version: u64,
        result: Result<Formatted, FormatError>,
    ) -> DispatchResult {
        let formatted = match result {
            Ok(formatted) => formatted,
            Err(e) => {
                self.state.notify(NotificationLevel::Error, e.to_string());
                return DispatchResult::changed(true);
            }
        };
        let Some(buffer) = self.state.session.buffer(id) else {
            tracing::debug!(buffer = %id, "formatted buffer is gone");
            return DispatchResult::none();
        };
        if buffer.version() != version {
            self.state.notify(
                NotificationLevel::Warning,
                "Document changed while formatting; result discarded",
            );
            return DispatchResult::changed(true);
        }
        let Some(command) = format_edit(buffer.text(), &formatted.text) else {
            self.state
                .notify(NotificationLevel::Info, "Document is already formatted");
            return DispatchResult::changed(true);
        };
        let cursor = buffer.cursor();
        self.state.completion.close();
        let result = self.edit(id, &command);
        if !result.state_changed {
            return result;
        }
        // 光标尽量留在原来的行列
        if let Some(buffer) = self.state.session.buffer(id) {
            let pos = buffer.text().clamp_pos(cursor);
            if let Err(e) = self.state.session.set_cursor(id, pos) {
                return self.surface(e);
            }
        }
        self.state.notify(
            NotificationLevel::Info,
            format!("Formatted with {}", formatted.tool),
        );
        DispatchResult::changed(true)
    }

    // ==================== 编译运行 ====================

    fn compile_and_run(&mut self) -> DispatchResult {
        let Some(id) = self.state.session.active_id() else {
            return DispatchResult::none();
        };
        let started = self
            .state
            .session
            .snapshot(id)
            .and_then(|snapshot| self.state.run.begin(snapshot));
        match started {
            Ok(started) => DispatchResult::effect(Effect::StartRun(started), true),
            Err(e) => self.surface(e),
        }
    }

    fn run_output(&mut self, run_id: u64, line: OutputLine) -> DispatchResult {
        DispatchResult::changed(self.state.run.push_output(run_id, line))
    }

    fn run_finished(
        &mut self,
        run_id: u64,
        result: Result<RunOutcome, CompilerError>,
    ) -> DispatchResult {
        if let Err(e) = &result {
            self.state.notify(NotificationLevel::Error, e.to_string());
        }
        DispatchResult::changed(self.state.run.finish(run_id, result))
    }

    // ==================== IO 完成 ====================

    fn file_load_failed(&mut self, path: PathBuf, error: FileError) -> DispatchResult {
        tracing::warn!(path = %path.display(), error = %error, "open failed");
        self.surface(SessionError::Io(error))
    }

    fn file_saved(
        &mut self,
        request: SaveRequest,
        result: Result<(), FileError>,
    ) -> DispatchResult {
        let path = request.path.clone();
        match self.state.session.finish_save(request, result) {
            Ok(()) => DispatchResult::effect(Effect::RecordRecentFile(path), true),
            Err(e) => self.surface(e),
        }
    }

    /// Maps a session error onto what the user sees.
    fn surface(&mut self, err: SessionError) -> DispatchResult {
        match err {
            SessionError::NotFound(id) => {
                tracing::error!(buffer = %id, "action targets a buffer that is not open");
                DispatchResult::none()
            }
            SessionError::UnsavedChanges(id) => {
                DispatchResult::effect(Effect::ConfirmDiscard { id }, false)
            }
            SessionError::NoPath(id) => DispatchResult::effect(Effect::PromptSavePath { id }, false),
            SessionError::CompilerBusy => {
                self.state
                    .notify(NotificationLevel::Warning, "A program is already running");
                DispatchResult::changed(true)
            }
            SessionError::InvalidRange(e) => {
                tracing::warn!(error = %e, "edit rejected");
                self.state.notify(NotificationLevel::Warning, e.to_string());
                DispatchResult::changed(true)
            }
            SessionError::Io(e) => {
                self.state.notify(NotificationLevel::Error, e.to_string());
                DispatchResult::changed(true)
            }
        }
    }
}

fn match_source(buffer: &Buffer) -> MatchSource {
    (buffer.id(), buffer.version())
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/store.rs"]
mod tests;
