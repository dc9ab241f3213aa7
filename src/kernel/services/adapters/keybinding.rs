//! 快捷键：按键 → 命令（支持上下文）

use crate::core::event::Key;
use crate::core::event::{KeyCode, KeyModifiers};
use crate::core::Command;
use crate::kernel::services::ports::settings::KeybindingRule;
use rustc_hash::FxHashMap;

use super::settings::parse_keybinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeybindingContext {
    Global,
    Editor,
    SearchBar,
    /// Completion list open over the editor.
    Completion,
}

impl KeybindingContext {
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "global" => Some(Self::Global),
            "editor" => Some(Self::Editor),
            "searchbar" | "search" | "editor.searchbar" => Some(Self::SearchBar),
            "completion" | "suggest" | "editor.completion" => Some(Self::Completion),
            _ => None,
        }
    }
}

pub struct KeybindingService {
    global: FxHashMap<Key, Command>,
    editor: FxHashMap<Key, Command>,
    search_bar: FxHashMap<Key, Command>,
    completion: FxHashMap<Key, Command>,
}

impl KeybindingService {
    pub fn new() -> Self {
        Self::with_defaults()
    }

    pub fn with_defaults() -> Self {
        Self {
            global: default_global_keybindings(),
            editor: default_editor_keybindings(),
            search_bar: default_search_bar_keybindings(),
            completion: default_completion_keybindings(),
        }
    }

    /// Context map first, then the parent chain (SearchBar/Completion → Editor → Global).
    pub fn resolve(&self, context: KeybindingContext, key: &Key) -> Option<&Command> {
        match context {
            KeybindingContext::Global => self.global.get(key),
            KeybindingContext::Editor => self.editor.get(key).or_else(|| self.global.get(key)),
            KeybindingContext::SearchBar => self
                .search_bar
                .get(key)
                .or_else(|| self.editor.get(key))
                .or_else(|| self.global.get(key)),
            KeybindingContext::Completion => self
                .completion
                .get(key)
                .or_else(|| self.editor.get(key))
                .or_else(|| self.global.get(key)),
        }
    }

    pub fn bindings(&self, context: KeybindingContext) -> &FxHashMap<Key, Command> {
        match context {
            KeybindingContext::Global => &self.global,
            KeybindingContext::Editor => &self.editor,
            KeybindingContext::SearchBar => &self.search_bar,
            KeybindingContext::Completion => &self.completion,
        }
    }

    pub fn bind(&mut self, context: KeybindingContext, key: Key, command: Command) {
        self.map_mut(context).insert(key, command);
    }

    pub fn unbind(&mut self, context: KeybindingContext, key: &Key) -> Option<Command> {
        self.map_mut(context).remove(key)
    }

    /// Applies user rules from settings.json; returns how many were applied.
    pub fn apply_rules(&mut self, rules: &[KeybindingRule]) -> usize {
        let mut applied = 0;
        for rule in rules {
            let Some(key) = parse_keybinding(&rule.key) else {
                tracing::warn!(key = %rule.key, "unrecognized keybinding");
                continue;
            };
            let context = rule
                .context
                .as_deref()
                .and_then(KeybindingContext::parse)
                .unwrap_or(KeybindingContext::Global);
            if rule.command.trim().is_empty() {
                let _ = self.unbind(context, &key);
            } else {
                self.bind(context, key, Command::from_name(rule.command.trim()));
            }
            applied += 1;
        }
        applied
    }

    fn map_mut(&mut self, context: KeybindingContext) -> &mut FxHashMap<Key, Command> {
        match context {
            KeybindingContext::Global => &mut self.global,
            KeybindingContext::Editor => &mut self.editor,
            KeybindingContext::SearchBar => &mut self.search_bar,
            KeybindingContext::Completion => &mut self.completion,
        }
    }
}

impl Default for KeybindingService {
    fn default() -> Self {
        Self::new()
    }
}

fn default_global_keybindings() -> FxHashMap<Key, Command> {
    let mut bindings = FxHashMap::default();
    bindings.reserve(32);

    bindings.insert(Key::simple(KeyCode::Esc), Command::Escape);

    bindings.insert(Key::ctrl(KeyCode::Char('q')), Command::Quit);
    bindings.insert(Key::ctrl(KeyCode::Char('n')), Command::NewFile);
    bindings.insert(Key::ctrl(KeyCode::Char('o')), Command::OpenFile);
    bindings.insert(Key::ctrl(KeyCode::Char('s')), Command::Save);
    bindings.insert(Key::ctrl_shift(KeyCode::Char('s')), Command::SaveAs);
    bindings.insert(Key::ctrl(KeyCode::Char('w')), Command::CloseTab);
    bindings.insert(Key::ctrl(KeyCode::Tab), Command::NextTab);
    bindings.insert(Key::ctrl_shift(KeyCode::Tab), Command::PrevTab);
    for n in 1..=9u8 {
        let digit = char::from(b'0' + n);
        bindings.insert(Key::alt(KeyCode::Char(digit)), Command::ActivateTab(n));
    }

    bindings.insert(Key::ctrl(KeyCode::Char('z')), Command::Undo);
    bindings.insert(Key::ctrl(KeyCode::Char('y')), Command::Redo);
    bindings.insert(Key::ctrl_shift(KeyCode::Char('z')), Command::Redo);

    bindings.insert(Key::ctrl(KeyCode::Char('f')), Command::Find);
    bindings.insert(Key::ctrl(KeyCode::Char('h')), Command::Replace);
    bindings.insert(Key::simple(KeyCode::F(3)), Command::FindNext);
    bindings.insert(Key::shift(KeyCode::F(3)), Command::FindPrev);

    bindings.insert(Key::ctrl_shift(KeyCode::Char('f')), Command::FormatDocument);

    bindings.insert(Key::simple(KeyCode::F(5)), Command::CompileAndRun);
    bindings.insert(Key::shift(KeyCode::F(5)), Command::StopRun);
    bindings.insert(Key::simple(KeyCode::F(9)), Command::ToggleTheme);

    bindings
}

fn default_editor_keybindings() -> FxHashMap<Key, Command> {
    let mut bindings = FxHashMap::default();
    bindings.reserve(16);

    bindings.insert(Key::simple(KeyCode::Left), Command::CursorLeft);
    bindings.insert(Key::simple(KeyCode::Right), Command::CursorRight);
    bindings.insert(Key::simple(KeyCode::Up), Command::CursorUp);
    bindings.insert(Key::simple(KeyCode::Down), Command::CursorDown);
    bindings.insert(Key::simple(KeyCode::Home), Command::CursorLineStart);
    bindings.insert(Key::simple(KeyCode::End), Command::CursorLineEnd);

    bindings.insert(Key::simple(KeyCode::Enter), Command::InsertNewline);
    bindings.insert(Key::simple(KeyCode::Tab), Command::InsertTab);
    bindings.insert(Key::simple(KeyCode::Backspace), Command::DeleteBackward);
    bindings.insert(Key::simple(KeyCode::Delete), Command::DeleteForward);

    bindings.insert(Key::ctrl(KeyCode::Char(' ')), Command::TriggerCompletion);

    bindings
}

fn default_search_bar_keybindings() -> FxHashMap<Key, Command> {
    let mut bindings = FxHashMap::default();
    bindings.reserve(8);

    bindings.insert(Key::simple(KeyCode::Enter), Command::FindNext);
    bindings.insert(Key::shift(KeyCode::Enter), Command::FindPrev);
    bindings.insert(Key::ctrl(KeyCode::Enter), Command::ReplaceCurrent);
    bindings.insert(
        Key::new(KeyCode::Enter, KeyModifiers::CONTROL | KeyModifiers::ALT),
        Command::ReplaceAll,
    );

    bindings
}

fn default_completion_keybindings() -> FxHashMap<Key, Command> {
    let mut bindings = FxHashMap::default();
    bindings.reserve(4);

    bindings.insert(Key::simple(KeyCode::Down), Command::SelectNextCompletion);
    bindings.insert(Key::simple(KeyCode::Up), Command::SelectPrevCompletion);
    bindings.insert(Key::simple(KeyCode::Enter), Command::AcceptCompletion);
    bindings.insert(Key::simple(KeyCode::Tab), Command::AcceptCompletion);

    bindings
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/keybinding.rs"]
mod tests;
