//! 命令系统：语义命令定义
//!
//! - Command: 语义命令枚举（不关心具体按键）
//! - name()/from_name(): settings.json 中使用的稳定名称

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // ==================== 光标移动 ====================
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    CursorLineStart,
    CursorLineEnd,

    // ==================== 编辑操作 ====================
    InsertChar(char),
    InsertNewline,
    InsertTab,
    DeleteBackward,
    DeleteForward,
    Undo,
    Redo,

    // ==================== 文件 / 标签页 ====================
    NewFile,
    OpenFile,
    Save,
    SaveAs,
    CloseTab,
    NextTab,
    PrevTab,
    /// 1-based, Alt+1..9
    ActivateTab(u8),

    // ==================== 查找替换 ====================
    Find,
    FindNext,
    FindPrev,
    Replace,
    /// Replace the current match (search bar)
    ReplaceCurrent,
    ReplaceAll,

    // ==================== 补全 / 格式化 ====================
    TriggerCompletion,
    SelectNextCompletion,
    SelectPrevCompletion,
    AcceptCompletion,
    FormatDocument,

    // ==================== 运行 / 视图 ====================
    CompileAndRun,
    StopRun,
    ToggleTheme,
    Escape,
    Quit,

    // ==================== 扩展点 ====================
    Custom(String),
}

const TAB_PREFIX: &str = "activateTab";

impl Command {
    pub fn name(&self) -> String {
        let name = match self {
            Command::CursorLeft => "cursorLeft",
            Command::CursorRight => "cursorRight",
            Command::CursorUp => "cursorUp",
            Command::CursorDown => "cursorDown",
            Command::CursorLineStart => "cursorLineStart",
            Command::CursorLineEnd => "cursorLineEnd",
            Command::InsertChar(_) => "insertChar",
            Command::InsertNewline => "insertNewline",
            Command::InsertTab => "insertTab",
            Command::DeleteBackward => "deleteBackward",
            Command::DeleteForward => "deleteForward",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::NewFile => "newFile",
            Command::OpenFile => "openFile",
            Command::Save => "save",
            Command::SaveAs => "saveAs",
            Command::CloseTab => "closeTab",
            Command::NextTab => "nextTab",
            Command::PrevTab => "prevTab",
            Command::ActivateTab(n) => return format!("{TAB_PREFIX}{n}"),
            Command::Find => "find",
            Command::FindNext => "findNext",
            Command::FindPrev => "findPrev",
            Command::Replace => "replace",
            Command::ReplaceCurrent => "replaceCurrent",
            Command::ReplaceAll => "replaceAll",
            Command::TriggerCompletion => "triggerCompletion",
            Command::SelectNextCompletion => "selectNextCompletion",
            Command::SelectPrevCompletion => "selectPrevCompletion",
            Command::AcceptCompletion => "acceptCompletion",
            Command::FormatDocument => "formatDocument",
            Command::CompileAndRun => "compileAndRun",
            Command::StopRun => "stopRun",
            Command::ToggleTheme => "toggleTheme",
            Command::Escape => "escape",
            Command::Quit => "quit",
            Command::Custom(name) => return name.clone(),
        };
        name.to_string()
    }

    pub fn from_name(name: &str) -> Command {
        match name {
            "cursorLeft" => Command::CursorLeft,
            "cursorRight" => Command::CursorRight,
            "cursorUp" => Command::CursorUp,
            "cursorDown" => Command::CursorDown,
            "cursorLineStart" => Command::CursorLineStart,
            "cursorLineEnd" => Command::CursorLineEnd,
            "insertNewline" => Command::InsertNewline,
            "insertTab" => Command::InsertTab,
            "deleteBackward" => Command::DeleteBackward,
            "deleteForward" => Command::DeleteForward,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "newFile" => Command::NewFile,
            "openFile" => Command::OpenFile,
            "save" => Command::Save,
            "saveAs" => Command::SaveAs,
            "closeTab" => Command::CloseTab,
            "nextTab" => Command::NextTab,
            "prevTab" => Command::PrevTab,
            "find" => Command::Find,
            "findNext" => Command::FindNext,
            "findPrev" => Command::FindPrev,
            "replace" => Command::Replace,
            "replaceCurrent" => Command::ReplaceCurrent,
            "replaceAll" => Command::ReplaceAll,
            "triggerCompletion" | "triggerSuggest" => Command::TriggerCompletion,
            "selectNextCompletion" => Command::SelectNextCompletion,
            "selectPrevCompletion" => Command::SelectPrevCompletion,
            "acceptCompletion" => Command::AcceptCompletion,
            "formatDocument" | "format" => Command::FormatDocument,
            "compileAndRun" | "run" => Command::CompileAndRun,
            "stopRun" | "stop" => Command::StopRun,
            "toggleTheme" => Command::ToggleTheme,
            "escape" => Command::Escape,
            "quit" => Command::Quit,
            other => other
                .strip_prefix(TAB_PREFIX)
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=9).contains(n))
                .map(Command::ActivateTab)
                .unwrap_or_else(|| Command::Custom(other.to_string())),
        }
    }

    pub fn is_edit_command(&self) -> bool {
        matches!(
            self,
            Command::InsertChar(_)
                | Command::InsertNewline
                | Command::InsertTab
                | Command::DeleteBackward
                | Command::DeleteForward
                | Command::Undo
                | Command::Redo
        )
    }

    pub fn is_cursor_command(&self) -> bool {
        matches!(
            self,
            Command::CursorLeft
                | Command::CursorRight
                | Command::CursorUp
                | Command::CursorDown
                | Command::CursorLineStart
                | Command::CursorLineEnd
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/command.rs"]
mod tests;
