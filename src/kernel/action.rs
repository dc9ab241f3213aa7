use std::path::PathBuf;

use crate::core::Command;
use crate::kernel::search::SearchQuery;
use crate::kernel::services::ports::compiler::{CompilerError, OutputLine, RunOutcome};
use crate::kernel::services::ports::file::FileError;
use crate::kernel::services::ports::formatter::{FormatError, Formatted};
use crate::kernel::session::{BufferId, SaveRequest};
use crate::models::{EditCommand, Pos, Selection};

#[derive(Debug)]
pub enum Action {
    RunCommand(Command),
    OpenPath {
        path: PathBuf,
        activate: bool,
    },
    SaveAs {
        id: BufferId,
        path: PathBuf,
    },
    CloseBuffer {
        id: BufferId,
        force: bool,
    },
    Edit {
        id: BufferId,
        command: EditCommand,
    },
    SetCursor {
        id: BufferId,
        pos: Pos,
    },
    SetSelection {
        id: BufferId,
        selection: Option<Selection>,
    },
    /// Answer to a `ConfirmDiscard` prompt.
    ResolveDiscard {
        discard: bool,
    },
    DismissNotification(u64),

    // ==================== 查找替换 ====================
    SearchSet(SearchQuery),
    SearchAppend(char),
    SearchBackspace,
    SearchToggleCaseSensitive,
    SearchToggleRegex,
    SetReplacement(String),
    ReplaceCurrent,
    ReplaceAll,

    // ==================== 异步完成 ====================
    FileLoaded {
        path: PathBuf,
        bytes: Vec<u8>,
        activate: bool,
    },
    FileLoadFailed {
        path: PathBuf,
        error: FileError,
    },
    FileSaved {
        request: SaveRequest,
        result: Result<(), FileError>,
    },
    RunOutput {
        run_id: u64,
        line: OutputLine,
    },
    RunFinished {
        run_id: u64,
        result: Result<RunOutcome, CompilerError>,
    },
    FormatFinished {
        buffer: BufferId,
        version: u64,
        result: Result<Formatted, FormatError>,
    },
}
