use std::path::PathBuf;

use crate::kernel::run::StartedRun;
use crate::kernel::services::ports::formatter::FormatRequest;
use crate::kernel::session::{BufferId, SaveRequest};

/// Side effects requested by the store; executed by the application context.
#[derive(Debug)]
pub enum Effect {
    LoadFile {
        path: PathBuf,
        activate: bool,
    },
    WriteFile(SaveRequest),
    StartRun(StartedRun),
    Format(FormatRequest),
    /// Ask the user for a path to open (Ctrl+O).
    PromptOpenPath,
    /// Ask the user for a save target (Save As, or Save on an untitled buffer).
    PromptSavePath {
        id: BufferId,
    },
    ConfirmDiscard {
        id: BufferId,
    },
    RecordRecentFile(PathBuf),
    Quit,
}
