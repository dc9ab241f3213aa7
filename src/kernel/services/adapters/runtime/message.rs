use std::path::PathBuf;

use crate::kernel::services::ports::compiler::{CompilerError, OutputLine, RunOutcome};
use crate::kernel::services::ports::file::FileError;
use crate::kernel::services::ports::formatter::{FormatError, Formatted};
use crate::kernel::session::{BufferId, SaveRequest};

/// Completions sent from background tasks back to the event loop.
#[derive(Debug)]
pub enum AppMessage {
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
