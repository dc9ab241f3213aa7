use super::BufferId;
use crate::kernel::services::ports::file::FileError;
use crate::models::EditError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] FileError),
    #[error("no buffer with id {0}")]
    NotFound(BufferId),
    #[error("buffer {0} has unsaved changes")]
    UnsavedChanges(BufferId),
    #[error("buffer {0} has no file path")]
    NoPath(BufferId),
    #[error(transparent)]
    InvalidRange(#[from] EditError),
    #[error("a program is already running")]
    CompilerBusy,
}
