//! Code formatting port: a whole-document snapshot in, formatted text out.

use std::io;
use std::time::Duration;

use super::compiler::SourceSnapshot;
use super::runtime::BoxFuture;
use crate::kernel::session::BufferId;

#[derive(Debug, Clone)]
pub struct FormatRequest {
    pub buffer: BufferId,
    /// Buffer version the text was taken at; the result is dropped if it moved.
    pub version: u64,
    pub file_name: String,
    pub text: String,
}

impl FormatRequest {
    pub fn from_snapshot(snapshot: &SourceSnapshot) -> Self {
        Self {
            buffer: snapshot.buffer,
            version: snapshot.version,
            file_name: snapshot.file_name(),
            text: snapshot.text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    /// Tool that produced `text` (`clang-format`, `astyle`, `indent`, `builtin`).
    pub tool: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("No code formatter available. Install clang-format, astyle, or indent.")]
    Unavailable,
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
    #[error("{tool} timed out after {} seconds", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
    #[error("formatter workspace: {0}")]
    Io(#[from] io::Error),
}

pub trait Formatter: Send + Sync {
    fn name(&self) -> String;

    fn format(&self, request: FormatRequest) -> BoxFuture<Result<Formatted, FormatError>>;
}
