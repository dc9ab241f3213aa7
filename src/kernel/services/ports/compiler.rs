//! Compile-and-run port: contracts shared by the kernel and compiler adapters.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ropey::Rope;
use tokio::sync::{mpsc, watch};

use super::runtime::BoxFuture;
use crate::kernel::session::BufferId;

const UNTITLED_SOURCE: &str = "program.c";

/// Immutable copy of a buffer taken when a run is requested.
#[derive(Clone, Debug)]
pub struct SourceSnapshot {
    pub buffer: BufferId,
    pub path: Option<PathBuf>,
    pub version: u64,
    pub text: Rope,
}

impl SourceSnapshot {
    /// File name used when materializing the snapshot for the compiler.
    pub fn file_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".c"))
            .unwrap_or_else(|| UNTITLED_SOURCE.to_string())
    }

    pub fn include_dir(&self) -> Option<PathBuf> {
        self.path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.to_path_buf())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// `[INFO]` / `[ERROR]` lines written by the editor itself.
    Status,
    Compiler,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn new(stream: OutputStream, text: impl Into<String>) -> Self {
        Self {
            stream,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
    pub notes: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        if self.line > 0 {
            write!(
                f,
                "{}:{}:{}: {}: {}",
                self.file, self.line, self.column, severity, self.message
            )?;
        } else {
            write!(f, "{}: {}", severity, self.message)?;
        }
        for note in &self.notes {
            write!(f, "\n{}", note)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    /// Killed by a signal; no exit code.
    Terminated,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("No C compiler detected. Please install GCC, Clang, or TCC.")]
    NotAvailable,
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("compilation failed with {} error(s)", errors_in(.diagnostics))]
    CompileFailed {
        exit_code: Option<i32>,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("compilation timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("compiler workspace: {0}")]
    Io(#[from] io::Error),
}

fn errors_in(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
        .max(1)
}

impl CompilerError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompilerError::CompileFailed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

pub struct RunRequest {
    pub run_id: u64,
    pub snapshot: SourceSnapshot,
    pub output: mpsc::UnboundedSender<OutputLine>,
    pub cancel: watch::Receiver<bool>,
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("run_id", &self.run_id)
            .field("buffer", &self.snapshot.buffer)
            .field("version", &self.snapshot.version)
            .finish()
    }
}

pub trait Compiler: Send + Sync {
    fn name(&self) -> String;

    fn compile_and_run(&self, request: RunRequest) -> BoxFuture<Result<RunOutcome, CompilerError>>;
}
