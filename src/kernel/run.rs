//! F5 编译运行的内核侧状态：同一时间只允许一个运行；输出面板为定长行缓冲。

use std::collections::VecDeque;

use tokio::sync::{mpsc, watch};

use crate::kernel::services::ports::compiler::{
    CompilerError, Diagnostic, OutputLine, OutputStream, RunOutcome, RunRequest, RunStatus,
    SourceSnapshot,
};
use crate::kernel::session::{BufferId, SessionError};

pub const DEFAULT_OUTPUT_CAPACITY: usize = 5000;

/// Everything the runtime needs to drive one run.
pub struct StartedRun {
    pub request: RunRequest,
    pub output: mpsc::UnboundedReceiver<OutputLine>,
}

impl std::fmt::Debug for StartedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.request.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Finished(RunOutcome),
    Failed(String),
}

struct ActiveRun {
    run_id: u64,
    buffer: BufferId,
    cancel: watch::Sender<bool>,
}

pub struct RunState {
    next_run_id: u64,
    active: Option<ActiveRun>,
    output: VecDeque<OutputLine>,
    capacity: usize,
    dropped: usize,
    last_report: Option<RunReport>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_CAPACITY)
    }
}

impl RunState {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_run_id: 1,
            active: None,
            output: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
            last_report: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_run(&self) -> Option<(u64, BufferId)> {
        self.active.as_ref().map(|r| (r.run_id, r.buffer))
    }

    pub fn output(&self) -> impl Iterator<Item = &OutputLine> {
        self.output.iter()
    }

    /// Lines evicted from the front since the last clear.
    pub fn dropped_lines(&self) -> usize {
        self.dropped
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Starts a run for `snapshot`. Rejected while another run is in flight.
    pub fn begin(&mut self, snapshot: SourceSnapshot) -> Result<StartedRun, SessionError> {
        if let Some(active) = &self.active {
            tracing::info!(run_id = active.run_id, "compile requested while a run is in flight");
            return Err(SessionError::CompilerBusy);
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        self.clear_output();
        self.diagnostics.clear();
        self.push_status(format!("[INFO] Compiling {}...", snapshot.file_name()));

        self.active = Some(ActiveRun {
            run_id,
            buffer: snapshot.buffer,
            cancel: cancel_tx,
        });
        tracing::info!(run_id, buffer = %snapshot.buffer, version = snapshot.version, "run started");

        Ok(StartedRun {
            request: RunRequest {
                run_id,
                snapshot,
                output: output_tx,
                cancel: cancel_rx,
            },
            output: output_rx,
        })
    }

    /// Flips the cancel flag of the active run. Returns false when idle.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if active.cancel.send(true).is_err() {
            tracing::debug!(run_id = active.run_id, "run already gone when cancelling");
        }
        self.push_status("[INFO] Stopping...");
        true
    }

    /// Appends a streamed line. Lines from stale runs are dropped.
    pub fn push_output(&mut self, run_id: u64, line: OutputLine) -> bool {
        if !self.is_current(run_id) {
            return false;
        }
        self.push_line(line);
        true
    }

    /// Records the end of a run. Returns false for stale run ids.
    pub fn finish(&mut self, run_id: u64, result: Result<RunOutcome, CompilerError>) -> bool {
        if !self.is_current(run_id) {
            tracing::debug!(run_id, "ignoring result of stale run");
            return false;
        }
        self.active = None;

        let report = match result {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    tracing::debug!(run_id, %warning, "compiler warning");
                }
                self.push_status(match outcome.status {
                    RunStatus::Exited(0) => "[SUCCESS] Program exited with code 0".to_string(),
                    RunStatus::Exited(code) => format!("[ERROR] Program exited with code {code}"),
                    RunStatus::Terminated => "[ERROR] Program terminated by signal".to_string(),
                    RunStatus::Cancelled => "[INFO] Run cancelled".to_string(),
                });
                self.diagnostics = outcome.warnings.clone();
                RunReport::Finished(outcome)
            }
            Err(err) => {
                tracing::warn!(run_id, error = %err, "run failed");
                let message = err.to_string();
                self.push_status(format!("[ERROR] {message}"));
                if let CompilerError::CompileFailed { diagnostics, .. } = err {
                    self.diagnostics = diagnostics;
                }
                RunReport::Failed(message)
            }
        };
        self.last_report = Some(report);
        true
    }

    fn clear_output(&mut self) {
        self.output.clear();
        self.dropped = 0;
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.active.as_ref().is_some_and(|r| r.run_id == run_id)
    }

    fn push_status(&mut self, text: impl Into<String>) {
        self.push_line(OutputLine::new(OutputStream::Status, text));
    }

    fn push_line(&mut self, line: OutputLine) {
        if self.output.len() >= self.capacity {
            self.output.pop_front();
            self.dropped += 1;
        }
        self.output.push_back(line);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/run.rs"]
mod tests;
