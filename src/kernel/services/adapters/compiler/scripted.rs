//! Scripted compiler for tests and headless runs: replays canned output and results.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::system::cancelled;
use crate::kernel::services::ports::compiler::{
    Compiler, CompilerError, OutputLine, RunOutcome, RunRequest, RunStatus, SourceSnapshot,
};
use crate::kernel::services::ports::runtime::BoxFuture;

pub struct Script {
    pub lines: Vec<OutputLine>,
    pub result: Result<RunOutcome, CompilerError>,
    /// Hold the run open until it is cancelled.
    pub wait_for_cancel: bool,
}

impl Script {
    pub fn exit(code: i32, lines: Vec<OutputLine>) -> Self {
        Self {
            lines,
            result: Ok(RunOutcome {
                status: RunStatus::Exited(code),
                warnings: Vec::new(),
            }),
            wait_for_cancel: false,
        }
    }

    pub fn fail(error: CompilerError) -> Self {
        Self {
            lines: Vec::new(),
            result: Err(error),
            wait_for_cancel: false,
        }
    }

    pub fn until_cancelled(lines: Vec<OutputLine>) -> Self {
        Self {
            lines,
            result: Ok(RunOutcome {
                status: RunStatus::Cancelled,
                warnings: Vec::new(),
            }),
            wait_for_cancel: true,
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedCompiler {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    received: Arc<Mutex<Vec<SourceSnapshot>>>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(script);
        }
    }

    /// Snapshots handed to the compiler, oldest first.
    pub fn received(&self) -> Vec<SourceSnapshot> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Compiler for ScriptedCompiler {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn compile_and_run(&self, request: RunRequest) -> BoxFuture<Result<RunOutcome, CompilerError>> {
        if let Ok(mut received) = self.received.lock() {
            received.push(request.snapshot.clone());
        }
        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Script::exit(0, Vec::new()));

        Box::pin(async move {
            let RunRequest {
                output, mut cancel, ..
            } = request;
            for line in script.lines {
                let _ = output.send(line);
            }
            if script.wait_for_cancel {
                cancelled(&mut cancel).await;
            }
            script.result
        })
    }
}
