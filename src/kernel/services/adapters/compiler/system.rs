//! 系统 C 编译器（gcc / clang / tcc）：编译快照并运行生成的程序

use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ropey::Rope;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use super::diagnostics::{parse_diagnostics, split_by_severity};
use crate::kernel::services::ports::compiler::{
    Compiler, CompilerError, OutputLine, OutputStream, RunOutcome, RunRequest, RunStatus,
};
use crate::kernel::services::ports::runtime::BoxFuture;
use crate::kernel::services::ports::settings::CompilerSettings;

pub const COMPILER_CANDIDATES: &[&str] = &["gcc", "clang", "tcc"];
const WARNING_FLAGS: &[&str] = &["-Wall", "-Wextra", "-fdiagnostics-color=never"];

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "program.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "program";

/// Returns the first candidate that answers `--version`.
pub fn find_compiler(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .copied()
        .find(|name| {
            std::process::Command::new(name)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|s| s.success())
        })
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct SystemCompiler {
    program: Option<String>,
    extra_flags: Vec<String>,
    compile_timeout: Duration,
}

impl SystemCompiler {
    /// Uses the configured path when set, otherwise looks for gcc, then clang, then tcc.
    pub fn detect(settings: &CompilerSettings) -> Self {
        let program = settings
            .path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| find_compiler(COMPILER_CANDIDATES));
        match program.as_deref() {
            Some(p) => tracing::info!(compiler = %p, "c compiler selected"),
            None => tracing::warn!("no c compiler found on PATH"),
        }
        Self::with_program(program, settings)
    }

    pub fn with_program(program: Option<String>, settings: &CompilerSettings) -> Self {
        Self {
            program,
            extra_flags: settings.extra_flags.clone(),
            compile_timeout: Duration::from_secs(settings.compile_timeout_secs.max(1)),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }
}

impl Compiler for SystemCompiler {
    fn name(&self) -> String {
        self.program.clone().unwrap_or_else(|| "none".to_string())
    }

    fn compile_and_run(&self, request: RunRequest) -> BoxFuture<Result<RunOutcome, CompilerError>> {
        let this = self.clone();
        Box::pin(async move { this.run(request).await })
    }
}

impl SystemCompiler {
    async fn run(self, request: RunRequest) -> Result<RunOutcome, CompilerError> {
        let RunRequest {
            run_id,
            snapshot,
            output,
            mut cancel,
        } = request;
        let program = self.program.clone().ok_or(CompilerError::NotAvailable)?;

        let workdir = tempfile::Builder::new().prefix("chix-run-").tempdir()?;
        let source = workdir.path().join(snapshot.file_name());
        let executable = workdir.path().join(EXECUTABLE_NAME);

        let text = snapshot.text.clone();
        let source_for_write = source.clone();
        tokio::task::spawn_blocking(move || write_rope(&source_for_write, &text))
            .await
            .map_err(io::Error::other)??;

        let mut args: Vec<String> = WARNING_FLAGS.iter().map(|s| s.to_string()).collect();
        args.extend(self.extra_flags.iter().cloned());
        if let Some(dir) = snapshot.include_dir() {
            args.push("-I".to_string());
            args.push(dir.display().to_string());
        }
        args.push(source.display().to_string());
        args.push("-o".to_string());
        args.push(executable.display().to_string());

        let _ = output.send(OutputLine::new(
            OutputStream::Compiler,
            format!("$ {} {}", program, args.join(" ")),
        ));
        tracing::debug!(run_id, compiler = %program, "compiling");

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let compiled = tokio::select! {
            res = tokio::time::timeout(self.compile_timeout, cmd.output()) => res,
            _ = cancelled(&mut cancel) => {
                tracing::info!(run_id, "run cancelled during compilation");
                return Ok(RunOutcome { status: RunStatus::Cancelled, warnings: Vec::new() });
            }
        };
        let compiled = match compiled {
            Err(_) => return Err(CompilerError::Timeout(self.compile_timeout)),
            Ok(Err(source)) => {
                return Err(CompilerError::Launch {
                    program,
                    source,
                })
            }
            Ok(Ok(out)) => out,
        };

        let mut compiler_text = String::from_utf8_lossy(&compiled.stderr).into_owned();
        compiler_text.push_str(&String::from_utf8_lossy(&compiled.stdout));
        for line in compiler_text.lines().filter(|l| !l.trim().is_empty()) {
            let _ = output.send(OutputLine::new(OutputStream::Compiler, line));
        }
        let diagnostics = parse_diagnostics(&compiler_text);

        if !compiled.status.success() {
            return Err(CompilerError::CompileFailed {
                exit_code: compiled.status.code(),
                diagnostics,
            });
        }
        let (_, warnings) = split_by_severity(diagnostics);

        let cwd = snapshot
            .include_dir()
            .unwrap_or_else(|| workdir.path().to_path_buf());
        let status = run_executable(run_id, &executable, &cwd, &output, &mut cancel).await?;

        drop(workdir);
        Ok(RunOutcome { status, warnings })
    }
}

async fn run_executable(
    run_id: u64,
    executable: &Path,
    cwd: &Path,
    output: &mpsc::UnboundedSender<OutputLine>,
    cancel: &mut watch::Receiver<bool>,
) -> Result<RunStatus, CompilerError> {
    let mut child = Command::new(executable)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CompilerError::Launch {
            program: executable.display().to_string(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .map(|r| tokio::spawn(forward_lines(r, OutputStream::Stdout, output.clone())));
    let stderr = child
        .stderr
        .take()
        .map(|r| tokio::spawn(forward_lines(r, OutputStream::Stderr, output.clone())));

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = cancelled(cancel) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(run_id, error = %e, "failed to kill program");
            }
            None
        }
    };

    for reader in [stdout, stderr].into_iter().flatten() {
        let _ = reader.await;
    }

    let status = match status {
        Some(status) => exit_status(status),
        None => RunStatus::Cancelled,
    };
    tracing::info!(run_id, ?status, "program finished");
    Ok(status)
}

fn exit_status(status: ExitStatus) -> RunStatus {
    match status.code() {
        Some(code) => RunStatus::Exited(code),
        None => RunStatus::Terminated,
    }
}

async fn forward_lines<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(OutputLine::new(stream, line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "program output stream closed");
                break;
            }
        }
    }
}

/// Resolves once the cancel flag is set. Never resolves if the sender is gone.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn write_rope(path: &Path, rope: &Rope) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    rope.write_to(&mut writer)?;
    writer.flush()
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/compiler/system.rs"]
mod tests;
