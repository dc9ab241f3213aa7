use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::message::AppMessage;
use crate::kernel::run::StartedRun;
use crate::kernel::services::ports::compiler::{Compiler, OutputLine};
use crate::kernel::services::ports::file::{FileError, FileSystem};
use crate::kernel::services::ports::formatter::{FormatRequest, Formatter};
use crate::kernel::session::SaveRequest;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
    tx: Sender<AppMessage>,
    fs: Arc<dyn FileSystem>,
}

impl AsyncRuntime {
    pub fn new(tx: Sender<AppMessage>, fs: Arc<dyn FileSystem>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("chix-worker")
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;
        Ok(Self { runtime, tx, fs })
    }

    /// Stops background tasks; a running child process is killed on drop.
    pub fn shutdown(self) {
        self.runtime.shutdown_timeout(SHUTDOWN_GRACE);
    }

    pub fn load_file(&self, path: PathBuf, activate: bool) {
        let tx = self.tx.clone();
        let fs = self.fs.clone();
        self.runtime.spawn(async move {
            let path_for_read = path.clone();
            let result = tokio::task::spawn_blocking(move || fs.read(&path_for_read))
                .await
                .unwrap_or_else(|e| Err(FileError::io(&path, io::Error::other(e))));

            let msg = match result {
                Ok(bytes) => AppMessage::FileLoaded {
                    path,
                    bytes,
                    activate,
                },
                Err(error) => AppMessage::FileLoadFailed { path, error },
            };
            let _ = tx.send(msg);
        });
    }

    pub fn write_file(&self, request: SaveRequest) {
        let tx = self.tx.clone();
        let fs = self.fs.clone();
        self.runtime.spawn(async move {
            let path = request.path.clone();
            let bytes = request.to_bytes();
            let path_for_write = path.clone();
            let result = tokio::task::spawn_blocking(move || fs.write(&path_for_write, &bytes))
                .await
                .unwrap_or_else(|e| Err(FileError::io(&path, io::Error::other(e))));
            let _ = tx.send(AppMessage::FileSaved { request, result });
        });
    }

    /// Drives one compile-and-run. Every `RunOutput` is sent before the `RunFinished`.
    pub fn start_run(&self, compiler: Arc<dyn Compiler>, run: StartedRun) {
        let StartedRun { request, output } = run;
        let run_id = request.run_id;
        let tx = self.tx.clone();
        let forward = self
            .runtime
            .spawn(forward_output(run_id, output, tx.clone()));

        self.runtime.spawn(async move {
            let result = compiler.compile_and_run(request).await;
            if let Err(e) = forward.await {
                tracing::warn!(run_id, error = %e, "output forwarder failed");
            }
            let _ = tx.send(AppMessage::RunFinished { run_id, result });
        });
    }

    pub fn format(&self, formatter: Arc<dyn Formatter>, request: FormatRequest) {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let buffer = request.buffer;
            let version = request.version;
            let result = formatter.format(request).await;
            let _ = tx.send(AppMessage::FormatFinished {
                buffer,
                version,
                result,
            });
        });
    }
}

async fn forward_output(
    run_id: u64,
    mut output: mpsc::UnboundedReceiver<OutputLine>,
    tx: Sender<AppMessage>,
) {
    while let Some(line) = output.recv().await {
        if tx.send(AppMessage::RunOutput { run_id, line }).is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/runtime/async_runtime.rs"]
mod tests;
