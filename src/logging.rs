//! tracing 初始化：按天滚动的日志文件；需要时把每条格式化后的记录按行送进
//! 有界通道，供 `--verbose` 展示。通道满时丢弃新行，文件里仍有完整记录。

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "chix.log";
const DEFAULT_FILTER: &str = "chix=info";
const TEE_CAPACITY: usize = 1024;

/// Keeps the file writer alive; dropping it flushes pending records.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
    lines: Option<Receiver<String>>,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn take_log_rx(&mut self) -> Option<Receiver<String>> {
        self.lines.take()
    }
}

#[derive(Clone)]
struct PanelTee {
    file: NonBlocking,
    lines: Option<SyncSender<String>>,
}

/// One per event: bytes go to the file immediately, the panel copy is sent on drop.
struct PanelTeeWriter {
    file: NonBlocking,
    pending: Vec<u8>,
    lines: Option<SyncSender<String>>,
}

impl<'a> MakeWriter<'a> for PanelTee {
    type Writer = PanelTeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        PanelTeeWriter {
            file: self.file.make_writer(),
            pending: Vec::new(),
            lines: self.lines.clone(),
        }
    }
}

impl Write for PanelTeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        if self.lines.is_some() {
            self.pending.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for PanelTeeWriter {
    fn drop(&mut self) {
        let Some(lines) = &self.lines else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.pending);
        for line in text.lines().filter(|l| !l.is_empty()) {
            if lines.try_send(line.to_string()).is_err() {
                break;
            }
        }
    }
}

fn resolve_log_dir() -> Option<PathBuf> {
    chix::kernel::services::adapters::ensure_log_dir()
        .or_else(|_| -> io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("chix").join("logs");
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        })
        .ok()
}

/// Installs the global subscriber. `None` when no log dir is usable or a subscriber
/// is already set. With `tee_lines` the guard also hands out a bounded line channel.
pub fn init(tee_lines: bool) -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir()?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (file, guard) = tracing_appender::non_blocking(appender);
    let (tx, rx) = if tee_lines {
        let (tx, rx) = mpsc::sync_channel::<String>(TEE_CAPACITY);
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(PanelTee { file, lines: tx })
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );
    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir,
        lines: rx,
    })
}

#[cfg(test)]
#[path = "../tests/unit/logging.rs"]
mod tests;
