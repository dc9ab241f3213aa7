//! chix [--run] [--format] [--verbose] [FILES...]
//!
//! 无参数时只列出打开的标签；--format 把格式化后的活动缓冲区写到 stdout；
//! --run 编译运行活动缓冲区并以程序退出码退出。

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chix::core::{ApplicationContext, ContextOptions};
use chix::kernel::services::adapters::{ensure_settings_file, load_settings};
use chix::kernel::services::ports::compiler::{OutputStream, RunStatus};
use chix::kernel::{Action, NotificationLevel, RunReport};
use chix::core::Command;

mod logging;

const IDLE_WAIT: Duration = Duration::from_millis(200);
const RUN_POLL: Duration = Duration::from_millis(50);
const FORMAT_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    run: bool,
    format: bool,
    verbose: bool,
    files: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum CliError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("--run needs a file to compile")]
    NothingToRun,
    #[error("--format needs a file to format")]
    NothingToFormat,
}

fn parse_args<I>(args: I) -> Result<CliArgs, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut cli = CliArgs::default();
    let mut only_files = false;
    for arg in args {
        if only_files || !arg.starts_with('-') || arg == "-" {
            cli.files.push(PathBuf::from(arg));
            continue;
        }
        match arg.as_str() {
            "--" => only_files = true,
            "--run" | "-r" => cli.run = true,
            "--format" | "-f" => cli.format = true,
            "--verbose" | "-v" => cli.verbose = true,
            _ => return Err(CliError::UnknownOption(arg)),
        }
    }
    if cli.run && cli.files.is_empty() {
        return Err(CliError::NothingToRun);
    }
    if cli.format && cli.files.is_empty() {
        return Err(CliError::NothingToFormat);
    }
    Ok(cli)
}

fn main() -> ExitCode {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("chix: {e}");
            eprintln!("usage: chix [--run] [--format] [--verbose] [FILES...]");
            return ExitCode::from(2);
        }
    };

    let mut logging = logging::init(cli.verbose);

    if let Err(e) = ensure_settings_file() {
        tracing::warn!(error = %e, "could not create settings file");
    }
    let settings = load_settings();

    let mut ctx = match ApplicationContext::init(ContextOptions::from_settings(settings)) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("chix: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match drive(&mut ctx, &cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("chix: {e}");
            1
        }
    };
    ctx.shutdown();

    if cli.verbose {
        if let Some(guard) = logging.as_mut() {
            eprintln!("chix: logs in {}", guard.log_dir().display());
            if let Some(rx) = guard.take_log_rx() {
                for line in rx.try_iter() {
                    eprintln!("{line}");
                }
            }
        }
    }
    ExitCode::from(code)
}

fn drive(ctx: &mut ApplicationContext, cli: &CliArgs) -> io::Result<u8> {
    for file in &cli.files {
        ctx.open(file.clone(), true);
    }
    while ctx.pump_blocking(IDLE_WAIT) {}
    report_notifications(ctx);

    let mut out = io::stdout().lock();
    if cli.format {
        let Some(id) = ctx.state().session.active_id() else {
            return Ok(1);
        };
        ctx.dispatch(Action::RunCommand(Command::FormatDocument));
        // 格式化完成时总会留下一条通知
        let started = Instant::now();
        while ctx.state().notifications.is_empty() && started.elapsed() < FORMAT_WAIT {
            ctx.pump_blocking(RUN_POLL);
        }
        let failed = ctx
            .state()
            .notifications
            .iter()
            .any(|n| n.level != NotificationLevel::Info);
        report_notifications(ctx);
        if let Some(buffer) = ctx.state().session.buffer(id) {
            write!(out, "{}", buffer.rope())?;
        }
        out.flush()?;
        if failed {
            return Ok(1);
        }
        if !cli.run {
            return Ok(0);
        }
    }
    if !cli.run {
        for (index, buffer) in ctx.state().session.buffers().enumerate() {
            let marker = if ctx.state().session.active_id() == Some(buffer.id()) {
                '*'
            } else {
                ' '
            };
            let path = buffer
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            writeln!(out, "{marker} {}: {} {}", index + 1, buffer.display_title(), path)?;
        }
        return Ok(0);
    }

    if ctx.state().session.active_id().is_none() {
        return Ok(1);
    }
    ctx.dispatch(Action::RunCommand(Command::CompileAndRun));
    report_notifications(ctx);

    let mut printed = 0usize;
    loop {
        ctx.pump_blocking(RUN_POLL);
        printed = print_new_output(ctx, printed, &mut out)?;
        if !ctx.state().run.is_running() {
            break;
        }
    }
    out.flush()?;
    report_notifications(ctx);

    let code = match ctx.state().run.last_report() {
        Some(RunReport::Finished(outcome)) => match outcome.status {
            RunStatus::Exited(code) => u8::try_from(code).unwrap_or(1),
            RunStatus::Terminated | RunStatus::Cancelled => 1,
        },
        Some(RunReport::Failed(_)) | None => 1,
    };
    Ok(code)
}

/// Prints output lines not yet shown. `printed` counts lines ever produced.
fn print_new_output(
    ctx: &ApplicationContext,
    printed: usize,
    out: &mut impl Write,
) -> io::Result<usize> {
    let run = &ctx.state().run;
    let dropped = run.dropped_lines();
    let skip = printed.saturating_sub(dropped);
    let mut total = dropped;
    for (i, line) in run.output().enumerate() {
        total = dropped + i + 1;
        if i < skip {
            continue;
        }
        match line.stream {
            OutputStream::Stdout => writeln!(out, "{}", line.text)?,
            OutputStream::Status | OutputStream::Compiler | OutputStream::Stderr => {
                eprintln!("{}", line.text)
            }
        }
    }
    Ok(total.max(printed))
}

fn report_notifications(ctx: &mut ApplicationContext) {
    let notes: Vec<_> = ctx.state().notifications.clone();
    for note in notes {
        let level = match note.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        eprintln!("chix: {level}: {}", note.message);
        ctx.dispatch(Action::DismissNotification(note.id));
    }
}

#[cfg(test)]
#[path = "../tests/unit/cli_args.rs"]
mod tests;
