use super::*;
use crate::kernel::services::ports::compiler::SourceSnapshot;
use crate::kernel::session::BufferId;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

fn request(text: &str) -> (RunRequest, mpsc::UnboundedReceiver<OutputLine>, watch::Sender<bool>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let request = RunRequest {
        run_id: 1,
        snapshot: SourceSnapshot {
            buffer: BufferId::new(1),
            path: None,
            version: 0,
            text: Rope::from_str(text),
        },
        output: tx,
        cancel: cancel_rx,
    };
    (request, rx, cancel_tx)
}

#[test]
fn find_compiler_skips_missing_programs() {
    assert_eq!(find_compiler(&["chix-definitely-not-a-compiler"]), None);
}

#[test]
fn configured_path_wins_over_detection() {
    let settings = CompilerSettings {
        path: Some("/opt/cc/bin/mycc".to_string()),
        ..CompilerSettings::default()
    };
    let compiler = SystemCompiler::detect(&settings);
    assert_eq!(compiler.program(), Some("/opt/cc/bin/mycc"));
    assert_eq!(compiler.name(), "/opt/cc/bin/mycc");
}

#[test]
fn missing_compiler_reports_not_available() {
    let compiler = SystemCompiler::with_program(None, &CompilerSettings::default());
    assert!(!compiler.is_available());
    let (req, _rx, _cancel) = request("int main(void) { return 0; }\n");
    let err = block_on(compiler.compile_and_run(req)).unwrap_err();
    assert!(matches!(err, CompilerError::NotAvailable));
    assert!(err.to_string().contains("No C compiler detected"));
}

#[test]
fn unlaunchable_compiler_reports_launch_error() {
    let compiler = SystemCompiler::with_program(
        Some("chix-definitely-not-a-compiler".to_string()),
        &CompilerSettings::default(),
    );
    let (req, mut rx, _cancel) = request("int main(void) { return 0; }\n");
    let err = block_on(compiler.compile_and_run(req)).unwrap_err();
    assert!(matches!(err, CompilerError::Launch { .. }));

    let first = rx.try_recv().unwrap();
    assert_eq!(first.stream, OutputStream::Compiler);
    assert!(first.text.contains("-Wall -Wextra -fdiagnostics-color=never"));
    assert!(first.text.contains("program.c"));
}

#[test]
fn cancelled_resolves_once_flag_is_set() {
    block_on(async {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { cancelled(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    });
}
