//! Service ports: traits + data contracts.

pub mod compiler;
pub mod file;
pub mod formatter;
pub mod runtime;
pub mod settings;

pub use compiler::{
    Compiler, CompilerError, Diagnostic, OutputLine, OutputStream, RunOutcome, RunRequest,
    RunStatus, Severity, SourceSnapshot,
};
pub use file::{FileError, FileSystem, Result as FileResult};
pub use formatter::{FormatError, FormatRequest, Formatted, Formatter};
pub use runtime::BoxFuture;
pub use settings::{
    CompilerSettings, EditorSettings, FormatterSettings, KeybindingRule, Settings,
    ThemeModeSetting, ThemeSettings,
};
