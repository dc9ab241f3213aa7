//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod app_dirs;
pub mod compiler;
pub mod file;
pub mod formatter;
pub mod keybinding;
pub mod recent;
pub mod runtime;
pub mod settings;

pub use app_dirs::{
    ensure_app_data_dir, ensure_log_dir, get_app_data_dir, get_log_dir, get_recent_files_path,
    get_settings_path,
};
pub use compiler::{ScriptedCompiler, SystemCompiler};
pub use file::{LocalFileSystem, MemoryFileSystem};
pub use formatter::{BuiltinFormatter, SystemFormatter};
pub use keybinding::{KeybindingContext, KeybindingService};
pub use recent::RecentFiles;
pub use runtime::{AppMessage, AsyncRuntime};
pub use settings::{ensure_settings_file, load_settings, parse_keybinding, SettingsError};
