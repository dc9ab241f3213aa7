//! C 编译器适配器

pub mod diagnostics;
pub mod scripted;
pub mod system;

pub use diagnostics::parse_diagnostics;
pub use scripted::{Script, ScriptedCompiler};
pub use system::{find_compiler, SystemCompiler};
