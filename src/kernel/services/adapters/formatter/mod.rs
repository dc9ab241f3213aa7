//! C 代码格式化适配器

pub mod builtin;
pub mod system;

pub use builtin::{reindent, BuiltinFormatter};
pub use system::{FormatTool, SystemFormatter};
