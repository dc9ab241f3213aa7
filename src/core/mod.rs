//! 核心框架模块
//!
//! - Command: 语义命令
//! - Event: 按键抽象（crossterm）
//! - Context: 应用上下文（Store + 快捷键 + 运行时）

pub mod command;
pub mod context;
pub mod event;

pub use command::Command;
pub use context::{ApplicationContext, ContextOptions, Prompt};
pub use event::Key;
