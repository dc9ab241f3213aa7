//! 文件系统适配器：本地磁盘 + 内存实现

pub mod local;
pub mod memory;

pub use local::{backup_path_for, LocalFileSystem};
pub use memory::MemoryFileSystem;
