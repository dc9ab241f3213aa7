//! chix - C 代码编辑器的无界面核心
//!
//! 模块结构：
//! - core: 命令、按键、应用上下文
//! - kernel: 编辑会话、查找替换、高亮、主题、编译运行，以及 Store/Action/Effect
//! - kernel::services: 端口（trait + 数据契约）与适配器（文件、编译器、运行时、配置）
//! - models: 文本缓冲、编辑操作、撤销历史

pub mod core;
pub mod kernel;
pub mod models;
