//! 数据模型层

pub mod edit_history;
pub mod edit_op;
pub mod selection;
pub mod text_buffer;

pub use edit_history::{CleanMarker, EditHistory, EditHistoryConfig};
pub use edit_op::{EditCommand, EditOp, OpId, OpKind, Pos};
pub use selection::Selection;
pub use text_buffer::{slice_to_cow, EditError, TextBuffer};
