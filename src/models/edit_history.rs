//! 编辑历史管理（线性 undo/redo 栈）
//!
//! - 新编辑清空 redo 栈，不产生分支
//! - clean marker 记录最近一次保存/加载时的栈深度与栈顶操作
//! - dirty = 当前 (深度, 栈顶) 与 clean marker 不一致

use super::edit_op::{EditOp, OpId};

/// 默认最多保留的 undo 步数
pub const DEFAULT_MAX_UNDO: usize = 1000;

#[derive(Clone, Copy, Debug)]
pub struct EditHistoryConfig {
    pub max_undo: usize,
}

impl Default for EditHistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

/// Saved point in the undo stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanMarker {
    depth: usize,
    top: Option<OpId>,
}

impl CleanMarker {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

pub struct EditHistory {
    undo_stack: Vec<EditOp>,
    redo_stack: Vec<EditOp>,
    /// None: 保存点已不可达（被新编辑丢弃或被裁剪）
    clean: Option<CleanMarker>,
    config: EditHistoryConfig,
}

impl EditHistory {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            clean: Some(CleanMarker {
                depth: 0,
                top: None,
            }),
            config: EditHistoryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EditHistoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn push(&mut self, op: EditOp) {
        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            if self
                .clean
                .is_some_and(|marker| marker.depth > self.undo_stack.len())
            {
                self.clean = None;
            }
        }

        self.undo_stack.push(op);

        if self.config.max_undo > 0 && self.undo_stack.len() > self.config.max_undo {
            let overflow = self.undo_stack.len() - self.config.max_undo;
            self.undo_stack.drain(..overflow);
            self.clean = self.clean.and_then(|marker| {
                let depth = marker.depth.checked_sub(overflow)?;
                let top = if depth == 0 { None } else { marker.top };
                Some(CleanMarker { depth, top })
            });
        }
    }

    /// 弹出栈顶操作并移入 redo 栈，返回该操作供调用方应用逆操作
    pub fn undo(&mut self) -> Option<&EditOp> {
        let op = self.undo_stack.pop()?;
        self.redo_stack.push(op);
        self.redo_stack.last()
    }

    pub fn redo(&mut self) -> Option<&EditOp> {
        let op = self.redo_stack.pop()?;
        self.undo_stack.push(op);
        self.undo_stack.last()
    }

    pub fn current_marker(&self) -> CleanMarker {
        CleanMarker {
            depth: self.undo_stack.len(),
            top: self.undo_stack.last().map(|op| op.id),
        }
    }

    pub fn clean_marker(&self) -> Option<CleanMarker> {
        self.clean
    }

    pub fn mark_clean(&mut self) {
        self.clean = Some(self.current_marker());
    }

    /// Records a save that captured `marker` before later edits may have landed.
    pub fn mark_clean_at(&mut self, marker: CleanMarker) {
        self.clean = Some(marker);
    }

    pub fn is_dirty(&self) -> bool {
        self.clean != Some(self.current_marker())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.mark_clean();
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/edit_history.rs"]
mod tests;
