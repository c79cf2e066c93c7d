//! Undo/redo history for discrete terrain edits.
//!
//! Entries are shared `Arc<LevelState>` snapshots (levels plus ramp mask). The
//! float heightmap is never stored; it is rebuilt from levels on restore.

use std::sync::Arc;

use crate::height_grid::LevelState;

/// Snapshot-based undo/redo history of grid levels.
pub struct UndoHistory {
    /// Stack of previous states (most recent at the end)
    past: Vec<Arc<LevelState>>,
    /// Stack of undone states available for redo (most recent at the end)
    future: Vec<Arc<LevelState>>,
    /// Maximum number of undo entries to keep
    max_entries: usize,
}

impl UndoHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Push the current state before a new modification.
    /// Clears the redo stack (new action invalidates redo). A state equal to the
    /// newest entry is not pushed twice.
    pub fn push(&mut self, state: Arc<LevelState>) {
        self.future.clear();
        if self
            .past
            .last()
            .is_some_and(|top| Arc::ptr_eq(top, &state) || **top == *state)
        {
            return;
        }
        self.past.push(state);
        if self.past.len() > self.max_entries {
            let excess = self.past.len() - self.max_entries;
            self.past.drain(..excess);
        }
    }

    /// Undo: pop the most recent past state, push current to future.
    /// Returns the state to restore, or None if nothing to undo.
    pub fn undo(&mut self, current: Arc<LevelState>) -> Option<Arc<LevelState>> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    /// Redo: pop the most recent future state, push current to past.
    /// Returns the state to restore, or None if nothing to redo.
    pub fn redo(&mut self, current: Arc<LevelState>) -> Option<Arc<LevelState>> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }
}
