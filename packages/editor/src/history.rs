//! # Undo/Redo History
//!
//! Two bounded stacks of block-collection snapshots.
//!
//! - Every committed mutation pushes the state *before* it
//! - Undo returns the previous snapshot and moves the current state to redo
//! - Redo is the mirror image
//! - A new mutation clears redo
//! - The oldest snapshot is evicted once the depth limit is reached
//!
//! Restoring a snapshot is the orchestrator's job; it also writes the
//! compensating records into the draft log.

use crate::errors::EditorResult;
use crate::storage::KeyValueStore;
use pagegrid_common::{Block, BlockId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

const HISTORY_FORMAT_VERSION: u32 = 1;

/// Block collection at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub blocks: Vec<Block>,
    pub timestamp: i64,
}

impl LayoutSnapshot {
    pub fn new(blocks: Vec<Block>, timestamp: i64) -> Self {
        Self { blocks, timestamp }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    undo: Vec<LayoutSnapshot>,
    redo: Vec<LayoutSnapshot>,
    version: u32,
}

#[derive(Debug, Clone)]
pub struct UndoRedoStack {
    /// Most recent last
    undo_stack: Vec<LayoutSnapshot>,

    /// Most recent last
    redo_stack: Vec<LayoutSnapshot>,

    /// 0 = unlimited
    max_levels: usize,
}

impl UndoRedoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record the state before a mutation
    pub fn push(&mut self, snapshot: LayoutSnapshot) {
        Self::push_bounded(&mut self.undo_stack, snapshot, self.max_levels);
        self.redo_stack.clear();
    }

    fn push_bounded(stack: &mut Vec<LayoutSnapshot>, snapshot: LayoutSnapshot, max_levels: usize) {
        stack.push(snapshot);
        if max_levels > 0 && stack.len() > max_levels {
            stack.remove(0);
        }
    }

    /// Snapshot to restore, with `current` moved to the redo stack
    pub fn undo(&mut self, current: LayoutSnapshot) -> Option<LayoutSnapshot> {
        let previous = self.undo_stack.pop()?;
        Self::push_bounded(&mut self.redo_stack, current, self.max_levels);
        Some(previous)
    }

    /// Snapshot to restore, with `current` moved back to the undo stack
    pub fn redo(&mut self, current: LayoutSnapshot) -> Option<LayoutSnapshot> {
        let next = self.redo_stack.pop()?;
        Self::push_bounded(&mut self.undo_stack, current, self.max_levels);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Rewrite temporary ids inside every snapshot after a publish
    pub fn remap_ids(&mut self, map: &HashMap<BlockId, BlockId>) {
        if map.is_empty() {
            return;
        }

        let blocks = self
            .undo_stack
            .iter_mut()
            .chain(self.redo_stack.iter_mut())
            .flat_map(|s| s.blocks.iter_mut());
        for block in blocks {
            if let Some(new_id) = map.get(&block.id) {
                block.id = new_id.clone();
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore, key: &str) -> EditorResult<()> {
        if !self.can_undo() && !self.can_redo() {
            store.remove(key)?;
            return Ok(());
        }

        let persisted = PersistedHistory {
            undo: self.undo_stack.clone(),
            redo: self.redo_stack.clone(),
            version: HISTORY_FORMAT_VERSION,
        };
        store.set(key, &serde_json::to_string(&persisted)?)?;
        Ok(())
    }

    /// Load persisted history; anything unreadable yields an empty stack
    pub fn load(store: &dyn KeyValueStore, key: &str, max_levels: usize) -> Self {
        let mut stack = Self::with_max_levels(max_levels);

        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return stack,
            Err(e) => {
                warn!(key, error = %e, "Failed to read undo history");
                return stack;
            }
        };

        match serde_json::from_str::<PersistedHistory>(&raw) {
            Ok(persisted) if persisted.version == HISTORY_FORMAT_VERSION => {
                for snapshot in persisted.undo {
                    Self::push_bounded(&mut stack.undo_stack, snapshot, max_levels);
                }
                for snapshot in persisted.redo {
                    Self::push_bounded(&mut stack.redo_stack, snapshot, max_levels);
                }
                debug!(
                    key,
                    undo = stack.undo_levels(),
                    redo = stack.redo_levels(),
                    "Loaded undo history"
                );
            }
            Ok(_) | Err(_) => warn!(key, "Discarding unreadable undo history"),
        }
        stack
    }
}

impl Default for UndoRedoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use pagegrid_common::GridRect;
    use serde_json::json;

    fn snapshot(cols: &[u32]) -> LayoutSnapshot {
        let blocks = cols
            .iter()
            .enumerate()
            .map(|(i, &col)| {
                Block::new(
                    BlockId::Persistent(i as i64 + 1),
                    1,
                    "Text",
                    GridRect::new(col, 0, 1, 1),
                    json!({}),
                    Utc::now(),
                )
            })
            .collect();
        LayoutSnapshot::new(blocks, 0)
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut stack = UndoRedoStack::new();
        stack.push(snapshot(&[]));
        stack.push(snapshot(&[0]));

        let restored = stack.undo(snapshot(&[0, 1])).unwrap();
        assert_eq!(restored, snapshot(&[0]));
        assert!(stack.can_redo());

        let redone = stack.redo(restored).unwrap();
        assert_eq!(redone, snapshot(&[0, 1]));
        assert_eq!(stack.undo_levels(), 2);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_empty_stacks() {
        let mut stack = UndoRedoStack::new();
        assert!(stack.undo(snapshot(&[])).is_none());
        assert!(stack.redo(snapshot(&[])).is_none());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = UndoRedoStack::new();
        stack.push(snapshot(&[]));
        stack.undo(snapshot(&[0]));
        assert!(stack.can_redo());

        stack.push(snapshot(&[3]));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_depth_evicts_oldest() {
        let mut stack = UndoRedoStack::with_max_levels(3);
        for col in 0..5 {
            stack.push(snapshot(&[col]));
        }
        assert_eq!(stack.undo_levels(), 3);

        let mut restored = Vec::new();
        while let Some(s) = stack.undo(snapshot(&[])) {
            restored.push(s.blocks[0].col);
        }
        assert_eq!(restored, vec![4, 3, 2]);
    }

    #[test]
    fn test_remap_ids() {
        let mut stack = UndoRedoStack::new();
        let mut snap = snapshot(&[0]);
        snap.blocks[0].id = BlockId::from("temp_x");
        stack.push(snap);

        stack.remap_ids(&HashMap::from([(BlockId::from("temp_x"), BlockId::Persistent(7))]));
        let restored = stack.undo(snapshot(&[])).unwrap();
        assert_eq!(restored.blocks[0].id, BlockId::Persistent(7));
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut stack = UndoRedoStack::new();
        stack.push(snapshot(&[1]));
        stack.push(snapshot(&[2]));
        stack.undo(snapshot(&[3]));
        stack.save(&store, "h").unwrap();

        let loaded = UndoRedoStack::load(&store, "h", 50);
        assert_eq!(loaded.undo_levels(), 1);
        assert_eq!(loaded.redo_levels(), 1);

        store.set("h", "garbage").unwrap();
        let loaded = UndoRedoStack::load(&store, "h", 50);
        assert!(!loaded.can_undo());
    }
}
