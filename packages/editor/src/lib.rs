//! # Pagegrid Editor
//!
//! Editing session for one grid page: optimistic local edits, a durable
//! draft, undo/redo, and explicit batched publishing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ layout: grid math, placement, responsive    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: LayoutOrchestrator                  │
//! │  - block operations + pointer interaction   │
//! │  - DraftChangeLog (durable, append-only)    │
//! │  - UndoRedoStack (snapshots)                │
//! │  - BatchSynchronizer (publish / discard)    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PageStore: fetch page, apply batch          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Local first**: edits apply to the in-memory collection immediately
//! 2. **Nothing is lost**: every edit is in the draft log before it is shown
//! 3. **Explicit publish**: the store only sees coalesced batches
//! 4. **Server ids win**: temporary ids are rewritten everywhere on publish
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagegrid_editor::{EditorConfig, LayoutOrchestrator, MemoryStore, NewBlock};
//!
//! let mut editor = LayoutOrchestrator::new(4, EditorConfig::default(), store, catalog, remote);
//! editor.restore_cached();
//! editor.load().await?;
//!
//! let id = editor.create_block(NewBlock::new("Heading").at(0, 0));
//! editor.move_block(&id, 2, 1)?;
//! editor.undo();
//!
//! let outcome = editor.publish().await?;
//! ```

mod config;
mod draft;
mod errors;
mod history;
mod interaction;
mod orchestrator;
mod pending;
mod storage;
mod sync;

pub use config::{EditorConfig, CONFIG_FILE_NAME};
pub use draft::{
    apply_all, Change, ChangeRecord, DraftChangeLog, ReplayResult, DEFAULT_RETENTION_HOURS,
    DRAFT_FORMAT_VERSION,
};
pub use errors::{EditorError, EditorResult};
pub use history::{LayoutSnapshot, UndoRedoStack, DEFAULT_HISTORY_DEPTH};
pub use interaction::{
    InteractionCommit, InteractionMachine, InteractionState, PointerEvent, PointerTarget,
};
pub use orchestrator::{Direction, LayoutOrchestrator, NewBlock, SyncStatus};
pub use pending::{PendingData, PendingOperation, PendingOperationSet};
pub use storage::{keys, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use sync::{
    reconcile, BatchSynchronizer, OperationFailure, PublishOutcome, PublishTicket, Reconciliation,
};

// Re-export common types for convenience
pub use pagegrid_common::{Block, BlockId, BlockPatch, GridRect, LayoutSettingsPatch};
pub use pagegrid_layout::{Breakpoint, DropIndicator, GridCell, ResponsiveLayout};
