//! # Layout Orchestrator
//!
//! One editing session on one page. Owns every piece of mutable state (the
//! block collection, selection, rows, draft log, history, interaction state,
//! sync status, derived responsive layouts) and the handles to the
//! collaborators it talks to:
//!
//! - [`KeyValueStore`]: local durability (draft, cached blocks, history)
//! - [`ComponentCatalog`]: default size and content per block type
//! - [`PageStore`]: the remote fetch and batch-apply contract
//!
//! Every mutation goes through the same steps: snapshot for undo, change the
//! collection, record the change in the draft log, persist the collection,
//! refresh derived layouts. Publishing is explicit.
//!
//! Switching pages means building a new orchestrator; dropping an
//! in-progress `load()` future abandons the previous page's fetch.

use crate::config::EditorConfig;
use crate::draft::{apply_all, Change, DraftChangeLog};
use crate::errors::{EditorError, EditorResult};
use crate::history::{LayoutSnapshot, UndoRedoStack};
use crate::interaction::{InteractionCommit, InteractionMachine, InteractionState, PointerEvent};
use crate::pending::PendingOperationSet;
use crate::storage::{keys, KeyValueStore};
use crate::sync::{BatchSynchronizer, PublishOutcome, PublishTicket};
use chrono::Utc;
use pagegrid_common::{
    BatchResponse, Block, BlockId, BlockPatch, ComponentCatalog, GridRect, LayoutSettingsPatch,
    PageStore, StoreResult,
};
use pagegrid_layout::{
    needs_regeneration, Breakpoint, DropIndicator, GridCell, GridCoordinateSystem,
    LayoutSignature, ResponsiveLayout, ResponsiveLayoutTransformer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the session stands with respect to the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error(String),
}

/// Keyboard move direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Request to add a block; unset fields come from the component catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlock {
    pub block_type: String,
    pub preferred: Option<GridCell>,
    pub size: Option<(u32, u32)>,
    pub content: Option<Value>,
}

impl NewBlock {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            preferred: None,
            size: None,
            content: None,
        }
    }

    pub fn at(mut self, col: u32, row: u32) -> Self {
        self.preferred = Some(GridCell::new(col, row));
        self
    }

    pub fn sized(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = Some(content);
        self
    }
}

/// Last known block collection, for instant display before the fetch
#[derive(Debug, Serialize, Deserialize)]
struct CachedBlocks {
    blocks: Vec<Block>,
    rows: u32,
    timestamp: i64,
}

pub struct LayoutOrchestrator {
    page_id: i64,
    config: EditorConfig,
    grid: GridCoordinateSystem,
    transformer: ResponsiveLayoutTransformer,

    blocks: Vec<Block>,
    selected: Option<BlockId>,
    rows: u32,

    /// Layout settings recorded but not yet published
    layout_settings: LayoutSettingsPatch,

    log: DraftChangeLog,
    history: UndoRedoStack,
    interaction: InteractionMachine,
    sync: BatchSynchronizer,
    status: SyncStatus,

    derived: Vec<ResponsiveLayout>,
    signature: Option<LayoutSignature>,

    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn ComponentCatalog>,
    remote: Arc<dyn PageStore>,
}

impl LayoutOrchestrator {
    pub fn new(
        page_id: i64,
        config: EditorConfig,
        store: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn ComponentCatalog>,
        remote: Arc<dyn PageStore>,
    ) -> Self {
        let grid = GridCoordinateSystem::new(config.grid.desktop.clone(), config.container_width)
            .with_max_rows(config.grid.max_rows);
        let transformer = ResponsiveLayoutTransformer::new(config.grid.clone());
        let log =
            DraftChangeLog::open(page_id, store.clone()).with_retention(config.draft_retention());
        let history =
            UndoRedoStack::load(store.as_ref(), &keys::history(page_id), config.history_depth);

        Self {
            page_id,
            rows: config.grid.min_rows,
            config,
            grid,
            transformer,
            blocks: Vec::new(),
            selected: None,
            layout_settings: LayoutSettingsPatch::default(),
            log,
            history,
            interaction: InteractionMachine::new(),
            sync: BatchSynchronizer::new(),
            status: SyncStatus::Idle,
            derived: Vec::new(),
            signature: None,
            store,
            catalog,
            remote,
        }
    }

    // ---- read access ------------------------------------------------------

    pub fn page_id(&self) -> i64 {
        self.page_id
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridCoordinateSystem {
        &self.grid
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    /// Rows to render: the configured count, grown to fit every block
    pub fn rows(&self) -> u32 {
        self.rows
            .max(GridCoordinateSystem::rows_needed(&self.blocks, self.config.grid.min_rows))
    }

    pub fn layout_settings(&self) -> &LayoutSettingsPatch {
        &self.layout_settings
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn draft(&self) -> &DraftChangeLog {
        &self.log
    }

    /// What a publish would send right now
    pub fn pending_operations(&self) -> PendingOperationSet {
        PendingOperationSet::from_changes(self.log.changes())
    }

    pub fn has_unpublished_changes(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    fn index_of(&self, id: &BlockId) -> EditorResult<usize> {
        self.blocks
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))
    }

    // ---- lifecycle --------------------------------------------------------

    /// Show the last persisted collection while the fetch is in flight
    pub fn restore_cached(&mut self) -> bool {
        let key = keys::blocks(self.page_id);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                warn!(page_id = self.page_id, error = %e, "Failed to read cached blocks");
                return false;
            }
        };

        match serde_json::from_str::<CachedBlocks>(&raw) {
            Ok(cached) => {
                debug!(page_id = self.page_id, blocks = cached.blocks.len(), "Restored cached blocks");
                self.blocks = cached.blocks;
                self.rows = cached.rows;
                self.regenerate_responsive_layouts();
                true
            }
            Err(e) => {
                warn!(page_id = self.page_id, error = %e, "Discarding corrupt cached blocks");
                false
            }
        }
    }

    /// Fetch the page and replay unpublished edits on top of it
    pub async fn load(&mut self) -> EditorResult<()> {
        let snapshot = match self.remote.fetch_page(self.page_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(page_id = self.page_id, error = %e, "Failed to fetch page");
                self.status = SyncStatus::Error(e.to_string());
                return Err(e.into());
            }
        };

        if let Err(e) = self.log.prune_expired(Utc::now()) {
            warn!(page_id = self.page_id, error = %e, "Failed to persist pruned draft");
        }
        if let Err(e) = self.log.prune_degenerate() {
            warn!(page_id = self.page_id, error = %e, "Failed to persist pruned draft");
        }

        let replay = apply_all(self.log.changes(), &snapshot.blocks);
        info!(
            page_id = self.page_id,
            stored = snapshot.blocks.len(),
            replayed = self.log.len(),
            "Loaded page"
        );

        self.blocks = replay.blocks;
        self.rows = replay.layout.rows.unwrap_or(snapshot.rows);
        self.layout_settings = replay.layout;
        self.drop_stale_selection();
        self.status = SyncStatus::Idle;
        self.after_mutation();
        Ok(())
    }

    // ---- block operations -------------------------------------------------

    /// Add a block with catalog defaults; it gets a temporary id and the
    /// selection
    pub fn create_block(&mut self, new: NewBlock) -> BlockId {
        let defaults = self.catalog.defaults_or_fallback(&new.block_type);
        let (width, height) = new.size.unwrap_or((defaults.width, defaults.height));
        let content = new.content.unwrap_or(defaults.options);
        let preferred = new.preferred.unwrap_or(GridCell::new(0, 0));

        let rect = self.grid.place(
            GridRect::new(preferred.col, preferred.row, width, height),
            &self.blocks,
            None,
        );
        let block = Block::new(
            BlockId::temporary(),
            self.page_id,
            new.block_type,
            rect,
            content,
            Utc::now(),
        );

        debug!(block_id = %block.id, block_type = %block.block_type, ?rect, "Creating block");
        self.insert_block(block)
    }

    /// Copy a block into the first free cell below it
    pub fn duplicate_block(&mut self, id: &BlockId) -> EditorResult<BlockId> {
        let source = self.blocks[self.index_of(id)?].clone();
        let below = source.placement().at(source.col, source.placement().end_row());
        let rect = self.grid.place(below, &self.blocks, None);

        let now = Utc::now();
        let mut copy = source;
        copy.id = BlockId::temporary();
        copy.set_placement(rect);
        copy.created_at = now;
        copy.updated_at = now;

        debug!(source = %id, block_id = %copy.id, ?rect, "Duplicating block");
        Ok(self.insert_block(copy))
    }

    fn insert_block(&mut self, block: Block) -> BlockId {
        self.snapshot_for_undo();
        let id = block.id.clone();
        self.blocks.push(block.clone());
        self.record(Change::create(block));
        self.selected = Some(id.clone());
        self.after_mutation();
        id
    }

    /// Apply a partial update; placement changes are wrapped and resolved
    /// against collisions. A patch that changes nothing records nothing.
    pub fn update_block(&mut self, id: &BlockId, patch: BlockPatch) -> EditorResult<()> {
        let index = self.index_of(id)?;
        let before = &self.blocks[index];

        let mut after = before.clone();
        patch.apply_to(&mut after);
        if patch.touches_placement() {
            let rect = self.grid.place(after.placement(), &self.blocks, Some(id));
            after.set_placement(rect);
        }

        let effective = BlockPatch::diff(before, &after);
        if effective.is_empty() {
            debug!(block_id = %id, "Update changes nothing");
            return Ok(());
        }

        self.snapshot_for_undo();
        after.updated_at = Utc::now();
        self.blocks[index] = after;
        self.record(Change::update(id.clone(), effective));
        self.after_mutation();
        Ok(())
    }

    pub fn move_block(&mut self, id: &BlockId, col: u32, row: u32) -> EditorResult<()> {
        self.update_block(
            id,
            BlockPatch {
                col: Some(col),
                row: Some(row),
                ..Default::default()
            },
        )
    }

    /// Keyboard move by one cell. `Right` past the last column wraps to
    /// column 0 of the next row, like any other move.
    pub fn nudge(&mut self, id: &BlockId, direction: Direction) -> EditorResult<()> {
        let block = &self.blocks[self.index_of(id)?];
        let (col, row) = match direction {
            Direction::Left => (block.col.saturating_sub(1), block.row),
            Direction::Right => (block.col.saturating_add(1), block.row),
            Direction::Up => (block.col, block.row.saturating_sub(1)),
            Direction::Down => (block.col, block.row.saturating_add(1)),
        };
        self.move_block(id, col, row)
    }

    /// Width is clamped to the columns right of the block's origin
    pub fn resize_block(&mut self, id: &BlockId, width: u32, height: u32) -> EditorResult<()> {
        let block = &self.blocks[self.index_of(id)?];
        let max_width = self.grid.columns().saturating_sub(block.col).max(1);

        self.update_block(
            id,
            BlockPatch {
                width: Some(width.clamp(1, max_width)),
                height: Some(height.max(1)),
                ..Default::default()
            },
        )
    }

    pub fn delete_block(&mut self, id: &BlockId) -> EditorResult<()> {
        let index = self.index_of(id)?;

        self.snapshot_for_undo();
        self.blocks.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        debug!(block_id = %id, "Deleting block");
        self.record(Change::delete(id.clone()));
        self.after_mutation();
        Ok(())
    }

    pub fn select(&mut self, id: &BlockId) -> EditorResult<()> {
        self.index_of(id)?;
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn update_layout_settings(&mut self, patch: LayoutSettingsPatch) {
        if patch.is_empty() {
            return;
        }

        self.layout_settings.merge(&patch);
        if let Some(rows) = patch.rows {
            self.rows = rows;
        }
        self.record(Change::layout(patch));
        self.persist_blocks();
    }

    // ---- history ----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let current = self.current_snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                debug!(page_id = self.page_id, levels = self.history.undo_levels(), "Undo");
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.current_snapshot();
        match self.history.redo(current) {
            Some(next) => {
                debug!(page_id = self.page_id, levels = self.history.redo_levels(), "Redo");
                self.restore(next);
                true
            }
            None => false,
        }
    }

    fn current_snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot::new(self.blocks.clone(), Utc::now().timestamp_millis())
    }

    fn snapshot_for_undo(&mut self) {
        let snapshot = self.current_snapshot();
        self.history.push(snapshot);
    }

    /// Swap in a snapshot and record the changes that lead to it, so the
    /// draft log always describes the visible collection
    fn restore(&mut self, snapshot: LayoutSnapshot) {
        let before = std::mem::replace(&mut self.blocks, snapshot.blocks);
        let now = Utc::now();
        let mut changes = Vec::new();

        for old in &before {
            if !self.blocks.iter().any(|b| b.id == old.id) {
                changes.push(Change::delete(old.id.clone()));
            }
        }
        for block in &mut self.blocks {
            match before.iter().find(|b| b.id == block.id) {
                None => {
                    block.updated_at = now;
                    changes.push(Change::create(block.clone()));
                }
                Some(old) => {
                    let patch = BlockPatch::diff(old, block);
                    if !patch.is_empty() {
                        block.updated_at = now;
                        changes.push(Change::update(block.id.clone(), patch));
                    }
                }
            }
        }

        for change in changes {
            self.record(change);
        }
        self.selected = None;
        self.interaction.cancel();
        self.after_mutation();
    }

    // ---- pointer ----------------------------------------------------------

    /// Feed a pointer event; returns the live drop preview
    pub fn pointer(&mut self, event: PointerEvent) -> EditorResult<Option<DropIndicator>> {
        match self.interaction.handle(event, &self.grid, &self.blocks) {
            Some(InteractionCommit::Move { block_id, col, row }) => {
                self.move_block(&block_id, col, row)?
            }
            Some(InteractionCommit::Resize {
                block_id,
                width,
                height,
            }) => self.resize_block(&block_id, width, height)?,
            None => {}
        }
        Ok(self.interaction.preview().copied())
    }

    pub fn cancel_interaction(&mut self) {
        self.interaction.cancel();
    }

    // ---- responsive -------------------------------------------------------

    /// Arrangement of the current blocks on `breakpoint`
    pub fn responsive_layout(&self, breakpoint: Breakpoint) -> ResponsiveLayout {
        match self.derived.iter().find(|l| l.breakpoint == breakpoint) {
            Some(layout) => layout.clone(),
            None => self.transformer.transform(&self.blocks, breakpoint),
        }
    }

    /// Rebuild every derived layout if the desktop arrangement changed
    pub fn regenerate_responsive_layouts(&mut self) -> bool {
        let signature = LayoutSignature::of(&self.blocks);
        if !needs_regeneration(self.signature.as_ref(), &signature) {
            return false;
        }

        self.derived = self.transformer.transform_all(&self.blocks);
        self.signature = Some(signature);
        debug!(page_id = self.page_id, blocks = self.blocks.len(), "Regenerated responsive layouts");
        true
    }

    // ---- sync -------------------------------------------------------------

    /// Send every unpublished change as one batch
    pub async fn publish(&mut self) -> EditorResult<PublishOutcome> {
        let Some(ticket) = self.begin_publish()? else {
            return Ok(PublishOutcome::default());
        };
        let result = self
            .remote
            .apply_batch(self.page_id, ticket.request.clone())
            .await;
        self.complete_publish(ticket, result)
    }

    /// First half of [`publish`](Self::publish): build the batch and mark it
    /// in flight. Edits made before `complete_publish` are kept.
    pub fn begin_publish(&mut self) -> EditorResult<Option<PublishTicket>> {
        let ticket = self.sync.begin(&self.log, self.rows())?;
        if ticket.is_some() {
            self.status = SyncStatus::Saving;
        }
        Ok(ticket)
    }

    pub fn complete_publish(
        &mut self,
        ticket: PublishTicket,
        result: StoreResult<BatchResponse>,
    ) -> EditorResult<PublishOutcome> {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.sync.abort();
                warn!(page_id = self.page_id, error = %e, "Publish failed, draft kept");
                self.status = SyncStatus::Error(e.to_string());
                return Err(e.into());
            }
        };

        let reconciliation = match self.sync.finish(&ticket, response, &self.blocks) {
            Ok(reconciliation) => reconciliation,
            Err(e) => {
                warn!(page_id = self.page_id, error = %e, "Publish rejected, draft kept");
                self.status = SyncStatus::Error(e.to_string());
                return Err(e);
            }
        };

        let id_map = &reconciliation.id_map;
        if let Err(e) = self.log.remap_ids(id_map) {
            warn!(page_id = self.page_id, error = %e, "Failed to persist remapped draft");
        }
        self.history.remap_ids(id_map);
        if let Some(assigned) = self.selected.as_ref().and_then(|s| id_map.get(s)).cloned() {
            self.selected = Some(assigned);
        }
        if let Err(e) = self.log.drain_through(ticket.cutoff) {
            warn!(page_id = self.page_id, error = %e, "Failed to persist drained draft");
        }

        // Blocks the store never assigned an id whose create left the log
        let touched = self.log.touched_ids();
        let requeue: Vec<Block> = reconciliation
            .blocks
            .iter()
            .filter(|b| b.id.is_temporary() && !touched.contains(&b.id))
            .cloned()
            .collect();

        let replay = apply_all(self.log.changes(), &reconciliation.blocks);
        self.blocks = replay.blocks;
        self.layout_settings = replay.layout;
        for block in requeue {
            warn!(block_id = %block.id, "Block was not created, queued for next publish");
            self.record(Change::create(block));
        }
        self.drop_stale_selection();

        info!(
            page_id = self.page_id,
            processed = reconciliation.processed,
            mapped = reconciliation.id_map.len(),
            failures = reconciliation.failures.len(),
            retained = self.log.len(),
            "Published page"
        );

        self.status = SyncStatus::Saved;
        self.after_mutation();

        Ok(PublishOutcome {
            processed: reconciliation.processed,
            id_map: reconciliation.id_map,
            failures: reconciliation.failures,
        })
    }

    /// Throw away every unpublished change and reload the stored page
    pub async fn discard(&mut self) -> EditorResult<()> {
        if self.sync.is_in_flight() {
            return Err(EditorError::PublishInFlight);
        }

        let snapshot = self.remote.fetch_page(self.page_id).await.map_err(|e| {
            warn!(page_id = self.page_id, error = %e, "Failed to fetch page for discard");
            e
        })?;

        if let Err(e) = self.log.clear() {
            warn!(page_id = self.page_id, error = %e, "Failed to clear persisted draft");
        }
        self.history.clear();
        self.interaction.cancel();
        self.selected = None;
        self.blocks = snapshot.blocks;
        self.rows = snapshot.rows;
        self.layout_settings = LayoutSettingsPatch::default();
        self.status = SyncStatus::Idle;

        info!(page_id = self.page_id, blocks = self.blocks.len(), "Discarded draft");
        self.after_mutation();
        Ok(())
    }

    // ---- persistence ------------------------------------------------------

    fn record(&mut self, change: Change) {
        if let Err(e) = self.log.record(change) {
            warn!(page_id = self.page_id, error = %e, "Failed to persist draft change");
        }
    }

    fn drop_stale_selection(&mut self) {
        if self
            .selected
            .as_ref()
            .is_some_and(|id| self.block(id).is_none())
        {
            self.selected = None;
        }
    }

    fn write_cached_blocks(&self) -> EditorResult<()> {
        let cached = CachedBlocks {
            blocks: self.blocks.clone(),
            rows: self.rows,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.store
            .set(&keys::blocks(self.page_id), &serde_json::to_string(&cached)?)?;
        Ok(())
    }

    fn persist_blocks(&self) {
        if let Err(e) = self.write_cached_blocks() {
            warn!(page_id = self.page_id, error = %e, "Failed to cache blocks");
        }
    }

    fn after_mutation(&mut self) {
        self.persist_blocks();
        if let Err(e) = self
            .history
            .save(self.store.as_ref(), &keys::history(self.page_id))
        {
            warn!(page_id = self.page_id, error = %e, "Failed to persist undo history");
        }
        self.regenerate_responsive_layouts();
    }
}
