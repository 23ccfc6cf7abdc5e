//! # Draft Change Log
//!
//! Durable, append-only record of unpublished edits for one page.
//!
//! ```text
//! edit ──record()──▶ [c1, c2, c3 …] ──persist──▶ KeyValueStore
//!                          │
//!                          ├── apply_all(changes, server blocks)  (load / replay)
//!                          └── PendingOperationSet::from_changes   (publish)
//! ```
//!
//! The log keeps every record; coalescing happens only when a batch is
//! built. Records carry strictly increasing timestamps, so "everything up to
//! timestamp T" is an exact cut.

use crate::errors::EditorResult;
use crate::storage::{keys, KeyValueStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pagegrid_common::{Block, BlockId, BlockPatch, LayoutSettingsPatch};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bumped when the persisted shape changes; older payloads are discarded
pub const DRAFT_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Types whose blocks are pointless while their content is empty
const TEXT_LIKE_TYPES: &[&str] = &["text", "heading", "paragraph"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    Create {
        #[serde(rename = "blockId")]
        block_id: BlockId,
        data: Block,
    },
    Update {
        #[serde(rename = "blockId")]
        block_id: BlockId,
        data: BlockPatch,
    },
    Delete {
        #[serde(rename = "blockId")]
        block_id: BlockId,
    },
    Layout {
        data: LayoutSettingsPatch,
    },
}

impl Change {
    pub fn create(block: Block) -> Self {
        Change::Create {
            block_id: block.id.clone(),
            data: block,
        }
    }

    pub fn update(block_id: BlockId, patch: BlockPatch) -> Self {
        Change::Update {
            block_id,
            data: patch,
        }
    }

    pub fn delete(block_id: BlockId) -> Self {
        Change::Delete { block_id }
    }

    pub fn layout(patch: LayoutSettingsPatch) -> Self {
        Change::Layout { data: patch }
    }

    pub fn block_id(&self) -> Option<&BlockId> {
        match self {
            Change::Create { block_id, .. }
            | Change::Update { block_id, .. }
            | Change::Delete { block_id } => Some(block_id),
            Change::Layout { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Create { .. } => "create",
            Change::Update { .. } => "update",
            Change::Delete { .. } => "delete",
            Change::Layout { .. } => "layout",
        }
    }

    /// Rewrite ids found in `map`; returns true if anything changed
    fn remap(&mut self, map: &HashMap<BlockId, BlockId>) -> bool {
        match self {
            Change::Create { block_id, data } => match map.get(block_id) {
                Some(new_id) => {
                    *block_id = new_id.clone();
                    data.id = new_id.clone();
                    true
                }
                None => false,
            },
            Change::Update { block_id, .. } | Change::Delete { block_id } => {
                match map.get(block_id) {
                    Some(new_id) => {
                        *block_id = new_id.clone();
                        true
                    }
                    None => false,
                }
            }
            Change::Layout { .. } => false,
        }
    }
}

/// One unpublished edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: String,

    #[serde(flatten)]
    pub change: Change,

    /// Milliseconds since the epoch
    pub timestamp: i64,
}

impl ChangeRecord {
    pub fn new(change: Change, timestamp: i64) -> Self {
        Self {
            id: format!("chg_{}", Uuid::new_v4().simple()),
            change,
            timestamp,
        }
    }

    pub fn block_id(&self) -> Option<&BlockId> {
        self.change.block_id()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDraft {
    changes: Vec<ChangeRecord>,
    timestamp: i64,
    version: u32,
}

/// Page-scoped log of unpublished edits, persisted after every mutation
pub struct DraftChangeLog {
    page_id: i64,
    key: String,
    store: Arc<dyn KeyValueStore>,
    changes: Vec<ChangeRecord>,
    retention: Duration,
}

impl DraftChangeLog {
    /// Open the log for `page_id`, discarding a corrupt payload
    pub fn open(page_id: i64, store: Arc<dyn KeyValueStore>) -> Self {
        let key = keys::draft(page_id);
        let changes = Self::read(&key, store.as_ref());
        debug!(page_id, changes = changes.len(), "Opened draft log");

        Self {
            page_id,
            key,
            store,
            changes,
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn read(key: &str, store: &dyn KeyValueStore) -> Vec<ChangeRecord> {
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read draft log, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<PersistedDraft>(&raw) {
            Ok(draft) if draft.version == DRAFT_FORMAT_VERSION => draft.changes,
            Ok(draft) => {
                warn!(key, version = draft.version, "Discarding draft log with unknown version");
                Vec::new()
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt draft log");
                Vec::new()
            }
        }
    }

    pub fn page_id(&self) -> i64 {
        self.page_id
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        self.changes.iter().map(|c| c.timestamp).max()
    }

    /// Every block id the log mentions
    pub fn touched_ids(&self) -> HashSet<BlockId> {
        self.changes
            .iter()
            .filter_map(|c| c.block_id().cloned())
            .collect()
    }

    pub fn record(&mut self, change: Change) -> EditorResult<&ChangeRecord> {
        self.record_at(change, Utc::now())
    }

    /// Append a change stamped at `now` (bumped past the previous record so
    /// timestamps stay strictly increasing) and persist the log
    pub fn record_at(&mut self, change: Change, now: DateTime<Utc>) -> EditorResult<&ChangeRecord> {
        let timestamp = match self.latest_timestamp() {
            Some(last) => now.timestamp_millis().max(last + 1),
            None => now.timestamp_millis(),
        };

        debug!(
            page_id = self.page_id,
            kind = change.kind(),
            block_id = ?change.block_id(),
            timestamp,
            "Recording change"
        );

        let index = self.changes.len();
        self.changes.push(ChangeRecord::new(change, timestamp));
        self.persist()?;
        Ok(&self.changes[index])
    }

    /// Drop records older than the retention window; returns how many went
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> EditorResult<usize> {
        let cutoff = (now - self.retention).timestamp_millis();
        let before = self.changes.len();
        self.changes.retain(|c| c.timestamp >= cutoff);

        let removed = before - self.changes.len();
        if removed > 0 {
            info!(page_id = self.page_id, removed, "Pruned expired draft records");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Drop every record of text-like blocks that were created and never
    /// given content
    pub fn prune_degenerate(&mut self) -> EditorResult<usize> {
        let degenerate: HashSet<BlockId> = self
            .changes
            .iter()
            .filter_map(|record| match &record.change {
                Change::Create { block_id, data } if is_text_like(&data.block_type) => {
                    Some(block_id)
                }
                _ => None,
            })
            .filter(|id| {
                let mut folded: Option<Block> = None;
                for record in self.changes.iter().filter(|c| c.block_id() == Some(*id)) {
                    match &record.change {
                        Change::Create { data, .. } => folded = Some(data.clone()),
                        Change::Update { data, .. } => {
                            if let Some(block) = folded.as_mut() {
                                data.apply_to(block);
                            }
                        }
                        Change::Delete { .. } => folded = None,
                        Change::Layout { .. } => {}
                    }
                }
                folded.map(|b| b.has_empty_content()).unwrap_or(false)
            })
            .cloned()
            .collect();

        if degenerate.is_empty() {
            return Ok(0);
        }

        let before = self.changes.len();
        self.changes
            .retain(|c| c.block_id().map(|id| !degenerate.contains(id)).unwrap_or(true));

        let removed = before - self.changes.len();
        info!(
            page_id = self.page_id,
            blocks = degenerate.len(),
            removed,
            "Pruned empty text blocks from draft"
        );
        self.persist()?;
        Ok(removed)
    }

    /// Rewrite temporary ids to the ids the store assigned
    pub fn remap_ids(&mut self, map: &HashMap<BlockId, BlockId>) -> EditorResult<()> {
        if map.is_empty() {
            return Ok(());
        }

        let mut changed = 0;
        for record in &mut self.changes {
            if record.change.remap(map) {
                changed += 1;
            }
        }

        if changed > 0 {
            debug!(page_id = self.page_id, changed, "Remapped draft record ids");
            self.persist()?;
        }
        Ok(())
    }

    /// Remove and return every record with `timestamp <= cutoff`
    pub fn drain_through(&mut self, cutoff: i64) -> EditorResult<Vec<ChangeRecord>> {
        let (drained, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.changes)
            .into_iter()
            .partition(|c| c.timestamp <= cutoff);
        self.changes = kept;

        debug!(
            page_id = self.page_id,
            drained = drained.len(),
            retained = self.changes.len(),
            "Drained published records"
        );
        self.persist()?;
        Ok(drained)
    }

    pub fn clear(&mut self) -> EditorResult<()> {
        self.changes.clear();
        self.store.remove(&self.key)?;
        Ok(())
    }

    fn persist(&self) -> EditorResult<()> {
        if self.changes.is_empty() {
            self.store.remove(&self.key)?;
            return Ok(());
        }

        let draft = PersistedDraft {
            changes: self.changes.clone(),
            timestamp: Utc::now().timestamp_millis(),
            version: DRAFT_FORMAT_VERSION,
        };
        self.store.set(&self.key, &serde_json::to_string(&draft)?)?;
        Ok(())
    }
}

fn is_text_like(block_type: &str) -> bool {
    TEXT_LIKE_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(block_type))
}

/// Block collection and accumulated layout settings after a replay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayResult {
    pub blocks: Vec<Block>,
    pub layout: LayoutSettingsPatch,
}

/// Replay `changes` in timestamp order on top of `blocks`.
///
/// Creates insert only when the id is absent, updates stamp `updated_at`
/// from the record, and deletes of missing ids are no-ops, so replaying
/// the same log twice gives the same result.
pub fn apply_all(changes: &[ChangeRecord], blocks: &[Block]) -> ReplayResult {
    let mut ordered: Vec<&ChangeRecord> = changes.iter().collect();
    ordered.sort_by_key(|c| c.timestamp);

    let mut blocks = blocks.to_vec();
    let mut layout = LayoutSettingsPatch::default();

    for record in ordered {
        match &record.change {
            Change::Create { block_id, data } => {
                if !blocks.iter().any(|b| &b.id == block_id) {
                    let mut block = data.clone();
                    block.id = block_id.clone();
                    blocks.push(block);
                }
            }
            Change::Update { block_id, data } => {
                match blocks.iter_mut().find(|b| &b.id == block_id) {
                    Some(block) => {
                        data.apply_to(block);
                        if let Some(at) = Utc.timestamp_millis_opt(record.timestamp).single() {
                            block.updated_at = block.updated_at.max(at);
                        }
                    }
                    None => debug!(block_id = %block_id, "Skipping update of missing block"),
                }
            }
            Change::Delete { block_id } => blocks.retain(|b| &b.id != block_id),
            Change::Layout { data } => layout.merge(data),
        }
    }

    ReplayResult { blocks, layout }
}
