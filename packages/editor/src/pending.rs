//! # Pending Operation Set
//!
//! The reduction of the draft log into the smallest batch that produces the
//! same end state. One operation per entity, in first-touch order:
//!
//! ```text
//! create + update*          → create (updates folded into the block)
//! update + update*          → update (later keys win)
//! any    + delete           → delete
//! delete + create (stored)  → update carrying the full block
//! ```
//!
//! Deletes of temporary ids are dropped from the request; the store never
//! saw those blocks.

use crate::draft::{Change, ChangeRecord};
use pagegrid_common::{
    BatchOperation, BatchRequest, Block, BlockId, BlockPatch, LayoutSettingsPatch, OperationKind,
    StoreError,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PendingData {
    Create(Block),
    Update(BlockPatch),
    Delete,
}

/// Net effect on one entity
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub block_id: BlockId,
    pub data: PendingData,

    /// Latest timestamp among the folded records
    pub timestamp: i64,
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self.data {
            PendingData::Create(_) => OperationKind::Create,
            PendingData::Update(_) => OperationKind::Update,
            PendingData::Delete => OperationKind::Delete,
        }
    }

    fn to_batch_operation(&self) -> Result<BatchOperation, StoreError> {
        match &self.data {
            PendingData::Create(block) => BatchOperation::create(block, self.timestamp),
            PendingData::Update(patch) => {
                BatchOperation::update(self.block_id.clone(), patch.clone(), self.timestamp)
            }
            PendingData::Delete => BatchOperation::delete(self.block_id.clone(), self.timestamp),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PendingOperationSet {
    operations: Vec<PendingOperation>,
    index: HashMap<BlockId, usize>,
    layout: LayoutSettingsPatch,
    cutoff: Option<i64>,
}

impl PendingOperationSet {
    pub fn from_changes(changes: &[ChangeRecord]) -> Self {
        let mut ordered: Vec<&ChangeRecord> = changes.iter().collect();
        ordered.sort_by_key(|c| c.timestamp);

        let mut set = Self::default();
        for record in ordered {
            set.fold(record);
        }
        set
    }

    fn fold(&mut self, record: &ChangeRecord) {
        self.cutoff = Some(self.cutoff.map_or(record.timestamp, |c| c.max(record.timestamp)));

        let (block_id, incoming) = match &record.change {
            Change::Layout { data } => {
                self.layout.merge(data);
                return;
            }
            Change::Create { block_id, data } => (block_id, PendingData::Create(data.clone())),
            Change::Update { block_id, data } => (block_id, PendingData::Update(data.clone())),
            Change::Delete { block_id } => (block_id, PendingData::Delete),
        };

        let Some(&slot) = self.index.get(block_id) else {
            self.index.insert(block_id.clone(), self.operations.len());
            self.operations.push(PendingOperation {
                block_id: block_id.clone(),
                data: incoming,
                timestamp: record.timestamp,
            });
            return;
        };

        let existing = &mut self.operations[slot];
        let previous = std::mem::replace(&mut existing.data, PendingData::Delete);
        existing.data = match (previous, incoming) {
            (_, PendingData::Delete) => PendingData::Delete,

            (PendingData::Create(mut block), PendingData::Update(patch)) => {
                patch.apply_to(&mut block);
                PendingData::Create(block)
            }
            (PendingData::Update(mut merged), PendingData::Update(patch)) => {
                merged.merge(&patch);
                PendingData::Update(merged)
            }
            (PendingData::Delete, PendingData::Update(_)) => {
                debug!(block_id = %block_id, "Ignoring update after delete");
                PendingData::Delete
            }

            // Re-created after a delete (undo): a stored row still exists
            (PendingData::Delete, PendingData::Create(block))
            | (PendingData::Update(_), PendingData::Create(block))
                if !block_id.is_temporary() =>
            {
                PendingData::Update(BlockPatch::from_block(&block))
            }
            (_, PendingData::Create(block)) => PendingData::Create(block),
        };
        existing.timestamp = existing.timestamp.max(record.timestamp);
    }

    pub fn operations(&self) -> &[PendingOperation] {
        &self.operations
    }

    pub fn get(&self, block_id: &BlockId) -> Option<&PendingOperation> {
        self.index.get(block_id).map(|&i| &self.operations[i])
    }

    /// Accumulated layout settings, empty if none were recorded
    pub fn layout(&self) -> &LayoutSettingsPatch {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.layout.is_empty()
    }

    /// Latest record timestamp covered by this set
    pub fn cutoff(&self) -> Option<i64> {
        self.cutoff
    }

    /// Operations that will actually be sent
    pub fn outgoing(&self) -> impl Iterator<Item = &PendingOperation> {
        self.operations
            .iter()
            .filter(|op| !(op.data == PendingData::Delete && op.block_id.is_temporary()))
    }

    pub fn to_batch_request(&self, rows: u32) -> Result<BatchRequest, StoreError> {
        let operations = self
            .outgoing()
            .map(PendingOperation::to_batch_operation)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchRequest {
            operations,
            rows: self.layout.rows.unwrap_or(rows),
            settings: self.layout.extra.clone(),
        })
    }
}
