//! # Batch Synchronization
//!
//! Turns the draft log into one batch request and folds the store's answer
//! back into local state.
//!
//! ```text
//! begin(log)  ──▶ PublishTicket { request, cutoff }      (flag: in flight)
//!                        │ apply_batch (network)
//! finish(response) ──▶ Reconciliation { blocks, id_map, failures }
//! ```
//!
//! The cutoff is the newest record timestamp the request covers. Records
//! made after it (while the request was out) stay in the log and are replayed
//! over the reconciled collection.

use crate::draft::DraftChangeLog;
use crate::errors::{EditorError, EditorResult};
use crate::pending::PendingOperationSet;
use chrono::{DateTime, Utc};
use pagegrid_common::{Block, BlockId, BatchRequest, BatchResponse, OperationKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A publish that has been built and not yet answered
#[derive(Debug, Clone)]
pub struct PublishTicket {
    pub request: BatchRequest,

    /// Latest draft timestamp covered by `request`
    pub cutoff: i64,

    pub started_at: DateTime<Utc>,
}

/// An operation the store refused
#[derive(Debug, Clone, PartialEq)]
pub struct OperationFailure {
    pub operation: OperationKind,
    pub block_id: Option<BlockId>,
    pub error: String,
}

/// Merged state after a successful batch
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub blocks: Vec<Block>,
    pub id_map: HashMap<BlockId, BlockId>,
    pub failures: Vec<OperationFailure>,
    pub processed: usize,
    pub message: String,
}

/// What a publish reports to the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOutcome {
    pub processed: usize,

    /// Temporary id → persisted id
    pub id_map: HashMap<BlockId, BlockId>,

    pub failures: Vec<OperationFailure>,
}

#[derive(Debug, Default)]
pub struct BatchSynchronizer {
    in_flight: bool,
}

impl BatchSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Build the request for everything in `log`; `None` when there is
    /// nothing to publish
    pub fn begin(&mut self, log: &DraftChangeLog, rows: u32) -> EditorResult<Option<PublishTicket>> {
        if self.in_flight {
            return Err(EditorError::PublishInFlight);
        }

        let pending = PendingOperationSet::from_changes(log.changes());
        let Some(cutoff) = pending.cutoff() else {
            return Ok(None);
        };

        let request = pending.to_batch_request(rows)?;
        debug!(
            page_id = log.page_id(),
            records = log.len(),
            operations = request.operations.len(),
            cutoff,
            "Built publish batch"
        );

        self.in_flight = true;
        Ok(Some(PublishTicket {
            request,
            cutoff,
            started_at: Utc::now(),
        }))
    }

    /// The request failed before the store answered
    pub fn abort(&mut self) {
        self.in_flight = false;
    }

    pub fn finish(
        &mut self,
        ticket: &PublishTicket,
        response: BatchResponse,
        local: &[Block],
    ) -> EditorResult<Reconciliation> {
        self.in_flight = false;

        if !response.success {
            let message = if response.message.is_empty() {
                "batch rejected".to_string()
            } else {
                response.message
            };
            return Err(EditorError::PublishRejected(message));
        }

        let id_map = response.id_mapping();
        let failures: Vec<OperationFailure> = response
            .failures()
            .map(|r| OperationFailure {
                operation: r.operation,
                block_id: r.id.clone().or_else(|| r.temp_id.clone()),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();

        for failure in &failures {
            warn!(
                operation = failure.operation.as_str(),
                block_id = ?failure.block_id,
                error = %failure.error,
                "Store rejected operation"
            );
        }

        debug!(
            sent = ticket.request.operations.len(),
            processed = response.operations_processed,
            mapped = id_map.len(),
            elapsed_ms = (Utc::now() - ticket.started_at).num_milliseconds(),
            "Batch answered"
        );

        Ok(Reconciliation {
            blocks: reconcile(&response.blocks, local, &id_map),
            id_map,
            failures,
            processed: response.operations_processed,
            message: response.message,
        })
    }
}

/// Server blocks are the base. A local block edited after the store's copy
/// keeps its fields under the store's id, page and creation time. Local
/// blocks that never got an id are carried over unchanged.
pub fn reconcile(
    server: &[Block],
    local: &[Block],
    id_map: &HashMap<BlockId, BlockId>,
) -> Vec<Block> {
    let mut merged: Vec<Block> = server
        .iter()
        .map(|remote| {
            let newer = local.iter().find(|l| {
                (l.id == remote.id || id_map.get(&l.id) == Some(&remote.id))
                    && l.updated_at > remote.updated_at
            });

            match newer {
                Some(l) => {
                    let mut block = l.clone();
                    block.id = remote.id.clone();
                    block.page_id = remote.page_id;
                    block.created_at = remote.created_at;
                    block
                }
                None => remote.clone(),
            }
        })
        .collect();

    merged.extend(
        local
            .iter()
            .filter(|l| l.id.is_temporary() && !id_map.contains_key(&l.id))
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Change;
    use crate::storage::MemoryStore;
    use chrono::Duration;
    use pagegrid_common::{GridRect, OperationResult};
    use serde_json::json;
    use std::sync::Arc;

    fn block(id: BlockId, col: u32, at: DateTime<Utc>) -> Block {
        Block::new(id, 1, "Text", GridRect::new(col, 0, 1, 1), json!({}), at)
    }

    fn response(blocks: Vec<Block>, results: Vec<OperationResult>) -> BatchResponse {
        BatchResponse {
            success: true,
            blocks,
            operations_processed: results.len(),
            results,
            message: String::new(),
        }
    }

    #[test]
    fn test_begin_rejects_concurrent_publish() {
        let mut log = DraftChangeLog::open(1, Arc::new(MemoryStore::new()));
        log.record(Change::delete(BlockId::Persistent(3))).unwrap();

        let mut sync = BatchSynchronizer::new();
        let ticket = sync.begin(&log, 10).unwrap().unwrap();
        assert_eq!(ticket.cutoff, log.latest_timestamp().unwrap());
        assert!(matches!(sync.begin(&log, 10), Err(EditorError::PublishInFlight)));

        sync.abort();
        assert!(sync.begin(&log, 10).unwrap().is_some());
    }

    #[test]
    fn test_begin_with_empty_log() {
        let log = DraftChangeLog::open(1, Arc::new(MemoryStore::new()));
        let mut sync = BatchSynchronizer::new();
        assert!(sync.begin(&log, 10).unwrap().is_none());
        assert!(!sync.is_in_flight());
    }

    #[test]
    fn test_finish_rejected_batch() {
        let mut log = DraftChangeLog::open(1, Arc::new(MemoryStore::new()));
        log.record(Change::delete(BlockId::Persistent(3))).unwrap();
        let mut sync = BatchSynchronizer::new();
        let ticket = sync.begin(&log, 10).unwrap().unwrap();

        let mut rejected = response(vec![], vec![]);
        rejected.success = false;
        rejected.message = "database unavailable".to_string();

        let err = sync.finish(&ticket, rejected, &[]).unwrap_err();
        assert!(matches!(err, EditorError::PublishRejected(m) if m == "database unavailable"));
        assert!(!sync.is_in_flight());
    }

    #[test]
    fn test_finish_maps_ids_and_collects_failures() {
        let mut log = DraftChangeLog::open(1, Arc::new(MemoryStore::new()));
        log.record(Change::delete(BlockId::Persistent(9))).unwrap();
        let mut sync = BatchSynchronizer::new();
        let ticket = sync.begin(&log, 10).unwrap().unwrap();

        let now = Utc::now();
        let stored = block(BlockId::Persistent(7), 0, now);
        let results = vec![
            OperationResult {
                operation: OperationKind::Create,
                success: true,
                block: Some(stored.clone()),
                id: Some(BlockId::Persistent(7)),
                temp_id: Some(BlockId::from("temp_x")),
                error: None,
            },
            OperationResult::failed(
                OperationKind::Delete,
                Some(BlockId::Persistent(9)),
                "Block not found",
            ),
        ];

        let local = vec![block(BlockId::from("temp_x"), 0, now - Duration::seconds(1))];
        let rec = sync
            .finish(&ticket, response(vec![stored.clone()], results), &local)
            .unwrap();

        assert_eq!(rec.id_map[&BlockId::from("temp_x")], BlockId::Persistent(7));
        assert_eq!(rec.failures.len(), 1);
        assert_eq!(rec.failures[0].block_id, Some(BlockId::Persistent(9)));
        assert_eq!(rec.blocks, vec![stored]);
    }

    #[test]
    fn test_reconcile_prefers_newer_local_edit() {
        let now = Utc::now();
        let mut remote = block(BlockId::Persistent(7), 0, now - Duration::seconds(10));
        remote.created_at = now - Duration::days(1);

        let newer_local = block(BlockId::from("temp_x"), 5, now);
        let unpublished = block(BlockId::from("temp_y"), 9, now);
        let map = HashMap::from([(BlockId::from("temp_x"), BlockId::Persistent(7))]);

        let merged = reconcile(&[remote.clone()], &[newer_local, unpublished.clone()], &map);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, BlockId::Persistent(7));
        assert_eq!(merged[0].col, 5);
        assert_eq!(merged[0].created_at, remote.created_at);
        assert_eq!(merged[1], unpublished);
    }
}
