//! In-memory page store.
//!
//! Per-page block tables with one id sequence shared by every page. Batches
//! are applied in request order; a failed operation is reported in its
//! result and does not stop the rest of the batch.

use async_trait::async_trait;
use chrono::Utc;
use pagegrid_common::{
    BatchOperation, BatchRequest, BatchResponse, Block, BlockId, OperationKind, OperationResult,
    PageSnapshot, PageStore, StoreError, StoreResult,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
struct PageTable {
    blocks: Vec<Block>,
    rows: u32,
    settings: Map<String, Value>,
}

#[derive(Debug)]
pub struct MemoryPageStore {
    pages: Mutex<HashMap<i64, PageTable>>,
    next_id: AtomicI64,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Register an empty page
    pub fn create_page(&self, page_id: i64, rows: u32) -> StoreResult<()> {
        self.seed(PageSnapshot {
            page_id,
            blocks: Vec::new(),
            rows,
            settings: Map::new(),
        })
    }

    /// Insert or replace a page; the id sequence skips past its block ids
    pub fn seed(&self, snapshot: PageSnapshot) -> StoreResult<()> {
        let highest = snapshot
            .blocks
            .iter()
            .filter_map(|b| b.id.as_persistent())
            .max()
            .unwrap_or(0);
        self.next_id.fetch_max(highest + 1, Ordering::SeqCst);

        let mut pages = self.lock()?;
        debug!(page_id = snapshot.page_id, blocks = snapshot.blocks.len(), "Seeding page");
        pages.insert(
            snapshot.page_id,
            PageTable {
                blocks: snapshot.blocks,
                rows: snapshot.rows,
                settings: snapshot.settings,
            },
        );
        Ok(())
    }

    pub fn page_ids(&self) -> StoreResult<Vec<i64>> {
        let mut ids: Vec<i64> = self.lock()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<i64, PageTable>>> {
        self.pages
            .lock()
            .map_err(|_| StoreError::Transport("page table lock poisoned".to_string()))
    }

    fn allocate_id(&self) -> BlockId {
        BlockId::Persistent(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn apply_operation(
        &self,
        page_id: i64,
        page: &mut PageTable,
        op: &BatchOperation,
    ) -> OperationResult {
        let now = Utc::now();
        match op.operation {
            OperationKind::Create => {
                let mut block = match op.decode_create() {
                    Ok(block) => block,
                    Err(e) => return decode_failure(op, e),
                };

                let temp_id = block.id.clone();
                block.id = self.allocate_id();
                block.page_id = page_id;
                block.created_at = now;
                block.updated_at = now;
                page.blocks.push(block.clone());

                OperationResult {
                    operation: OperationKind::Create,
                    success: true,
                    id: Some(block.id.clone()),
                    temp_id: Some(temp_id),
                    block: Some(block),
                    error: None,
                }
            }
            OperationKind::Update => {
                let update = match op.decode_update() {
                    Ok(update) => update,
                    Err(e) => return decode_failure(op, e),
                };

                match page.blocks.iter_mut().find(|b| b.id == update.id) {
                    Some(block) => {
                        update.patch.apply_to(block);
                        block.updated_at = now;
                        OperationResult {
                            operation: OperationKind::Update,
                            success: true,
                            id: Some(update.id),
                            temp_id: None,
                            block: Some(block.clone()),
                            error: None,
                        }
                    }
                    None => {
                        OperationResult::failed(op.operation, Some(update.id), "Block not found")
                    }
                }
            }
            OperationKind::Delete => {
                let delete = match op.decode_delete() {
                    Ok(delete) => delete,
                    Err(e) => return decode_failure(op, e),
                };

                let before = page.blocks.len();
                page.blocks.retain(|b| b.id != delete.id);
                if page.blocks.len() < before {
                    OperationResult {
                        operation: OperationKind::Delete,
                        success: true,
                        id: Some(delete.id),
                        temp_id: None,
                        block: None,
                        error: None,
                    }
                } else {
                    OperationResult::failed(op.operation, Some(delete.id), "Block not found")
                }
            }
        }
    }
}

fn decode_failure(op: &BatchOperation, error: StoreError) -> OperationResult {
    OperationResult::failed(op.operation, op.target_id(), error.to_string())
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn fetch_page(&self, page_id: i64) -> StoreResult<PageSnapshot> {
        let pages = self.lock()?;
        let page = pages.get(&page_id).ok_or(StoreError::PageNotFound(page_id))?;

        Ok(PageSnapshot {
            page_id,
            blocks: page.blocks.clone(),
            rows: page.rows,
            settings: page.settings.clone(),
        })
    }

    async fn apply_batch(&self, page_id: i64, request: BatchRequest) -> StoreResult<BatchResponse> {
        let mut pages = self.lock()?;
        let page = pages
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id))?;

        let results: Vec<OperationResult> = request
            .operations
            .iter()
            .map(|op| self.apply_operation(page_id, page, op))
            .collect();

        page.rows = request.rows;
        for (key, value) in request.settings {
            page.settings.insert(key, value);
        }

        let processed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - processed;
        if failed > 0 {
            warn!(page_id, failed, "Batch applied with failures");
        }
        info!(page_id, processed, total = results.len(), "Applied batch");

        Ok(BatchResponse {
            success: true,
            blocks: page.blocks.clone(),
            operations_processed: processed,
            message: format!("Processed {} of {} operations", processed, results.len()),
            results,
        })
    }
}
