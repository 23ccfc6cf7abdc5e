//! Storage collaborator seam.
//!
//! The editor never talks to a database directly. It fetches a page and
//! hands ordered batches to whatever implements [`PageStore`]: an HTTP
//! client in production, the in-memory store in tests.

use crate::contract::{BatchRequest, BatchResponse, PageSnapshot};
use crate::result::StoreResult;
use async_trait::async_trait;

#[async_trait]
pub trait PageStore: Send + Sync {
    /// Fetch the persisted blocks and layout settings of a page
    async fn fetch_page(&self, page_id: i64) -> StoreResult<PageSnapshot>;

    /// Apply operations in order and return the fresh collection
    async fn apply_batch(&self, page_id: i64, request: BatchRequest) -> StoreResult<BatchResponse>;
}
