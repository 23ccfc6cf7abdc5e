//! `PageStore` over HTTP, speaking to the router in [`crate::server`].
//!
//! Status codes map back onto [`StoreError`] the same way `ApiError`
//! produced them, so a remote store fails like a local one.

use async_trait::async_trait;
use pagegrid_common::{BatchRequest, BatchResponse, PageSnapshot, PageStore, StoreError, StoreResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for a single fetch or batch request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpPageStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageStore {
    /// Client for the store served at `base_url` (e.g. `http://127.0.0.1:3030`)
    pub fn new(base_url: impl Into<String>) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page_url(&self, page_id: i64) -> String {
        format!("{}/api/pages/{}", self.base_url, page_id)
    }
}

#[async_trait]
impl PageStore for HttpPageStore {
    async fn fetch_page(&self, page_id: i64) -> StoreResult<PageSnapshot> {
        let response = self
            .client
            .get(self.page_url(page_id))
            .send()
            .await
            .map_err(transport)?;
        read_json(response, page_id).await
    }

    async fn apply_batch(&self, page_id: i64, request: BatchRequest) -> StoreResult<BatchResponse> {
        debug!(page_id, operations = request.operations.len(), "Sending batch");
        let response = self
            .client
            .post(format!("{}/batch", self.page_url(page_id)))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        read_json(response, page_id).await
    }
}

fn transport(error: reqwest::Error) -> StoreError {
    StoreError::Transport(error.to_string())
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, page_id: i64) -> StoreResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(page_id, status = status.as_u16(), %message, "Page store request failed");

    Err(match status {
        StatusCode::NOT_FOUND => StoreError::PageNotFound(page_id),
        StatusCode::BAD_REQUEST => StoreError::InvalidOperation(message),
        StatusCode::UNPROCESSABLE_ENTITY => StoreError::Rejected(message),
        other => StoreError::Transport(format!("HTTP {}: {}", other.as_u16(), message)),
    })
}

/// `message` of an error body, or the raw body when it is not one
fn error_message(body: &str) -> String {
    serde_json::from_str::<BatchResponse>(body)
        .map(|r| r.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let store = HttpPageStore::new("http://localhost:3030/").unwrap();
        assert_eq!(store.base_url(), "http://localhost:3030");
        assert_eq!(store.page_url(4), "http://localhost:3030/api/pages/4");
    }

    #[test]
    fn test_error_message_prefers_response_body() {
        let body = r#"{"success": false, "message": "Remote rejected request: locked"}"#;
        assert_eq!(error_message(body), "Remote rejected request: locked");
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
    }
}
