//! HTTP surface of the page store.
//!
//! ```text
//! GET  /api/pages/:page_id        → PageSnapshot
//! POST /api/pages/:page_id/batch  → BatchResponse
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pagegrid_common::{BatchRequest, BatchResponse, PageSnapshot, PageStore, StoreError};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub type SharedStore = Arc<dyn PageStore>;

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/pages/:page_id", get(fetch_page))
        .route("/api/pages/:page_id/batch", post(apply_batch))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Store errors rendered as `{ success: false, message }`
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::PageNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidOperation(_) | StoreError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            StoreError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = BatchResponse {
            success: false,
            blocks: Vec::new(),
            operations_processed: 0,
            results: Vec::new(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn fetch_page(
    State(store): State<SharedStore>,
    Path(page_id): Path<i64>,
) -> Result<Json<PageSnapshot>, ApiError> {
    let snapshot = store.fetch_page(page_id).await?;
    Ok(Json(snapshot))
}

async fn apply_batch(
    State(store): State<SharedStore>,
    Path(page_id): Path<i64>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    info!(page_id, operations = request.operations.len(), "Received batch");
    let response = store.apply_batch(page_id, request).await?;
    Ok(Json(response))
}
