//! Error types for the editor

use crate::storage::StorageError;
use pagegrid_common::{BlockId, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("A publish is already in flight")]
    PublishInFlight,

    #[error("Publish rejected: {0}")]
    PublishRejected(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;
