use thiserror::Error;

/// Errors raised by a page store (local or remote)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote rejected request: {0}")]
    Rejected(String),

    #[error("Invalid operation data: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<String> for StoreError {
    fn from(s: String) -> Self {
        StoreError::Transport(s)
    }
}

impl From<&str> for StoreError {
    fn from(s: &str) -> Self {
        StoreError::Transport(s.to_string())
    }
}
