use crate::error::StoreError;

/// Result type for calls into the storage collaborator
pub type StoreResult<T> = Result<T, StoreError>;
