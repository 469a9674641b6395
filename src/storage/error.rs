//! Error type shared by the storage layer.

use std::time::Duration;

use thiserror::Error;

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be encoded or decoded.
    #[error("value encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation did not finish within its deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Setup failure outside the database itself.
    #[error("internal error: {0}")]
    Internal(String),
}
