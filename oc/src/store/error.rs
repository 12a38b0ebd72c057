//! Store error types

use thiserror::Error;

use crate::domain::ExpressionStatus;

/// Errors from an expression store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Expression not found: {0}")]
    NotFound(String),

    #[error("Expression already exists: {0}")]
    AlreadyExists(String),

    #[error("Status conflict for {id}: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: ExpressionStatus,
        actual: ExpressionStatus,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Io(_) => true,
            StoreError::NotFound(_)
            | StoreError::AlreadyExists(_)
            | StoreError::Conflict { .. }
            | StoreError::Json(_) => false,
        }
    }
}
