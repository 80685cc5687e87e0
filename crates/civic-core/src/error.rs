use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures reported by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The (report, user) pair already has a vote row.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Deadline of {0:?} exceeded")]
    Timeout(Duration),
}

impl CoreError {
    /// Storage failures and timeouts may succeed on a later attempt.
    /// Retrying is always the caller's call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(StoreError::Backend(anyhow::anyhow!(
            "blocking task failed: {}",
            err
        )))
    }
}
