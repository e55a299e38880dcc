//! History error types.

use thiserror::Error;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while recording or querying detections.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Detection already recorded: {0}")]
    Duplicate(String),

    #[error("Invalid capacity: {0}")]
    InvalidCapacity(usize),

    #[error("History lock poisoned")]
    LockPoisoned,
}

impl HistoryError {
    pub fn duplicate(request_id: impl Into<String>) -> Self {
        Self::Duplicate(request_id.into())
    }
}
