//! Error types for the entitlement store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the subscriber. On the grant path this simply
    /// means "create"; it is not used as control flow anywhere else.
    #[error("no record for subscriber {0}")]
    NotFound(String),

    /// Transient storage failure. Callers retry on their own schedule (the
    /// reconciler waits for its next tick, the grant path surfaces a
    /// retryable rejection).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}
