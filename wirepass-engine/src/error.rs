//! Error types for the engine.

use crate::machine::Rejection;
use crate::notify::NotifyError;
use thiserror::Error;
use wirepass_provision::ProvisionError;
use wirepass_store::StoreError;
use wirepass_types::SubscriberId;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the grant path and the reconciler.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Typed domain rejection (e.g. trial already used). User-facing, not a
    /// failure.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The subscriber has no provisioned profile to serve this request.
    #[error("subscriber {0} has no provisioned profile")]
    MissingProfile(SubscriberId),

    /// Repository failure. Retryable.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Provisioning API failure. Retryable; no state was committed.
    #[error("provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Notification delivery failure.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
}
