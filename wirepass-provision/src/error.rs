//! Error types for the provisioning client.

use thiserror::Error;

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur talking to the provisioning API.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Network failure or 5xx from the API. The client performs no internal
    /// retry; callers retry on their own schedule.
    #[error("provisioning API unavailable: {0}")]
    Unavailable(String),

    /// The replayed request was rejected again after a fresh login.
    #[error("provisioning authentication failed: {0}")]
    AuthFailed(String),

    /// Create reported success but the profile never appeared in the list.
    #[error("profile {0} not found after create")]
    ProfileNotFound(String),

    /// Unexpected status or response shape.
    #[error("unexpected provisioning API response: {0}")]
    Api(String),
}

impl From<reqwest::Error> for ProvisionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Unavailable(format!("request timed out: {e}"))
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}
