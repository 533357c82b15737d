//! Subscriber notification contract.
//!
//! The messaging front-end implements this; the core only needs a
//! deliver-or-fail answer. Delivery failures are logged by the reconciler and
//! the whole expiry step retries next tick, so `notified_of_expiry` is only
//! committed after a successful delivery.

use async_trait::async_trait;
use thiserror::Error;
use wirepass_types::SubscriberId;

/// Result type for notification delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Message sent once when a lapsed paid entitlement is disabled.
pub const EXPIRY_MESSAGE: &str = "Your paid access has expired and the profile was disabled. \
     Renew your subscription from the main menu to restore access.";

/// Deliver-or-fail messaging contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `text` to the subscriber. The caller decides whether and
    /// when to retry.
    async fn notify(&self, subscriber: &SubscriberId, text: &str) -> NotifyResult<()>;
}
