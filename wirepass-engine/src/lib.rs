//! Entitlement lifecycle and reconciliation engine.
//!
//! Two execution contexts share the entitlement store and nothing else:
//!
//! - The synchronous grant path ([`EntitlementService`]), driven by front-end
//!   events: grant a one-time trial, grant/extend a paid subscription,
//!   re-deliver a config artifact.
//! - The background [`Reconciler`], which wakes on a fixed interval, finds
//!   lapsed paid entitlements, disables them in the provisioning system and
//!   notifies the owner once.
//!
//! Both run their domain logic through the pure state machine in [`machine`]:
//! side effects come back as data, get executed against the provisioning
//! client and notifier, and only then is the new record persisted. A failed
//! effect therefore leaves the stored record untouched and the whole step is
//! retried later, which is safe because the external disable is idempotent.

mod error;
mod grant;
pub mod machine;
mod notify;
pub mod plan;
mod reconciler;

pub use error::{EngineError, EngineResult};
pub use grant::{EntitlementService, GrantEvent, GrantOutcome};
pub use notify::{Notifier, NotifyError, NotifyResult, EXPIRY_MESSAGE};
pub use reconciler::{Reconciler, ReconcilerConfig};
