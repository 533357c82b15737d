//! Core type definitions for the WirePass entitlement engine.
//!
//! One [`EntitlementRecord`] exists per subscriber and carries two independent
//! entitlements: a one-shot trial and a renewable paid subscription. Each maps
//! to its own profile in the external provisioning system; the two never share
//! a profile.

mod ids;
mod record;

pub use ids::{ProfileRef, SubscriberId};
pub use record::{EntitlementRecord, PaidEntitlement, PaidStatus, TrialEntitlement};
