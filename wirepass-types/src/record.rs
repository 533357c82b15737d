//! The per-subscriber entitlement record.

use crate::ids::{ProfileRef, SubscriberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the paid entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaidStatus {
    /// Never granted.
    None,
    /// Granted and not yet reconciled as lapsed.
    Active,
    /// Lapsed and disabled in the provisioning system. The profile reference
    /// is kept so a renewal re-enables the same profile.
    Disabled,
}

/// The one-shot trial entitlement. `used` is set at most once and never
/// cleared; a subscriber whose trial lapsed has no return path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialEntitlement {
    pub used: bool,
    pub profile_ref: Option<ProfileRef>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The renewable paid entitlement. Oscillates between `Active` and
/// `Disabled` indefinitely across renewal cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidEntitlement {
    pub profile_ref: Option<ProfileRef>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: PaidStatus,
    /// Set once per disable event, cleared on every (re)grant.
    pub notified_of_expiry: bool,
}

impl Default for PaidEntitlement {
    fn default() -> Self {
        Self {
            profile_ref: None,
            expires_at: None,
            status: PaidStatus::None,
            notified_of_expiry: false,
        }
    }
}

impl PaidEntitlement {
    /// Whether the entitlement is active with an expiry at or before `now`,
    /// i.e. eligible for the expire transition.
    #[must_use]
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == PaidStatus::Active && self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the entitlement is active with an expiry after `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PaidStatus::Active && self.expires_at.is_some_and(|exp| exp > now)
    }
}

/// One record per subscriber. Created lazily on first interaction and never
/// deleted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub subscriber_id: SubscriberId,
    /// Presentation only, never used for lookups.
    pub display_name: Option<String>,
    pub trial: TrialEntitlement,
    pub paid: PaidEntitlement,
}

impl EntitlementRecord {
    /// Creates a fresh record with no entitlements.
    #[must_use]
    pub fn new(subscriber_id: SubscriberId) -> Self {
        Self {
            subscriber_id,
            display_name: None,
            trial: TrialEntitlement::default(),
            paid: PaidEntitlement::default(),
        }
    }
}
