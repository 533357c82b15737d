//! Entitlement state machine — pure logic, no I/O.
//!
//! [`transition`] maps (current record, event, now) to a new record plus an
//! ordered list of side-effect intents. The caller executes the effects and
//! only then commits the record, so persistence and external calls can be
//! sequenced and tested independently.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use wirepass_types::{EntitlementRecord, PaidStatus, ProfileRef, SubscriberId};

/// Trial entitlements last 24 hours.
pub const TRIAL_HOURS: i64 = 24;

/// Which external profile an effect concerns. A subscriber may hold one of
/// each concurrently; they never share a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Trial,
    Paid,
}

impl Purpose {
    /// Provisioning label, unique per subscriber+purpose so retries can look
    /// the profile up instead of creating a duplicate.
    #[must_use]
    pub fn label(&self, subscriber: &SubscriberId) -> String {
        match self {
            Purpose::Trial => format!("{subscriber}:trial"),
            Purpose::Paid => format!("{subscriber}:paid"),
        }
    }
}

/// Events the machine understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One-shot trial grant.
    GrantTrial,
    /// Grant or extend the paid subscription by the given number of hours.
    GrantPaid { hours: i64 },
    /// Reconciliation probe: disable the paid entitlement if it has lapsed.
    /// A no-op (not an error) when the guard does not hold, so the loop may
    /// apply it speculatively to every record every tick.
    Expire,
}

/// Side-effect intents, executed by the caller in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Find-or-create the external profile for this purpose. The caller
    /// writes the resulting reference into the record before committing.
    CreateProfile { purpose: Purpose },
    /// Disable the external profile (idempotent).
    DisableProfile(ProfileRef),
    /// Tell the subscriber their paid access was disabled.
    NotifyExpiry,
}

/// Outcome of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: EntitlementRecord,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(record: &EntitlementRecord) -> Self {
        Self {
            record: record.clone(),
            effects: Vec::new(),
        }
    }
}

/// Typed domain rejections. These are normal outcomes surfaced to the user,
/// not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The one-time trial was already consumed.
    #[error("trial already used")]
    TrialAlreadyUsed,
}

/// Applies `event` to `record` at time `now`.
pub fn transition(
    record: &EntitlementRecord,
    event: &Event,
    now: DateTime<Utc>,
) -> Result<Transition, Rejection> {
    match event {
        Event::GrantTrial => grant_trial(record, now),
        Event::GrantPaid { hours } => Ok(grant_paid(record, *hours, now)),
        Event::Expire => Ok(expire(record, now)),
    }
}

fn grant_trial(record: &EntitlementRecord, now: DateTime<Utc>) -> Result<Transition, Rejection> {
    if record.trial.used {
        return Err(Rejection::TrialAlreadyUsed);
    }

    let mut next = record.clone();
    next.trial.used = true;
    next.trial.expires_at = Some(now + Duration::hours(TRIAL_HOURS));
    // profile_ref is filled in by the caller once CreateProfile has run.

    Ok(Transition {
        record: next,
        effects: vec![Effect::CreateProfile {
            purpose: Purpose::Trial,
        }],
    })
}

fn grant_paid(record: &EntitlementRecord, hours: i64, now: DateTime<Utc>) -> Transition {
    // Cumulative while still active, otherwise reset from now.
    let extend_from = match record.paid.expires_at {
        Some(exp) if record.paid.status == PaidStatus::Active && exp > now => exp,
        _ => now,
    };

    let mut next = record.clone();
    next.paid.expires_at = Some(extend_from + Duration::hours(hours));
    next.paid.status = PaidStatus::Active;
    next.paid.notified_of_expiry = false;

    // A disabled record keeps its profile_ref, so renewal re-enables the
    // same external profile instead of creating a duplicate.
    let effects = if record.paid.profile_ref.is_none() {
        vec![Effect::CreateProfile {
            purpose: Purpose::Paid,
        }]
    } else {
        Vec::new()
    };

    Transition {
        record: next,
        effects,
    }
}

fn expire(record: &EntitlementRecord, now: DateTime<Utc>) -> Transition {
    if !record.paid.is_lapsed(now) {
        return Transition::unchanged(record);
    }

    let mut next = record.clone();
    next.paid.status = PaidStatus::Disabled;

    let mut effects = Vec::new();
    if let Some(profile) = &record.paid.profile_ref {
        effects.push(Effect::DisableProfile(profile.clone()));
    }
    if !record.paid.notified_of_expiry {
        next.paid.notified_of_expiry = true;
        effects.push(Effect::NotifyExpiry);
    }

    Transition {
        record: next,
        effects,
    }
}
