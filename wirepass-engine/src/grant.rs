//! Synchronous grant path, driven by front-end events.
//!
//! A grant either completes fully (external effects done, config artifact in
//! hand, record committed) or commits nothing: the record is only persisted
//! after every provisioning call, the artifact fetch included, has succeeded.
//! The commit re-runs the transition against the record current at commit
//! time, so two renewals racing on the same subscriber serialize through the
//! store and both extensions land.

use crate::error::{EngineError, EngineResult};
use crate::machine::{transition, Effect, Event, Purpose, Rejection};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use wirepass_provision::Provisioner;
use wirepass_store::EntitlementStore;
use wirepass_types::{EntitlementRecord, ProfileRef, SubscriberId};

/// Front-end grant triggers. The payment flow is external; a completed
/// purchase arrives as `Paid` with the plan's hour count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantEvent {
    Trial,
    Paid { hours: i64 },
}

/// Result of a completed grant.
#[derive(Debug, Clone)]
pub struct GrantOutcome {
    pub record: EntitlementRecord,
    /// Opaque config artifact to hand to the subscriber.
    pub config: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

/// Entry point for the synchronous request/response context.
pub struct EntitlementService {
    store: Arc<dyn EntitlementStore>,
    provisioner: Arc<dyn Provisioner>,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn EntitlementStore>, provisioner: Arc<dyn Provisioner>) -> Self {
        Self { store, provisioner }
    }

    /// Handles a grant event for a subscriber, creating the record on first
    /// contact. Returns the config artifact and the new expiry.
    pub async fn handle_grant_event(
        &self,
        subscriber: &SubscriberId,
        display_name: Option<&str>,
        event: GrantEvent,
    ) -> EngineResult<GrantOutcome> {
        let now = Utc::now();
        let record = self
            .store
            .upsert(subscriber, EntitlementRecord::new(subscriber.clone()))
            .await?;

        let is_trial = matches!(event, GrantEvent::Trial);
        let event = match event {
            GrantEvent::Trial => Event::GrantTrial,
            GrantEvent::Paid { hours } => Event::GrantPaid { hours },
        };
        let planned = transition(&record, &event, now)?;

        // External effects first; the record is committed only once they
        // succeeded. CreateProfile is find-or-create, so a crash between
        // create and commit leaves nothing to clean up — the retry resolves
        // the same profile by label.
        let mut created: Option<(Purpose, ProfileRef)> = None;
        for effect in &planned.effects {
            if let Effect::CreateProfile { purpose } = effect {
                let label = purpose.label(subscriber);
                let profile = self.provisioner.create_profile(&label).await?;
                debug!(subscriber = %subscriber, "provisioned profile {profile}");
                created = Some((*purpose, profile));
            }
        }

        // Fetch the artifact before committing: the subscriber holds their
        // config before the grant is burned, and a transient fetch failure
        // leaves the record untouched for the retry.
        let profile = match &created {
            Some((_, profile)) => profile.clone(),
            // No create effect means a paid renewal on an existing profile.
            None => record
                .paid
                .profile_ref
                .clone()
                .ok_or_else(|| EngineError::MissingProfile(subscriber.clone()))?,
        };
        let config = self.provisioner.fetch_configuration(&profile).await?;

        // Commit by re-running the transition against the current record, so
        // a concurrent update between our read and this write is not lost.
        let name = display_name.map(str::to_string);
        let rejected: Arc<Mutex<Option<Rejection>>> = Arc::default();
        let rejected_slot = Arc::clone(&rejected);
        let committed = self
            .store
            .apply_update(
                subscriber,
                Box::new(move |mut current| {
                    if let Some(name) = name {
                        current.display_name = Some(name);
                    }
                    match transition(&current, &event, now) {
                        Ok(mut planned) => {
                            if let Some((purpose, profile)) = created {
                                let slot = match purpose {
                                    Purpose::Trial => &mut planned.record.trial.profile_ref,
                                    Purpose::Paid => &mut planned.record.paid.profile_ref,
                                };
                                if slot.is_none() {
                                    *slot = Some(profile);
                                }
                            }
                            planned.record
                        }
                        // Raced with another grant that already consumed the
                        // transition; keep the current record and surface the
                        // rejection to this caller.
                        Err(rejection) => {
                            *rejected_slot.lock().unwrap() = Some(rejection);
                            current
                        }
                    }
                }),
            )
            .await?;
        if let Some(rejection) = rejected.lock().unwrap().take() {
            return Err(EngineError::Rejected(rejection));
        }

        let expires_at = if is_trial {
            committed.trial.expires_at
        } else {
            committed.paid.expires_at
        }
        .ok_or_else(|| EngineError::MissingProfile(subscriber.clone()))?;

        info!(subscriber = %subscriber, "grant complete, access until {expires_at}");

        Ok(GrantOutcome {
            record: committed,
            config,
            expires_at,
        })
    }

    /// Re-downloads the paid config artifact for a subscriber who already
    /// holds one.
    pub async fn fetch_config(&self, subscriber: &SubscriberId) -> EngineResult<Vec<u8>> {
        let record = self.store.get(subscriber).await?;
        let profile = record
            .paid
            .profile_ref
            .ok_or_else(|| EngineError::MissingProfile(subscriber.clone()))?;
        Ok(self.provisioner.fetch_configuration(&profile).await?)
    }
}
