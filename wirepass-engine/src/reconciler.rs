//! Reconciliation loop.
//!
//! Nothing pushes expiry events; the only mechanism is this loop. It wakes on
//! a fixed interval, re-lists every record and applies the expire transition
//! to each one independently. Per-record failures are logged and skipped for
//! the tick — the record stays eligible and the fixed period is the retry
//! backoff, with no dedicated counter because the external disable is
//! idempotent. The loop holds no cross-tick memory beyond the store itself,
//! so the record set may change freely between ticks.

use crate::error::EngineResult;
use crate::machine::{transition, Effect, Event};
use crate::notify::{Notifier, EXPIRY_MESSAGE};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wirepass_provision::Provisioner;
use wirepass_store::EntitlementStore;
use wirepass_types::EntitlementRecord;

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Seconds between scans.
    pub interval_secs: u64,
    /// Maximum records reconciled concurrently within a tick.
    pub concurrency: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            concurrency: 8,
        }
    }
}

/// The single active reconciler.
pub struct Reconciler {
    store: Arc<dyn EntitlementStore>,
    provisioner: Arc<dyn Provisioner>,
    notifier: Arc<dyn Notifier>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        provisioner: Arc<dyn Provisioner>,
        notifier: Arc<dyn Notifier>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            provisioner,
            notifier,
            config,
        }
    }

    /// Runs until `shutdown` flips to true. The first tick fires immediately.
    /// Shutdown lets in-flight records finish; remaining records of the tick
    /// are abandoned and picked up by whoever runs the loop next.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown channel closed, reconciler stopped");
                        return;
                    }
                }
            }
            if *shutdown.borrow() {
                info!("reconciler stopped");
                return;
            }
            self.scan(Utc::now(), &shutdown).await;
        }
    }

    /// One full scan at the given time. Exposed so operators and tests can
    /// force a pass without waiting out the interval.
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        let (_tx, rx) = watch::channel(false);
        self.scan(now, &rx).await;
    }

    async fn scan(&self, now: DateTime<Utc>, shutdown: &watch::Receiver<bool>) {
        let records = match self.store.list_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!("reconciliation scan skipped, store unavailable: {e}");
                return;
            }
        };
        debug!("reconciliation tick over {} records", records.len());

        stream::iter(records)
            .for_each_concurrent(self.config.concurrency, |record| {
                let shutdown = shutdown.clone();
                async move {
                    if *shutdown.borrow() {
                        return;
                    }
                    if let Err(e) = self.reconcile_record(&record, now).await {
                        warn!(
                            subscriber = %record.subscriber_id,
                            "reconciliation failed, will retry next tick: {e}"
                        );
                    }
                }
            })
            .await;
    }

    /// Applies the expire transition to one record: execute effects, then
    /// persist. Persisting re-runs the transition against the current record,
    /// so a renewal that landed mid-flight wins and the record stays active.
    async fn reconcile_record(
        &self,
        record: &EntitlementRecord,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let planned = transition(record, &Event::Expire, now)?;
        if planned.effects.is_empty() {
            return Ok(());
        }

        info!(subscriber = %record.subscriber_id, "paid entitlement lapsed, disabling");
        for effect in &planned.effects {
            match effect {
                Effect::DisableProfile(profile) => {
                    self.provisioner.disable_profile(profile).await?;
                }
                Effect::NotifyExpiry => {
                    self.notifier
                        .notify(&record.subscriber_id, EXPIRY_MESSAGE)
                        .await?;
                }
                // Expire never asks for creates.
                Effect::CreateProfile { .. } => {}
            }
        }

        self.store
            .apply_update(
                &record.subscriber_id,
                Box::new(move |current| match transition(&current, &Event::Expire, now) {
                    Ok(planned) => planned.record,
                    Err(_) => current,
                }),
            )
            .await?;

        Ok(())
    }
}
