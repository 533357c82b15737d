//! Shared fakes for engine tests: an in-memory provisioning system and a
//! recording notifier, both with switchable failure modes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wirepass_engine::{EntitlementService, Notifier, NotifyError, NotifyResult, Reconciler, ReconcilerConfig};
use wirepass_provision::{ProvisionError, ProvisionResult, Provisioner};
use wirepass_store::{EntitlementStore, MemoryStore};
use wirepass_types::{ProfileRef, SubscriberId};

#[derive(Default)]
pub struct FakeProvisioner {
    /// label -> profile ref, find-or-create like the real API.
    profiles: Mutex<HashMap<String, ProfileRef>>,
    pub create_calls: AtomicUsize,
    pub disable_calls: AtomicUsize,
    disabled: Mutex<Vec<ProfileRef>>,
    fail_create: AtomicBool,
    fail_fetch: AtomicBool,
    fail_disable: AtomicBool,
    fail_disable_for: Mutex<Option<ProfileRef>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disable(&self, fail: bool) {
        self.fail_disable.store(fail, Ordering::SeqCst);
    }

    /// Fails disables for one specific profile only.
    pub fn fail_disable_for(&self, profile: Option<ProfileRef>) {
        *self.fail_disable_for.lock().unwrap() = profile;
    }

    pub fn disabled(&self) -> Vec<ProfileRef> {
        self.disabled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn create_profile(&self, label: &str) -> ProvisionResult<ProfileRef> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ProvisionError::Unavailable("injected".into()));
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(label.to_string())
            .or_insert_with(|| ProfileRef::new(format!("profile-{label}")))
            .clone();
        Ok(profile)
    }

    async fn fetch_configuration(&self, profile: &ProfileRef) -> ProvisionResult<Vec<u8>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ProvisionError::Unavailable("injected".into()));
        }
        Ok(format!("config for {profile}").into_bytes())
    }

    async fn disable_profile(&self, profile: &ProfileRef) -> ProvisionResult<()> {
        if self.fail_disable.load(Ordering::SeqCst)
            || self.fail_disable_for.lock().unwrap().as_ref() == Some(profile)
        {
            return Err(ProvisionError::Unavailable("injected".into()));
        }
        self.disable_calls.fetch_add(1, Ordering::SeqCst);
        self.disabled.lock().unwrap().push(profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub delivered: Mutex<Vec<(SubscriberId, String)>>,
    fail: AtomicBool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delivered_to(&self, subscriber: &SubscriberId) -> usize {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == subscriber)
            .count()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, subscriber: &SubscriberId, text: &str) -> NotifyResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("injected".into()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((subscriber.clone(), text.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub provisioner: Arc<FakeProvisioner>,
    pub notifier: Arc<FakeNotifier>,
    pub service: EntitlementService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provisioner = Arc::new(FakeProvisioner::new());
        let notifier = Arc::new(FakeNotifier::new());
        let service = EntitlementService::new(
            Arc::clone(&store) as Arc<dyn EntitlementStore>,
            Arc::clone(&provisioner) as Arc<dyn Provisioner>,
        );
        Self {
            store,
            provisioner,
            notifier,
            service,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.store) as Arc<dyn EntitlementStore>,
            Arc::clone(&self.provisioner) as Arc<dyn Provisioner>,
            Arc::clone(&self.notifier) as Arc<dyn Notifier>,
            ReconcilerConfig::default(),
        )
    }
}
