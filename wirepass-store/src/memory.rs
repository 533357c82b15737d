//! In-memory entitlement store.

use crate::error::{StoreError, StoreResult};
use crate::{EntitlementStore, RecordMutator};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use wirepass_types::{EntitlementRecord, SubscriberId};

/// In-memory store backed by a `HashMap`. Used in tests and for embedding
/// without a database. The write lock is held across each mutation, so
/// `apply_update` calls serialize.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<SubscriberId, EntitlementRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn get(&self, id: &SubscriberId) -> StoreResult<EntitlementRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn upsert(
        &self,
        id: &SubscriberId,
        defaults: EntitlementRecord,
    ) -> StoreResult<EntitlementRecord> {
        let mut records = self.records.write().await;
        Ok(records.entry(id.clone()).or_insert(defaults).clone())
    }

    async fn apply_update(
        &self,
        id: &SubscriberId,
        mutate: RecordMutator,
    ) -> StoreResult<EntitlementRecord> {
        let mut records = self.records.write().await;
        let current = records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let updated = mutate(current);
        records.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    async fn list_all(&self) -> StoreResult<Vec<EntitlementRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
