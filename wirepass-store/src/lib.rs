//! Entitlement repository for WirePass.
//!
//! Durable storage of one [`EntitlementRecord`] per subscriber, keyed by
//! `subscriber_id`. The repository is the only state shared between the
//! synchronous grant path and the background reconciler; all cross-context
//! coordination goes through [`EntitlementStore::apply_update`], which applies
//! a read-modify-write atomically per record so concurrent updates to the
//! same subscriber serialize instead of racing.
//!
//! Two implementations:
//! - [`MemoryStore`] for tests and embedding
//! - [`SqliteStore`] for durable single-node deployments

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use wirepass_types::{EntitlementRecord, SubscriberId};

/// Mutation applied atomically to a single record by
/// [`EntitlementStore::apply_update`].
pub type RecordMutator = Box<dyn FnOnce(EntitlementRecord) -> EntitlementRecord + Send>;

/// The entitlement repository contract.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Fetches the record for a subscriber.
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    async fn get(&self, id: &SubscriberId) -> StoreResult<EntitlementRecord>;

    /// Creates the record with `defaults` if absent, otherwise returns the
    /// existing record untouched. Never overwrites existing fields.
    async fn upsert(
        &self,
        id: &SubscriberId,
        defaults: EntitlementRecord,
    ) -> StoreResult<EntitlementRecord>;

    /// Atomically replaces the record with `mutate(current)` and returns the
    /// new record. No two updates to the same subscriber interleave.
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    async fn apply_update(
        &self,
        id: &SubscriberId,
        mutate: RecordMutator,
    ) -> StoreResult<EntitlementRecord>;

    /// Returns every record, for the reconciliation scan.
    async fn list_all(&self) -> StoreResult<Vec<EntitlementRecord>>;
}
