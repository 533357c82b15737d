//! SQLite-backed entitlement store.
//!
//! One row per subscriber, mirroring the fields of [`EntitlementRecord`].
//! rusqlite is synchronous, so every operation moves onto a blocking thread
//! via `spawn_blocking`. The connection sits behind a mutex; `apply_update`
//! performs its read-modify-write while holding it, which gives the per-record
//! atomicity the trait requires.

use crate::error::{StoreError, StoreResult};
use crate::{EntitlementStore, RecordMutator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use wirepass_types::{
    EntitlementRecord, PaidEntitlement, PaidStatus, ProfileRef, SubscriberId, TrialEntitlement,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entitlements (
    subscriber_id      TEXT PRIMARY KEY,
    display_name       TEXT,
    trial_used         INTEGER NOT NULL DEFAULT 0,
    trial_profile_ref  TEXT,
    trial_expires_at   TEXT,
    paid_profile_ref   TEXT,
    paid_expires_at    TEXT,
    paid_status        TEXT NOT NULL DEFAULT 'none',
    notified_of_expiry INTEGER NOT NULL DEFAULT 0
);
";

/// Durable single-node store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("store mutex poisoned".into()))?;
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }
}

fn status_to_str(status: PaidStatus) -> &'static str {
    match status {
        PaidStatus::None => "none",
        PaidStatus::Active => "active",
        PaidStatus::Disabled => "disabled",
    }
}

fn status_from_str(s: &str) -> StoreResult<PaidStatus> {
    match s {
        "none" => Ok(PaidStatus::None),
        "active" => Ok(PaidStatus::Active),
        "disabled" => Ok(PaidStatus::Disabled),
        other => Err(StoreError::Unavailable(format!(
            "corrupt paid_status column: {other}"
        ))),
    }
}

fn time_to_str(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(|t| t.to_rfc3339())
}

fn time_from_str(s: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    match s {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::Unavailable(format!("corrupt timestamp column: {e}"))),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(EntitlementRecord, Option<String>, Option<String>)> {
    let record = EntitlementRecord {
        subscriber_id: SubscriberId::new(row.get::<_, String>(0)?),
        display_name: row.get(1)?,
        trial: TrialEntitlement {
            used: row.get(2)?,
            profile_ref: row.get::<_, Option<String>>(3)?.map(ProfileRef::new),
            expires_at: None,
        },
        paid: PaidEntitlement {
            profile_ref: row.get::<_, Option<String>>(5)?.map(ProfileRef::new),
            expires_at: None,
            status: PaidStatus::None,
            notified_of_expiry: row.get(8)?,
        },
    };
    // Timestamps and status need fallible parsing outside rusqlite's error
    // type; hand the raw columns back alongside the partial record.
    let trial_expires: Option<String> = row.get(4)?;
    let paid_expires: Option<String> = row.get(6)?;
    Ok((record, trial_expires, paid_expires))
}

fn read_record(conn: &Connection, id: &SubscriberId) -> StoreResult<Option<EntitlementRecord>> {
    let raw = conn
        .query_row(
            "SELECT subscriber_id, display_name, trial_used, trial_profile_ref,
                    trial_expires_at, paid_profile_ref, paid_expires_at,
                    paid_status, notified_of_expiry
             FROM entitlements WHERE subscriber_id = ?1",
            params![id.as_str()],
            |row| {
                let (record, trial_exp, paid_exp) = row_to_record(row)?;
                let status: String = row.get(7)?;
                Ok((record, trial_exp, paid_exp, status))
            },
        )
        .optional()?;

    match raw {
        None => Ok(None),
        Some((mut record, trial_exp, paid_exp, status)) => {
            record.trial.expires_at = time_from_str(trial_exp)?;
            record.paid.expires_at = time_from_str(paid_exp)?;
            record.paid.status = status_from_str(&status)?;
            Ok(Some(record))
        }
    }
}

fn write_record(conn: &Connection, record: &EntitlementRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO entitlements (subscriber_id, display_name, trial_used,
                                   trial_profile_ref, trial_expires_at,
                                   paid_profile_ref, paid_expires_at,
                                   paid_status, notified_of_expiry)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(subscriber_id) DO UPDATE SET
             display_name = ?2, trial_used = ?3, trial_profile_ref = ?4,
             trial_expires_at = ?5, paid_profile_ref = ?6, paid_expires_at = ?7,
             paid_status = ?8, notified_of_expiry = ?9",
        params![
            record.subscriber_id.as_str(),
            record.display_name,
            record.trial.used,
            record.trial.profile_ref.as_ref().map(|p| p.as_str().to_string()),
            time_to_str(record.trial.expires_at),
            record.paid.profile_ref.as_ref().map(|p| p.as_str().to_string()),
            time_to_str(record.paid.expires_at),
            status_to_str(record.paid.status),
            record.paid.notified_of_expiry,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    async fn get(&self, id: &SubscriberId) -> StoreResult<EntitlementRecord> {
        let id = id.clone();
        self.with_conn(move |conn| {
            read_record(conn, &id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
        })
        .await
    }

    async fn upsert(
        &self,
        id: &SubscriberId,
        defaults: EntitlementRecord,
    ) -> StoreResult<EntitlementRecord> {
        let id = id.clone();
        self.with_conn(move |conn| {
            if let Some(existing) = read_record(conn, &id)? {
                return Ok(existing);
            }
            write_record(conn, &defaults)?;
            Ok(defaults)
        })
        .await
    }

    async fn apply_update(
        &self,
        id: &SubscriberId,
        mutate: RecordMutator,
    ) -> StoreResult<EntitlementRecord> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let current =
                read_record(conn, &id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let updated = mutate(current);
            write_record(conn, &updated)?;
            Ok(updated)
        })
        .await
    }

    async fn list_all(&self) -> StoreResult<Vec<EntitlementRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT subscriber_id, display_name, trial_used, trial_profile_ref,
                        trial_expires_at, paid_profile_ref, paid_expires_at,
                        paid_status, notified_of_expiry
                 FROM entitlements",
            )?;
            let rows = stmt.query_map([], |row| {
                let (record, trial_exp, paid_exp) = row_to_record(row)?;
                let status: String = row.get(7)?;
                Ok((record, trial_exp, paid_exp, status))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (mut record, trial_exp, paid_exp, status) = row?;
                record.trial.expires_at = time_from_str(trial_exp)?;
                record.paid.expires_at = time_from_str(paid_exp)?;
                record.paid.status = status_from_str(&status)?;
                records.push(record);
            }
            Ok(records)
        })
        .await
    }
}
