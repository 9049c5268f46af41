//! Record store abstraction over the external document database.
//!
//! Every durable record lives in one of three collections, keyed by a
//! caller-chosen document id. Per-user singleton documents (settings) use the
//! user id as the document id; per-event records (applied/favorite jobs) use
//! a deterministic composite id so duplicate creation is structurally
//! impossible. Backends: [`memory::MemoryStore`] for tests and embedded use,
//! [`postgres::PgStore`] for the server.

pub mod live;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The record collections the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Settings,
    AppliedJobs,
    FavoriteJobs,
}

impl RecordKind {
    /// Collection name on the wire and in the backing table.
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Settings => "users",
            RecordKind::AppliedJobs => "appliedJobs",
            RecordKind::FavoriteJobs => "favoriteJobs",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("caller is not authenticated")]
    Unauthenticated,

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // insufficient_privilege
                Some("42501") => StoreError::PermissionDenied(err.to_string()),
                // invalid_authorization_specification / invalid_password
                Some("28000") | Some("28P01") => StoreError::Unauthenticated,
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// A record as returned by queries and point lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredRecord {
    pub doc_id: String,
    pub user_id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Keyed record store. Object-safe so backends can be swapped behind
/// `Arc<dyn RecordStore>`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Deep-merges `patch` into the per-user singleton document for `kind`.
    /// Fields absent from the patch are left untouched.
    async fn upsert(&self, kind: RecordKind, user_id: &str, patch: Value)
        -> Result<(), StoreError>;

    /// The per-user singleton document, or `None` if never written.
    async fn get(&self, kind: RecordKind, user_id: &str) -> Result<Option<Value>, StoreError>;

    /// Conditionally creates a record under the caller-supplied document id.
    /// Returns `false` without touching anything if the id already exists.
    async fn append(
        &self,
        kind: RecordKind,
        doc_id: &str,
        user_id: &str,
        data: Value,
    ) -> Result<bool, StoreError>;

    /// All of the user's records for `kind`, newest first.
    async fn query(&self, kind: RecordKind, user_id: &str)
        -> Result<Vec<StoredRecord>, StoreError>;

    /// Point lookup by full document id. Used for existence checks.
    async fn get_doc(
        &self,
        kind: RecordKind,
        doc_id: &str,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Deletes the record; returns whether anything was deleted.
    async fn remove(&self, kind: RecordKind, doc_id: &str) -> Result<bool, StoreError>;
}

/// Deep-merges `patch` into `base`. Nested objects merge recursively; any
/// non-object value (including arrays) replaces the existing value wholesale.
pub fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(base_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
