//! Business rules for applying to and favoriting jobs.
//!
//! Every per-job record is keyed by the deterministic composite id
//! `{user}:{job link}`, which makes applies idempotent and favorite toggles
//! race-free: there is nothing to check-then-act on, only a conditional
//! create or delete against the key.

pub mod apply_prompt;
pub mod handlers;
pub mod optimistic;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::job::{AppliedJobRecord, FavoriteJobRecord, Job};
use crate::models::user::UserId;
use crate::store::live::LiveStore;
use crate::store::{RecordKind, StoreError, StoredRecord};

/// Composite document id for per-job records.
pub fn interaction_doc_id(user_id: &UserId, link: &str) -> String {
    format!("{user_id}:{link}")
}

#[derive(Clone)]
pub struct JobInteractions {
    store: Arc<LiveStore>,
}

impl JobInteractions {
    pub fn new(store: Arc<LiveStore>) -> Self {
        Self { store }
    }

    /// Flips the favorite state for (user, job). Returns the new state:
    /// `true` when the job is now favorited, `false` when it is not.
    pub async fn toggle_favorite(&self, user_id: &UserId, job: &Job) -> Result<bool, StoreError> {
        let doc_id = interaction_doc_id(user_id, &job.link);

        if self
            .store
            .remove(RecordKind::FavoriteJobs, &doc_id, user_id.as_str())
            .await?
        {
            info!("favorite removed for {user_id}: {}", job.link);
            return Ok(false);
        }

        let record = FavoriteJobRecord {
            user_id: user_id.to_string(),
            job: job.clone(),
            favorited_at: Utc::now(),
        };
        let data = serde_json::to_value(&record).map_err(|err| StoreError::Backend(err.to_string()))?;

        // A concurrent toggle may have created the record between our remove
        // and this insert; either way the job ends up favorited exactly once.
        self.store
            .append(RecordKind::FavoriteJobs, &doc_id, user_id.as_str(), data)
            .await?;
        info!("favorite added for {user_id}: {}", job.link);
        Ok(true)
    }

    /// Records a confirmed application. Idempotent per (user, job link):
    /// returns `false` when the application was already recorded.
    pub async fn apply_to_job(&self, user_id: &UserId, job: &Job) -> Result<bool, StoreError> {
        let doc_id = interaction_doc_id(user_id, &job.link);
        let record = AppliedJobRecord {
            user_id: user_id.to_string(),
            job: job.clone(),
            applied_at: Utc::now(),
        };
        let data = serde_json::to_value(&record).map_err(|err| StoreError::Backend(err.to_string()))?;

        let created = self
            .store
            .append(RecordKind::AppliedJobs, &doc_id, user_id.as_str(), data)
            .await?;
        if created {
            info!("application recorded for {user_id}: {}", job.link);
        } else {
            debug!("application already recorded for {user_id}: {}", job.link);
        }
        Ok(created)
    }

    /// Existence check used to render favorite state before the live
    /// subscription delivers its first snapshot.
    pub async fn is_favorited(&self, user_id: &UserId, link: &str) -> Result<bool, StoreError> {
        let doc_id = interaction_doc_id(user_id, link);
        Ok(self
            .store
            .get_doc(RecordKind::FavoriteJobs, &doc_id)
            .await?
            .is_some())
    }

    /// The user's applications, newest first.
    pub async fn applied_jobs(&self, user_id: &UserId) -> Result<Vec<AppliedJobRecord>, StoreError> {
        let records = self
            .store
            .query(RecordKind::AppliedJobs, user_id.as_str())
            .await?;
        Ok(decode_records(records))
    }

    /// The user's favorites, newest first.
    pub async fn favorite_jobs(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<FavoriteJobRecord>, StoreError> {
        let records = self
            .store
            .query(RecordKind::FavoriteJobs, user_id.as_str())
            .await?;
        Ok(decode_records(records))
    }
}

/// Decodes query results, dropping any record that no longer matches the
/// expected shape rather than failing the whole listing.
fn decode_records<T: serde::de::DeserializeOwned>(records: Vec<StoredRecord>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record.data) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("skipping undecodable record {}: {err}", record.doc_id);
                None
            }
        })
        .collect()
}
