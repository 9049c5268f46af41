//! Canonical job shapes shared by the store, interaction, and assistant layers.
//!
//! Upstream job feeds disagree on field spelling (`Title` vs `title`,
//! `uploaded` vs `postedDate`), so the canonical type accepts the legacy
//! aliases on deserialization and always emits camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting reference, keyed by its canonical posting URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Canonical posting URL — the natural key for every per-job record.
    #[serde(alias = "url", alias = "id")]
    pub link: String,
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Company")]
    pub company: String,
    #[serde(default, alias = "Location")]
    pub location: String,
    /// Free-text recency string from the source feed, e.g. "3 days ago".
    #[serde(default, alias = "uploaded", alias = "postedDate")]
    pub posted_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

/// Stored record of a confirmed application. Immutable once created — there
/// is no un-apply path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedJobRecord {
    pub user_id: String,
    #[serde(flatten)]
    pub job: Job,
    pub applied_at: DateTime<Utc>,
}

/// Stored record of a favorited job. Created on toggle-on, deleted on
/// toggle-off; the deterministic record key keeps it unique per (user, link).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteJobRecord {
    pub user_id: String,
    #[serde(flatten)]
    pub job: Job,
    pub favorited_at: DateTime<Utc>,
}
