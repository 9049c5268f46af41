//! Pinned-job references feeding assistant context.
//!
//! The list is local to the device profile: it lives in a JSON file under
//! the platform data directory, never touches the record store, and does not
//! survive a cache clear or device switch. Every mutation broadcasts the
//! fresh full list, so concurrent views re-render without polling; writers
//! are last-writer-wins with no merge strategy.

pub mod prefs;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::job::Job;

/// Hard cap on pinned references; overflow evicts the oldest.
pub const MAX_REFERENCES: usize = 20;

const EVENT_BUS_CAPACITY: usize = 16;

/// A job pinned as conversation context for the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub link: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    pub added_at: DateTime<Utc>,
}

impl JobReference {
    pub fn from_job(job: &Job) -> Self {
        Self {
            ref_type: "job_reference".to_string(),
            link: job.link.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            posted_label: job.posted_label.clone(),
            match_score: job.match_score,
            added_at: Utc::now(),
        }
    }
}

/// The aggregator owning the pinned-job list. It is the only source of job
/// context available to prompt assembly.
pub struct ContextReferences {
    path: PathBuf,
    // oldest first; eviction pops the front
    entries: Mutex<Vec<JobReference>>,
    events: broadcast::Sender<Vec<JobReference>>,
}

impl ContextReferences {
    /// Opens the reference list in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "waypoint")
            .context("could not determine a platform data directory")?;
        let dir = dirs.data_dir();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        Ok(Self::open(dir.join("references.json")))
    }

    /// Opens a reference list backed by the given file. A missing or corrupt
    /// file loads as empty.
    pub fn open(path: PathBuf) -> Self {
        let entries = load(&path);
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            path,
            entries: Mutex::new(entries),
            events,
        }
    }

    /// Pins a job. Re-pinning an already-pinned link refreshes its
    /// `added_at` instead of duplicating; at capacity the oldest entry is
    /// evicted. Returns the list as [`list`](Self::list) would.
    pub fn add_job(&self, job: &Job) -> Vec<JobReference> {
        self.add(JobReference::from_job(job))
    }

    pub fn add(&self, reference: JobReference) -> Vec<JobReference> {
        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|existing| existing.link != reference.link);
            entries.push(reference);
            while entries.len() > MAX_REFERENCES {
                entries.remove(0);
            }
            entries.clone()
        };
        self.persist(&snapshot);
        let sorted = newest_first(snapshot);
        self.broadcast(&sorted);
        sorted
    }

    /// Unpins by link. Persists and broadcasts only when something changed.
    pub fn remove(&self, link: &str) -> Vec<JobReference> {
        let (snapshot, changed) = {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|existing| existing.link != link);
            (entries.clone(), entries.len() != before)
        };
        if changed {
            self.persist(&snapshot);
        }
        let sorted = newest_first(snapshot);
        if changed {
            self.broadcast(&sorted);
        }
        sorted
    }

    /// Current references, newest first.
    pub fn list(&self) -> Vec<JobReference> {
        newest_first(self.entries.lock().unwrap().clone())
    }

    /// Receiver of full-list snapshots, sent after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<JobReference>> {
        self.events.subscribe()
    }

    fn broadcast(&self, snapshot: &[JobReference]) {
        let _ = self.events.send(snapshot.to_vec());
    }

    /// Write failures degrade: the in-memory list stays authoritative.
    fn persist(&self, entries: &[JobReference]) {
        match serde_json::to_string_pretty(entries) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    warn!(
                        "could not persist reference list to {}: {err}",
                        self.path.display()
                    );
                }
            }
            Err(err) => warn!("could not serialize reference list: {err}"),
        }
    }
}

fn newest_first(mut entries: Vec<JobReference>) -> Vec<JobReference> {
    entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    entries
}

fn load(path: &Path) -> Vec<JobReference> {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("ignoring corrupt reference file {}: {err}", path.display());
                Vec::new()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            warn!("could not read reference file {}: {err}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_job(link: &str, title: &str) -> Job {
        Job {
            link: link.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            posted_label: "today".to_string(),
            description: None,
            match_score: None,
        }
    }

    fn make_refs(dir: &tempfile::TempDir) -> ContextReferences {
        ContextReferences::open(dir.path().join("references.json"))
    }

    #[test]
    fn test_add_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);
        refs.add_job(&make_job("https://jobs/1", "Engineer"));

        let reopened = make_refs(&dir);
        let list = reopened.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].link, "https://jobs/1");
        assert_eq!(list[0].ref_type, "job_reference");
    }

    #[test]
    fn test_repin_deduplicates_by_link() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);

        refs.add_job(&make_job("https://jobs/1", "Engineer"));
        refs.add_job(&make_job("https://jobs/2", "Architect"));
        let list = refs.add_job(&make_job("https://jobs/1", "Engineer"));

        assert_eq!(list.len(), 2);
        // refreshed entry moves to the front of the recency ordering
        assert_eq!(list[0].link, "https://jobs/1");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);

        for i in 0..MAX_REFERENCES + 1 {
            refs.add_job(&make_job(&format!("https://jobs/{i}"), "Engineer"));
        }

        let list = refs.list();
        assert_eq!(list.len(), MAX_REFERENCES);
        assert!(!list.iter().any(|r| r.link == "https://jobs/0"));
        assert!(list.iter().any(|r| r.link == "https://jobs/20"));
    }

    #[test]
    fn test_remove_filters_by_link() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);
        refs.add_job(&make_job("https://jobs/a", "A"));
        refs.add_job(&make_job("https://jobs/b", "B"));
        refs.add_job(&make_job("https://jobs/c", "C"));

        let list = refs.remove("https://jobs/b");
        let links: Vec<&str> = list.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links, vec!["https://jobs/c", "https://jobs/a"]);
    }

    #[tokio::test]
    async fn test_removal_is_observed_by_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);
        refs.add_job(&make_job("https://jobs/a", "A"));
        refs.add_job(&make_job("https://jobs/b", "B"));

        let mut rx = refs.subscribe();
        refs.remove("https://jobs/a");

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].link, "https://jobs/b");
    }

    #[test]
    fn test_removing_unknown_link_does_not_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let refs = make_refs(&dir);
        refs.add_job(&make_job("https://jobs/a", "A"));

        let mut rx = refs.subscribe();
        refs.remove("https://jobs/missing");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("references.json");
        std::fs::write(&path, "not json {{{").unwrap();

        let refs = ContextReferences::open(path);
        assert!(refs.list().is_empty());
    }
}
