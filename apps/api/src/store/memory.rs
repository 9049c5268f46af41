//! In-memory record store used by tests and embedded callers.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{merge_json, RecordKind, RecordStore, StoreError, StoredRecord};

/// HashMap-backed store keyed exactly like the Postgres backend: one bucket
/// per record kind, keyed by document id.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKind, HashMap<String, StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(
        &self,
        kind: RecordKind,
        user_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap();
        let bucket = records.entry(kind).or_default();
        match bucket.get_mut(user_id) {
            Some(existing) => merge_json(&mut existing.data, &patch),
            None => {
                bucket.insert(
                    user_id.to_string(),
                    StoredRecord {
                        doc_id: user_id.to_string(),
                        user_id: user_id.to_string(),
                        data: patch,
                        created_at: Utc::now(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn get(&self, kind: RecordKind, user_id: &str) -> Result<Option<Value>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&kind)
            .and_then(|bucket| bucket.get(user_id))
            .map(|record| record.data.clone()))
    }

    async fn append(
        &self,
        kind: RecordKind,
        doc_id: &str,
        user_id: &str,
        data: Value,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap();
        let bucket = records.entry(kind).or_default();
        if bucket.contains_key(doc_id) {
            return Ok(false);
        }
        bucket.insert(
            doc_id.to_string(),
            StoredRecord {
                doc_id: doc_id.to_string(),
                user_id: user_id.to_string(),
                data,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn query(
        &self,
        kind: RecordKind,
        user_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.records.read().unwrap();
        let mut matching: Vec<StoredRecord> = records
            .get(&kind)
            .map(|bucket| {
                bucket
                    .values()
                    .filter(|record| record.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn get_doc(
        &self,
        kind: RecordKind,
        doc_id: &str,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&kind)
            .and_then(|bucket| bucket.get(doc_id))
            .cloned())
    }

    async fn remove(&self, kind: RecordKind, doc_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap();
        Ok(records
            .get_mut(&kind)
            .map(|bucket| bucket.remove(doc_id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_merges_instead_of_clobbering() {
        let store = MemoryStore::new();
        store
            .upsert(RecordKind::Settings, "u1", json!({ "displayName": "Ada" }))
            .await
            .unwrap();
        store
            .upsert(RecordKind::Settings, "u1", json!({ "phone": "555" }))
            .await
            .unwrap();

        let doc = store.get(RecordKind::Settings, "u1").await.unwrap().unwrap();
        assert_eq!(doc["displayName"], "Ada");
        assert_eq!(doc["phone"], "555");
    }

    #[tokio::test]
    async fn test_append_is_conditional_on_doc_id() {
        let store = MemoryStore::new();
        let created = store
            .append(RecordKind::AppliedJobs, "u1:job", "u1", json!({ "link": "job" }))
            .await
            .unwrap();
        assert!(created);

        let repeated = store
            .append(RecordKind::AppliedJobs, "u1:job", "u1", json!({ "link": "job" }))
            .await
            .unwrap();
        assert!(!repeated);

        let records = store.query(RecordKind::AppliedJobs, "u1").await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_query_filters_by_user() {
        let store = MemoryStore::new();
        store
            .append(RecordKind::FavoriteJobs, "u1:a", "u1", json!({ "link": "a" }))
            .await
            .unwrap();
        store
            .append(RecordKind::FavoriteJobs, "u2:b", "u2", json!({ "link": "b" }))
            .await
            .unwrap();

        let records = store.query(RecordKind::FavoriteJobs, "u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doc_id, "u1:a");
    }

    #[tokio::test]
    async fn test_remove_reports_whether_anything_was_deleted() {
        let store = MemoryStore::new();
        store
            .append(RecordKind::FavoriteJobs, "u1:a", "u1", json!({}))
            .await
            .unwrap();

        assert!(store.remove(RecordKind::FavoriteJobs, "u1:a").await.unwrap());
        assert!(!store.remove(RecordKind::FavoriteJobs, "u1:a").await.unwrap());
        assert!(store
            .get_doc(RecordKind::FavoriteJobs, "u1:a")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_kinds_are_isolated() {
        let store = MemoryStore::new();
        store
            .append(RecordKind::AppliedJobs, "u1:a", "u1", json!({}))
            .await
            .unwrap();

        let favorites = store.query(RecordKind::FavoriteJobs, "u1").await.unwrap();
        assert!(favorites.is_empty());
    }
}
