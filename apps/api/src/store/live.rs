//! Change bus over the record store.
//!
//! All mutations route through [`LiveStore`]; each successful write publishes
//! a change event, and [`Subscription`]s re-query the full result set per
//! matching event. The first `next()` always resolves immediately with the
//! current records, so callers render real state before any change arrives.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::{RecordKind, RecordStore, StoreError, StoredRecord};

const CHANGE_BUS_CAPACITY: usize = 64;

/// A mutation notice: which collection changed, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: RecordKind,
    pub user_id: String,
}

/// Wraps any [`RecordStore`] with a broadcast change bus.
pub struct LiveStore {
    inner: Arc<dyn RecordStore>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl LiveStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUS_CAPACITY);
        Self { inner, changes }
    }

    pub async fn upsert(
        &self,
        kind: RecordKind,
        user_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        self.inner.upsert(kind, user_id, patch).await?;
        self.notify(kind, user_id);
        Ok(())
    }

    pub async fn get(&self, kind: RecordKind, user_id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(kind, user_id).await
    }

    pub async fn append(
        &self,
        kind: RecordKind,
        doc_id: &str,
        user_id: &str,
        data: Value,
    ) -> Result<bool, StoreError> {
        let created = self.inner.append(kind, doc_id, user_id, data).await?;
        if created {
            self.notify(kind, user_id);
        }
        Ok(created)
    }

    pub async fn query(
        &self,
        kind: RecordKind,
        user_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.inner.query(kind, user_id).await
    }

    pub async fn get_doc(
        &self,
        kind: RecordKind,
        doc_id: &str,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.inner.get_doc(kind, doc_id).await
    }

    /// Removes a record. `user_id` attributes the change event; the document
    /// id alone does not identify the owner.
    pub async fn remove(
        &self,
        kind: RecordKind,
        doc_id: &str,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        let removed = self.inner.remove(kind, doc_id).await?;
        if removed {
            self.notify(kind, user_id);
        }
        Ok(removed)
    }

    /// Watches the user's records for `kind`. The subscription ends when the
    /// `LiveStore` is dropped.
    pub fn subscribe(&self, kind: RecordKind, user_id: &str) -> Subscription {
        Subscription {
            store: self.inner.clone(),
            rx: self.changes.subscribe(),
            kind,
            user_id: user_id.to_string(),
            primed: false,
        }
    }

    fn notify(&self, kind: RecordKind, user_id: &str) {
        // send only fails when no subscriber is listening, which is fine
        let _ = self.changes.send(ChangeEvent {
            kind,
            user_id: user_id.to_string(),
        });
    }
}

/// Live view of one (kind, user) result set. Dropping it unsubscribes.
pub struct Subscription {
    store: Arc<dyn RecordStore>,
    rx: broadcast::Receiver<ChangeEvent>,
    kind: RecordKind,
    user_id: String,
    primed: bool,
}

impl Subscription {
    /// The first call resolves immediately with the current records; every
    /// later call resolves after the next matching change, with the
    /// then-current full result set. Returns `None` once the change bus has
    /// shut down. A lagged receiver collapses the missed events into a
    /// single fresh re-query — safe because full result sets are delivered.
    pub async fn next(&mut self) -> Option<Result<Vec<StoredRecord>, StoreError>> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.query(self.kind, &self.user_id).await);
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.kind == self.kind && event.user_id == self.user_id => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("subscription lagged by {skipped} events; refreshing");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }

        Some(self.store.query(self.kind, &self.user_id).await)
    }
}
