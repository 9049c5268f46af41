//! PostgreSQL record store. A single JSONB table holds every record kind;
//! the (kind, doc_id) primary key makes conditional appends a plain
//! `ON CONFLICT DO NOTHING` insert. Merge upserts create the document from
//! the patch when none exists, otherwise lock the row and merge; racing
//! first writes serialize on the insert conflict, so neither can clobber
//! the other's fields.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{merge_json, RecordKind, RecordStore, StoreError, StoredRecord};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with a bounded pool and returns the store.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Creates the records table and its user index if they do not exist.
    /// Safe to run on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind        TEXT NOT NULL,
                doc_id      TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                data        JSONB NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (kind, doc_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS records_kind_user_idx ON records (kind, user_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("Record store schema ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn upsert(
        &self,
        kind: RecordKind,
        user_id: &str,
        patch: Value,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Insert-first: `SELECT ... FOR UPDATE` on an absent row locks
        // nothing, so two racing first writes would both read None and the
        // loser would replace the winner's document wholesale. Creating the
        // document here makes the conflict the serialization point; the
        // loser's insert returns 0 rows and falls into the merge path.
        let inserted = sqlx::query(
            r#"
            INSERT INTO records (kind, doc_id, user_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, doc_id) DO NOTHING
            "#,
        )
        .bind(kind.collection())
        .bind(user_id)
        .bind(user_id)
        .bind(&patch)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let existing: Option<(Value,)> = sqlx::query_as(
                "SELECT data FROM records WHERE kind = $1 AND doc_id = $2 FOR UPDATE",
            )
            .bind(kind.collection())
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            let data = match existing {
                Some((mut data,)) => {
                    merge_json(&mut data, &patch);
                    data
                }
                // Row deleted between the insert and the lock; the patch
                // becomes the document again.
                None => patch,
            };

            sqlx::query(
                r#"
                INSERT INTO records (kind, doc_id, user_id, data)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (kind, doc_id) DO UPDATE SET data = EXCLUDED.data
                "#,
            )
            .bind(kind.collection())
            .bind(user_id)
            .bind(user_id)
            .bind(data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, kind: RecordKind, user_id: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM records WHERE kind = $1 AND doc_id = $2")
                .bind(kind.collection())
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(data,)| data))
    }

    async fn append(
        &self,
        kind: RecordKind,
        doc_id: &str,
        user_id: &str,
        data: Value,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO records (kind, doc_id, user_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, doc_id) DO NOTHING
            "#,
        )
        .bind(kind.collection())
        .bind(doc_id)
        .bind(user_id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        kind: RecordKind,
        user_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let records = sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT doc_id, user_id, data, created_at
            FROM records
            WHERE kind = $1 AND user_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(kind.collection())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_doc(
        &self,
        kind: RecordKind,
        doc_id: &str,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let record = sqlx::query_as::<_, StoredRecord>(
            "SELECT doc_id, user_id, data, created_at FROM records WHERE kind = $1 AND doc_id = $2",
        )
        .bind(kind.collection())
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn remove(&self, kind: RecordKind, doc_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE kind = $1 AND doc_id = $2")
            .bind(kind.collection())
            .bind(doc_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    async fn connect_store() -> Arc<PgStore> {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url).await.expect("connect");
        store.migrate().await.expect("migrate");
        Arc::new(store)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore] // Ignore by default since it requires a live Postgres (DATABASE_URL)
    async fn test_concurrent_first_upserts_merge_both_patches() {
        let store = connect_store().await;

        // Fresh document per round so every round races the create path.
        for round in 0..8 {
            let user = format!("upsert-race-{}-{round}", uuid::Uuid::new_v4());

            let first = tokio::spawn({
                let store = store.clone();
                let user = user.clone();
                async move {
                    store
                        .upsert(RecordKind::Settings, &user, json!({ "firstName": "Ada" }))
                        .await
                }
            });
            let second = tokio::spawn({
                let store = store.clone();
                let user = user.clone();
                async move {
                    store
                        .upsert(
                            RecordKind::Settings,
                            &user,
                            json!({ "lastName": "Lovelace" }),
                        )
                        .await
                }
            });
            first.await.expect("join").expect("first patch");
            second.await.expect("join").expect("second patch");

            let doc = store
                .get(RecordKind::Settings, &user)
                .await
                .expect("get")
                .expect("document exists");
            assert_eq!(doc["firstName"], "Ada", "round {round} lost a field");
            assert_eq!(doc["lastName"], "Lovelace", "round {round} lost a field");

            store
                .remove(RecordKind::Settings, &user)
                .await
                .expect("cleanup");
        }
    }
}
