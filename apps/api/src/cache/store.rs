//! Store accessor for cached candidate details.
//!
//! Every read and write is keyed by owner and project, so one tenant can never
//! observe another tenant's cached payloads. The store is the only arbiter of
//! concurrent writes: an upsert replaces the whole record, last writer wins.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::cache::{CacheKey, CacheRecord, CacheScope};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),
}

/// Keyed store of cached detail records.
///
/// Carried in `AppState` (through `DetailsService`) as `Arc<dyn DetailStore>`.
#[async_trait]
pub trait DetailStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, StoreError>;

    /// Reads the records of `scope` for the given ids. Missing ids are absent from the map.
    ///
    /// The default issues one `get` per id; backends with a set lookup override it.
    async fn get_many(
        &self,
        scope: &CacheScope,
        candidate_ids: &[i64],
    ) -> Result<HashMap<i64, CacheRecord>, StoreError> {
        let mut found = HashMap::with_capacity(candidate_ids.len());
        for &id in candidate_ids {
            if let Some(record) = self.get(&scope.key(id)).await? {
                found.insert(id, record);
            }
        }
        Ok(found)
    }

    /// Inserts or fully replaces the record at `record.key()`.
    async fn upsert(&self, record: &CacheRecord) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store over the `candidate_detail_cache` table.
#[derive(Clone)]
pub struct PgDetailStore {
    pool: PgPool,
}

impl PgDetailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DetailStore for PgDetailStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, StoreError> {
        sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT owner_id, project_id, candidate_id, payload, written_at
            FROM candidate_detail_cache
            WHERE owner_id = $1 AND project_id = $2 AND candidate_id = $3
            "#,
        )
        .bind(key.owner_id)
        .bind(&key.project_id)
        .bind(key.candidate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Read(e.to_string()))
    }

    async fn get_many(
        &self,
        scope: &CacheScope,
        candidate_ids: &[i64],
    ) -> Result<HashMap<i64, CacheRecord>, StoreError> {
        if candidate_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT owner_id, project_id, candidate_id, payload, written_at
            FROM candidate_detail_cache
            WHERE owner_id = $1 AND project_id = $2 AND candidate_id = ANY($3)
            "#,
        )
        .bind(scope.owner_id)
        .bind(&scope.project_id)
        .bind(candidate_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Read(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.candidate_id, r)).collect())
    }

    async fn upsert(&self, record: &CacheRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_detail_cache
                (owner_id, project_id, candidate_id, payload, written_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (owner_id, project_id, candidate_id)
            DO UPDATE SET payload = EXCLUDED.payload, written_at = EXCLUDED.written_at
            "#,
        )
        .bind(record.owner_id)
        .bind(&record.project_id)
        .bind(record.candidate_id)
        .bind(&record.payload)
        .bind(record.written_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }
}
