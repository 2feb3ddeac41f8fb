use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant scope every cache read and write runs under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope {
    pub owner_id: Uuid,
    pub project_id: String,
}

impl CacheScope {
    pub fn new(owner_id: Uuid, project_id: impl Into<String>) -> Self {
        Self {
            owner_id,
            project_id: project_id.into(),
        }
    }

    pub fn key(&self, candidate_id: i64) -> CacheKey {
        CacheKey {
            owner_id: self.owner_id,
            project_id: self.project_id.clone(),
            candidate_id,
        }
    }
}

/// Primary key of a cached detail record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub owner_id: Uuid,
    pub project_id: String,
    pub candidate_id: i64,
}

/// A provider profile cached for one (owner, project, candidate) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CacheRecord {
    pub owner_id: Uuid,
    pub project_id: String,
    pub candidate_id: i64,
    pub payload: Value,
    pub written_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn key(&self) -> CacheKey {
        CacheKey {
            owner_id: self.owner_id,
            project_id: self.project_id.clone(),
            candidate_id: self.candidate_id,
        }
    }
}
