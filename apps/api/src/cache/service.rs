//! Candidate detail enrichment: serve what the cache holds, re-fetch the rest
//! from the provider in one batched call, persist it, and answer from the store.
//!
//! Failure policy:
//! - store read failure (before or after the refresh) aborts the request
//! - provider failure degrades to the records that were already fresh
//! - a failed upsert drops only that candidate from the response, even if a
//!   stale copy is still stored

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::partition::partition;
use crate::cache::store::DetailStore;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::cache::{CacheRecord, CacheScope};
use crate::provider_client::{CandidateProvider, ProviderCandidate, ProviderError};

/// Tunables of the cache. Tests pass millisecond windows here instead of faking the clock.
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub expiry_window: chrono::Duration,
    pub provider_timeout: std::time::Duration,
}

impl CacheSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            expiry_window: chrono::Duration::from_std(config.cache_expiry)
                .context("CACHE_EXPIRY_SECS is out of range")?,
            provider_timeout: config.provider_timeout,
        })
    }
}

/// A validated batch: non-empty, de-duplicated ids (request order kept) under one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    scope: CacheScope,
    candidate_ids: Vec<i64>,
}

impl BatchRequest {
    pub fn new(
        owner_id: Uuid,
        project_id: &str,
        candidate_ids: &[i64],
        max_batch_size: usize,
    ) -> Result<Self, AppError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(AppError::Validation("projectId is required".to_string()));
        }
        if candidate_ids.is_empty() {
            return Err(AppError::Validation(
                "candidateIds must be a non-empty array".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(candidate_ids.len());
        let unique: Vec<i64> = candidate_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if unique.len() > max_batch_size {
            return Err(AppError::Validation(format!(
                "candidateIds may contain at most {max_batch_size} distinct ids, got {}",
                unique.len()
            )));
        }

        Ok(Self {
            scope: CacheScope::new(owner_id, project_id),
            candidate_ids: unique,
        })
    }

    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    pub fn candidate_ids(&self) -> &[i64] {
        &self.candidate_ids
    }
}

/// Response body of a batch. `details` only holds ids that were fresh or were
/// refreshed and stored by this request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub details: BTreeMap<i64, Value>,
    /// Ids that were fresh before the request.
    pub cached_count: usize,
    /// Ids that were sent to the provider, whether or not the call succeeded.
    pub api_fetched_count: usize,
}

#[derive(Clone)]
pub struct DetailsService {
    store: Arc<dyn DetailStore>,
    provider: Arc<dyn CandidateProvider>,
    settings: CacheSettings,
}

impl DetailsService {
    pub fn new(
        store: Arc<dyn DetailStore>,
        provider: Arc<dyn CandidateProvider>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    pub async fn get_details(&self, request: &BatchRequest) -> Result<BatchResponse, AppError> {
        self.get_details_at(request, Utc::now()).await
    }

    /// Runs one batch with `now` as the reference time for staleness and `written_at`.
    pub async fn get_details_at(
        &self,
        request: &BatchRequest,
        now: DateTime<Utc>,
    ) -> Result<BatchResponse, AppError> {
        let scope = request.scope();
        let requested = request.candidate_ids();

        // Fail closed: staleness cannot be decided without the existing records.
        let existing = self.store.get_many(scope, requested).await?;
        let plan = partition(requested, &existing, now, self.settings.expiry_window);

        // Ids the response may carry: fresh before the request, or rewritten by it.
        let mut servable: HashSet<i64> = plan.fresh.iter().copied().collect();

        if !plan.needs_refresh.is_empty() {
            match self.fetch_bounded(&plan.needs_refresh).await {
                Ok(fetched) => {
                    let returned = fetched.len();
                    let written = self.persist(scope, fetched, now).await;
                    debug!(
                        "Provider returned {returned} of {} candidates, cached {}",
                        plan.needs_refresh.len(),
                        written.len()
                    );
                    servable.extend(written);
                }
                Err(e) => warn!(
                    "Provider unavailable for {} candidates (owner={}, project={}): {e}",
                    plan.needs_refresh.len(),
                    scope.owner_id,
                    scope.project_id
                ),
            }
        }

        let details = self.assemble(scope, requested, &servable).await?;

        info!(
            "Candidate details: owner={} project={} requested={} cached={} fetched={} returned={}",
            scope.owner_id,
            scope.project_id,
            requested.len(),
            plan.fresh.len(),
            plan.needs_refresh.len(),
            details.len()
        );

        Ok(BatchResponse {
            success: true,
            details,
            cached_count: requested.len() - plan.needs_refresh.len(),
            api_fetched_count: plan.needs_refresh.len(),
        })
    }

    async fn fetch_bounded(&self, ids: &[i64]) -> Result<Vec<ProviderCandidate>, ProviderError> {
        let timeout = self.settings.provider_timeout;
        let mut fetched = match tokio::time::timeout(timeout, self.provider.fetch_batch(ids)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(timeout)),
        };

        let asked: HashSet<i64> = ids.iter().copied().collect();
        fetched.retain(|c| asked.contains(&c.id));
        Ok(fetched)
    }

    /// Upserts each fetched profile independently. Returns the ids that were written.
    async fn persist(
        &self,
        scope: &CacheScope,
        fetched: Vec<ProviderCandidate>,
        now: DateTime<Utc>,
    ) -> HashSet<i64> {
        let mut written = HashSet::with_capacity(fetched.len());
        for candidate in fetched {
            let record = CacheRecord {
                owner_id: scope.owner_id,
                project_id: scope.project_id.clone(),
                candidate_id: candidate.id,
                payload: candidate.payload,
                written_at: now,
            };
            match self.store.upsert(&record).await {
                Ok(()) => {
                    written.insert(record.candidate_id);
                }
                Err(e) => warn!(
                    "Failed to cache candidate {} (owner={}, project={}): {e}",
                    record.candidate_id, scope.owner_id, scope.project_id
                ),
            }
        }
        written
    }

    /// Re-reads the whole requested set so freshly written and already cached
    /// records come from the same source. Only `servable` ids are kept: a stale
    /// row whose refresh failed is left out of the response.
    async fn assemble(
        &self,
        scope: &CacheScope,
        requested: &[i64],
        servable: &HashSet<i64>,
    ) -> Result<BTreeMap<i64, Value>, AppError> {
        let mut stored = self.store.get_many(scope, requested).await?;
        Ok(requested
            .iter()
            .filter(|id| servable.contains(*id))
            .filter_map(|id| stored.remove(id).map(|r| (*id, r.payload)))
            .collect())
    }
}
