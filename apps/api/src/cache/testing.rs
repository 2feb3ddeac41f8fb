//! In-memory test doubles for the store and the provider.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::cache::store::{DetailStore, StoreError};
use crate::models::cache::{CacheKey, CacheRecord};
use crate::provider_client::{CandidateProvider, ProviderCandidate, ProviderError};

#[derive(Default)]
pub struct MemoryDetailStore {
    records: Mutex<HashMap<CacheKey, CacheRecord>>,
    fail_reads: AtomicBool,
    failing_writes: Mutex<HashSet<i64>>,
}

impl MemoryDetailStore {
    pub fn insert(&self, record: CacheRecord) {
        self.records.lock().unwrap().insert(record.key(), record);
    }

    pub fn snapshot(&self, key: &CacheKey) -> Option<CacheRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes_for(&self, candidate_id: i64) {
        self.failing_writes.lock().unwrap().insert(candidate_id);
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DetailStore for MemoryDetailStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, StoreError> {
        self.check_read()?;
        Ok(self.snapshot(key))
    }

    async fn upsert(&self, record: &CacheRecord) -> Result<(), StoreError> {
        if self
            .failing_writes
            .lock()
            .unwrap()
            .contains(&record.candidate_id)
        {
            return Err(StoreError::Write(format!(
                "constraint violation for {}",
                record.candidate_id
            )));
        }
        self.insert(record.clone());
        Ok(())
    }
}

enum Script {
    Knows(HashSet<i64>),
    Fails,
    Hangs(Duration),
}

/// Provider fake that records every batch it receives.
pub struct ScriptedProvider {
    script: Script,
    extra: Vec<i64>,
    calls: Mutex<Vec<Vec<i64>>>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            extra: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers with a profile for every requested id in `known`.
    pub fn knowing(known: &[i64]) -> Self {
        Self::with_script(Script::Knows(known.iter().copied().collect()))
    }

    pub fn failing() -> Self {
        Self::with_script(Script::Fails)
    }

    pub fn hanging(delay: Duration) -> Self {
        Self::with_script(Script::Hangs(delay))
    }

    /// Also returns profiles for these ids even though nobody asked for them.
    pub fn with_extra(mut self, ids: &[i64]) -> Self {
        self.extra = ids.to_vec();
        self
    }

    pub fn calls(&self) -> Vec<Vec<i64>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CandidateProvider for ScriptedProvider {
    async fn fetch_batch(
        &self,
        candidate_ids: &[i64],
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        self.calls.lock().unwrap().push(candidate_ids.to_vec());

        match &self.script {
            Script::Fails => Err(ProviderError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Script::Hangs(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
            Script::Knows(known) => Ok(candidate_ids
                .iter()
                .filter(|id| known.contains(*id))
                .chain(self.extra.iter())
                .map(|&id| ProviderCandidate {
                    id,
                    payload: json!({ "id": id, "name": format!("Candidate {id}") }),
                })
                .collect()),
        }
    }
}
