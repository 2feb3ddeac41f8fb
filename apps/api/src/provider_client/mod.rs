//! Provider client: the single point of entry for calls to the external
//! candidate data provider.
//!
//! One invocation is exactly one outbound request, whatever the batch size.
//! There are no retries: the provider is rate limited and callers fall back to
//! cached data when it is unavailable.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const BATCH_LOOKUP_PATH: &str = "get-candidates-by-ids";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Every variant means the provider is unavailable for this batch.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// One profile returned by the provider. `payload` is the whole entry, `id` included.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCandidate {
    pub id: i64,
    pub payload: Value,
}

/// Batched profile lookup. Carried in `AppState` (through `DetailsService`)
/// as `Arc<dyn CandidateProvider>`.
///
/// Callers must pass a non-empty id list.
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    async fn fetch_batch(&self, candidate_ids: &[i64])
        -> Result<Vec<ProviderCandidate>, ProviderError>;
}

#[derive(Debug, Serialize)]
struct BatchLookupRequest<'a> {
    ids: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct BatchLookupResponse {
    candidates: Vec<Value>,
}

/// HTTP implementation posting `{ ids }` to `<base>/get-candidates-by-ids`.
#[derive(Clone)]
pub struct HttpProviderClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpProviderClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), BATCH_LOOKUP_PATH),
            api_key,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CandidateProvider for HttpProviderClient {
    async fn fetch_batch(
        &self,
        candidate_ids: &[i64],
    ) -> Result<Vec<ProviderCandidate>, ProviderError> {
        debug_assert!(!candidate_ids.is_empty(), "fetch_batch called with no ids");

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&BatchLookupRequest { ids: candidate_ids });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Provider returned {status} for {} ids", candidate_ids.len());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let candidates = parse_batch_response(&body, candidate_ids)?;

        debug!(
            "Provider batch succeeded: requested={}, returned={}",
            candidate_ids.len(),
            candidates.len()
        );

        Ok(candidates)
    }
}

impl HttpProviderClient {
    fn classify(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Http(err)
        }
    }
}

/// Parses the provider's single JSON document for a batch.
///
/// Entries for ids outside `requested` are dropped, as are entries without an
/// integer `id`. If an id appears twice the later entry wins.
fn parse_batch_response(
    body: &[u8],
    requested: &[i64],
) -> Result<Vec<ProviderCandidate>, ProviderError> {
    let envelope: BatchLookupResponse = serde_json::from_slice(body)?;
    let requested: HashSet<i64> = requested.iter().copied().collect();

    let mut order = Vec::new();
    let mut by_id: HashMap<i64, Value> = HashMap::new();

    for entry in envelope.candidates {
        let Some(id) = entry.get("id").and_then(Value::as_i64) else {
            warn!("Skipping provider entry without an integer id");
            continue;
        };
        if !requested.contains(&id) {
            debug!("Ignoring unrequested candidate {id} in provider response");
            continue;
        }
        if by_id.insert(id, entry).is_none() {
            order.push(id);
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| by_id.remove(&id).map(|payload| ProviderCandidate { id, payload }))
        .collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
