use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::auth::CallerIdentity;
use crate::cache::service::{BatchRequest, BatchResponse};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetailsRequest {
    pub candidate_ids: Option<Vec<i64>>,
    pub project_id: Option<String>,
}

/// POST /candidate-details
///
/// Returns cached or freshly fetched profiles for a batch of candidates in one project.
pub async fn handle_candidate_details(
    State(state): State<AppState>,
    caller: CallerIdentity,
    payload: Result<Json<CandidateDetailsRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let candidate_ids = req
        .candidate_ids
        .ok_or_else(|| AppError::Validation("candidateIds is required".to_string()))?;
    let project_id = req
        .project_id
        .ok_or_else(|| AppError::Validation("projectId is required".to_string()))?;

    let batch = BatchRequest::new(
        caller.owner_id,
        &project_id,
        &candidate_ids,
        state.config.max_batch_size,
    )?;

    let response = state.details.get_details(&batch).await?;
    Ok(Json(response))
}
