pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::cache::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/candidate-details",
            post(handlers::handle_candidate_details),
        )
        .route(
            "/api/v1/candidate-details",
            post(handlers::handle_candidate_details),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    use super::*;
    use crate::cache::testing::{MemoryDetailStore, ScriptedProvider};
    use crate::state::test_state;

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(
            Arc::new(MemoryDetailStore::default()),
            Arc::new(ScriptedProvider::failing()),
        ));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "candidate-cache");
    }
}
