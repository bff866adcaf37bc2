pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jobs", post(handlers::handle_create_job))
        .route("/api/v1/jobs/:id", get(handlers::handle_get_job))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::jobs::bounded::BoundedRunner;
    use crate::jobs::dispatch::{DispatchMode, Dispatcher};
    use crate::jobs::engine::ExecutionEngine;
    use crate::jobs::queue::RedisJobQueue;
    use crate::jobs::testing::{pending_job, InMemoryJobStore, ScriptedGenerator};

    fn test_router(store: Arc<InMemoryJobStore>) -> Router {
        // Neither the pool nor the redis client connects until first use.
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/resumeforge_test")
            .unwrap();
        let queue = RedisJobQueue::new("redis://127.0.0.1/", "resumeforge:test").unwrap();
        let engine = Arc::new(ExecutionEngine::new(
            store.clone(),
            Arc::new(ScriptedGenerator::default()),
        ));
        let dispatcher = Dispatcher::new(
            store.clone(),
            BoundedRunner::new(engine, Duration::from_secs(30)),
            Arc::new(queue),
            DispatchMode::Queued,
        );
        build_router(AppState {
            db,
            jobs: store,
            dispatcher: Arc::new(dispatcher),
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (status, body) =
            get_json(test_router(Arc::new(InMemoryJobStore::default())), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resumeforge-api");
        assert_eq!(body["dispatch_mode"], "queued");
    }

    #[tokio::test]
    async fn test_get_job_returns_summary() {
        let store = Arc::new(InMemoryJobStore::default());
        let mut job = pending_job("Senior Go Engineer", "5 years backend experience");
        job.analysis_result = Some("Strong match".into());
        let id = job.id;
        store.seed(job);

        let (status, body) = get_json(test_router(store), &format!("/api/v1/jobs/{id}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["status"], "PENDING");
        assert_eq!(body["analysis_result"], "Strong match");
        assert!(body["generated_document"].is_null());
        // inputs are not echoed back
        assert!(body.get("candidate_text").is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_404_envelope() {
        let (status, body) = get_json(
            test_router(Arc::new(InMemoryJobStore::default())),
            &format!("/api/v1/jobs/{}", Uuid::new_v4()),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
