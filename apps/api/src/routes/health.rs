use axum::{extract::State, Json};
use serde::Serialize;

use crate::jobs::dispatch::DispatchMode;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub dispatch_mode: DispatchMode,
}

/// GET /health
/// Liveness only; backing services are not checked.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        dispatch_mode: state.dispatcher.default_mode(),
    })
}
