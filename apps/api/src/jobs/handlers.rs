//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::dispatch::CreateJobRequest;
use crate::models::job::JobSummary;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub job: CreateJobRequest,
}

/// POST /api/v1/jobs
///
/// Creates an analysis job and dispatches it. Returns 200 with the finished
/// job for inline runs, 202 with the PENDING job when queued.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobSummary>), AppError> {
    let caller = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(body.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let summary = state
        .dispatcher
        .create_and_run(body.job, caller.is_premium())
        .await?;

    let status = if summary.status.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(summary)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSummary>, AppError> {
    let job = state
        .jobs
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    Ok(Json(JobSummary::from(&job)))
}
