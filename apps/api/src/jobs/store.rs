//! Job Record Store: durable keyed storage for `AnalysisJob`s.
//!
//! Every `put` is a full-record overwrite; the last writer for an id wins.
//! There is no versioning or compare-and-swap.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, AnalysisJobRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt job record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &AnalysisJob) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError>;

    /// Overwrites every mutable column. Fails with `NotFound` if the row is gone.
    async fn put(&self, job: &AnalysisJob) -> Result<(), StoreError>;
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analysis_jobs
                (id, job_description, candidate_text, wants_full_document, wants_cover_letter,
                 analysis_result, generated_document, generated_cover_letter, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id)
        .bind(&job.job_description)
        .bind(&job.candidate_text)
        .bind(job.flags.wants_full_document)
        .bind(job.flags.wants_cover_letter)
        .bind(&job.analysis_result)
        .bind(&job.generated_document)
        .bind(&job.generated_cover_letter)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError> {
        let row = sqlx::query_as::<_, AnalysisJobRow>("SELECT * FROM analysis_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AnalysisJob::try_from)
            .transpose()
            .map_err(StoreError::Corrupt)
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
    async fn put(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET job_description = $2,
                candidate_text = $3,
                wants_full_document = $4,
                wants_cover_letter = $5,
                analysis_result = $6,
                generated_document = $7,
                generated_cover_letter = $8,
                status = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.job_description)
        .bind(&job.candidate_text)
        .bind(job.flags.wants_full_document)
        .bind(job.flags.wants_cover_letter)
        .bind(&job.analysis_result)
        .bind(&job.generated_document)
        .bind(&job.generated_cover_letter)
        .bind(job.status.as_str())
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job.id));
        }

        Ok(())
    }
}
