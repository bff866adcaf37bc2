use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an analysis job.
///
/// `Pending → InProgress → {Completed | Failed}`. The engine never re-runs a terminal job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which optional artifacts a job asked for. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFlags {
    pub wants_full_document: bool,
    pub wants_cover_letter: bool,
}

impl GenerationFlags {
    pub fn new(wants_full_document: bool, wants_cover_letter: bool) -> Self {
        Self {
            wants_full_document,
            wants_cover_letter,
        }
    }

    /// True when any premium-only artifact is requested.
    pub fn requires_premium(&self) -> bool {
        self.wants_full_document || self.wants_cover_letter
    }
}

/// A persisted analysis job and its outputs.
///
/// `analysis_result` doubles as the error channel once the job is `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub job_description: String,
    pub candidate_text: String,
    pub flags: GenerationFlags,
    pub analysis_result: Option<String>,
    pub generated_document: Option<String>,
    pub generated_cover_letter: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(job_description: String, candidate_text: String, flags: GenerationFlags) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_description,
            candidate_text,
            flags,
            analysis_result: None,
            generated_document: None,
            generated_cover_letter: None,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Off-table moves are allowed (a timeout may overwrite a finished record)
    /// but are logged.
    pub fn set_status(&mut self, status: JobStatus) {
        if self.status != status && !self.status.can_transition_to(status) {
            tracing::debug!(job_id = %self.id, "Status overwrite {} -> {}", self.status, status);
        }
        self.status = status;
        self.touch();
    }

    /// Marks the job failed, reusing `analysis_result` for the diagnostic.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.analysis_result = Some(message.into());
        self.set_status(JobStatus::Failed);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Database shape of `analysis_jobs`.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisJobRow {
    pub id: Uuid,
    pub job_description: String,
    pub candidate_text: String,
    pub wants_full_document: bool,
    pub wants_cover_letter: bool,
    pub analysis_result: Option<String>,
    pub generated_document: Option<String>,
    pub generated_cover_letter: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AnalysisJobRow> for AnalysisJob {
    type Error = String;

    fn try_from(row: AnalysisJobRow) -> Result<Self, Self::Error> {
        Ok(AnalysisJob {
            id: row.id,
            job_description: row.job_description,
            candidate_text: row.candidate_text,
            flags: GenerationFlags::new(row.wants_full_document, row.wants_cover_letter),
            analysis_result: row.analysis_result,
            generated_document: row.generated_document,
            generated_cover_letter: row.generated_cover_letter,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Outward view of a job returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub status: JobStatus,
    pub analysis_result: Option<String>,
    pub generated_document: Option<String>,
    pub generated_cover_letter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AnalysisJob> for JobSummary {
    fn from(job: &AnalysisJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            analysis_result: job.analysis_result.clone(),
            generated_document: job.generated_document.clone(),
            generated_cover_letter: job.generated_cover_letter.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
