//! Dispatch: validates a request, creates the job, and hands it to either the
//! bounded (inline) runner or the task queue.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::AppError;
use crate::jobs::bounded::BoundedRunner;
use crate::jobs::engine::MAX_INPUT_CHARS;
use crate::jobs::queue::{JobMessage, JobQueue};
use crate::jobs::store::JobStore;
use crate::models::job::{AnalysisJob, GenerationFlags, JobSummary};

/// How a newly created job is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Run now under the time budget; the caller waits for the result.
    Inline,
    /// Enqueue and return the PENDING job immediately.
    #[default]
    Queued,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(DispatchMode::Inline),
            "queued" => Ok(DispatchMode::Queued),
            other => Err(format!("Invalid dispatch mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub job_description: String,
    pub candidate_text: String,
    #[serde(default)]
    pub wants_full_document: bool,
    #[serde(default)]
    pub wants_cover_letter: bool,
    /// Overrides the configured dispatch mode for this request.
    #[serde(default)]
    pub mode: Option<DispatchMode>,
}

impl CreateJobRequest {
    pub fn flags(&self) -> GenerationFlags {
        GenerationFlags::new(self.wants_full_document, self.wants_cover_letter)
    }
}

pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    runner: BoundedRunner,
    queue: Arc<dyn JobQueue>,
    default_mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        runner: BoundedRunner,
        queue: Arc<dyn JobQueue>,
        default_mode: DispatchMode,
    ) -> Self {
        Self {
            store,
            runner,
            queue,
            default_mode,
        }
    }

    pub fn default_mode(&self) -> DispatchMode {
        self.default_mode
    }

    /// Creates a PENDING job and runs it according to the dispatch mode.
    ///
    /// Premium flags are checked before anything is written.
    pub async fn create_and_run(
        &self,
        request: CreateJobRequest,
        caller_is_premium: bool,
    ) -> Result<JobSummary, AppError> {
        let flags = request.flags();
        if flags.requires_premium() && !caller_is_premium {
            return Err(AppError::Forbidden);
        }

        validate_input("job_description", &request.job_description)?;
        validate_input("candidate_text", &request.candidate_text)?;

        let mode = request.mode.unwrap_or(self.default_mode);
        let job = AnalysisJob::new(request.job_description, request.candidate_text, flags);
        self.store.create(&job).await?;
        info!(job_id = %job.id, ?mode, "Created analysis job");

        match mode {
            DispatchMode::Inline => {
                let finished = self.runner.run(job.id, flags).await?;
                Ok(JobSummary::from(&finished))
            }
            DispatchMode::Queued => {
                // An undispatched job stays PENDING; only the engine moves it on.
                if let Err(e) = self.queue.enqueue(&JobMessage::new(job.id, flags)).await {
                    error!(job_id = %job.id, "Failed to enqueue job: {e}");
                    return Err(e.into());
                }
                Ok(JobSummary::from(&job))
            }
        }
    }
}

/// Rejects blank inputs and inputs over `MAX_INPUT_CHARS` characters.
fn validate_input(field: &str, text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    let chars = text.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(AppError::Validation(format!(
            "{field} is {chars} characters; the limit is {MAX_INPUT_CHARS}"
        )));
    }
    Ok(())
}
