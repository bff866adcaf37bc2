//! Execution Engine: runs one analysis job to a terminal state.
//!
//! Flow: load → IN_PROGRESS → truncate inputs → analysis → [full document] →
//!       [cover letter] → COMPLETED, with a store write after every step.
//!
//! Any hard fault flips the record to FAILED (diagnostic in `analysis_result`)
//! before the typed error is returned. Partial outputs are kept.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::generation::{ArtifactKind, GenerationError, Generator};
use crate::jobs::store::{JobStore, StoreError};
use crate::models::job::{AnalysisJob, GenerationFlags, JobStatus};

/// Inputs are silently cut to this many characters before generation.
pub const MAX_INPUT_CHARS: usize = 20_000;

/// Stored in `analysis_result` when a bounded run runs out of time.
pub const TIMEOUT_MESSAGE: &str = "Processing timed out. Please try again.";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("{kind} generation failed: {reason}")]
    Generation { kind: ArtifactKind, reason: String },

    #[error("job store error: {0}")]
    Store(StoreError),

    #[error("processing timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("execution aborted: {0}")]
    Aborted(String),
}

impl From<StoreError> for ExecutionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ExecutionError::NotFound(id),
            other => ExecutionError::Store(other),
        }
    }
}

/// What to do when the provider reports a failure for a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderErrorPolicy {
    /// Store the provider's failure text as the step output and carry on.
    #[default]
    Embed,
    /// Treat it as a hard fault and fail the job.
    Fail,
}

pub struct ExecutionEngine {
    store: Arc<dyn JobStore>,
    generator: Arc<dyn Generator>,
    provider_errors: ProviderErrorPolicy,
}

impl ExecutionEngine {
    pub fn new(store: Arc<dyn JobStore>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            generator,
            provider_errors: ProviderErrorPolicy::default(),
        }
    }

    pub fn with_provider_error_policy(mut self, policy: ProviderErrorPolicy) -> Self {
        self.provider_errors = policy;
        self
    }

    /// Runs the job identified by `job_id` to a terminal state.
    ///
    /// A missing record is `NotFound` with no writes. A record that is already
    /// terminal is returned untouched, which makes queue redelivery harmless.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn execute(
        &self,
        job_id: Uuid,
        flags: GenerationFlags,
    ) -> Result<AnalysisJob, ExecutionError> {
        let mut job = self
            .store
            .get(job_id)
            .await?
            .ok_or(ExecutionError::NotFound(job_id))?;

        if job.status.is_terminal() {
            info!("Job already {}, nothing to do", job.status);
            return Ok(job);
        }

        match self.run_steps(&mut job, flags).await {
            Ok(()) => {
                info!("Job completed");
                Ok(job)
            }
            Err(err) => {
                self.record_failure(&mut job, &err).await;
                Err(err)
            }
        }
    }

    /// Overwrites the record as FAILED with `message`. A vanished record is a no-op.
    pub async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<(), StoreError> {
        let Some(mut job) = self.store.get(job_id).await? else {
            return Ok(());
        };
        job.fail_with(message);
        match self.store.put(&job).await {
            Err(StoreError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn run_steps(
        &self,
        job: &mut AnalysisJob,
        flags: GenerationFlags,
    ) -> Result<(), ExecutionError> {
        job.set_status(JobStatus::InProgress);
        self.store.put(job).await?;

        let job_description = truncate_chars(&job.job_description, MAX_INPUT_CHARS).to_owned();
        let candidate_text = truncate_chars(&job.candidate_text, MAX_INPUT_CHARS).to_owned();

        for kind in requested_kinds(flags) {
            let text = self.generate(kind, &job_description, &candidate_text).await?;
            *output_slot(job, kind) = Some(text);
            job.touch();
            self.store.put(job).await?;
        }

        job.set_status(JobStatus::Completed);
        self.store.put(job).await?;
        Ok(())
    }

    async fn generate(
        &self,
        kind: ArtifactKind,
        job_description: &str,
        candidate_text: &str,
    ) -> Result<String, ExecutionError> {
        match self
            .generator
            .generate(kind, job_description, candidate_text)
            .await
        {
            Ok(text) => Ok(text),
            Err(GenerationError::Provider(reason))
                if self.provider_errors == ProviderErrorPolicy::Embed =>
            {
                warn!("Provider error on {kind} stored as output: {reason}");
                Ok(format!(
                    "An error occurred while generating the {kind}: {reason}"
                ))
            }
            Err(e) => Err(ExecutionError::Generation {
                kind,
                reason: e.to_string(),
            }),
        }
    }

    async fn record_failure(&self, job: &mut AnalysisJob, err: &ExecutionError) {
        error!("Job failed: {err}");

        if matches!(err, ExecutionError::NotFound(_)) {
            return; // the record is gone; there is nothing to mark
        }

        job.fail_with(format!("An unexpected error occurred: {err}"));
        if let Err(e) = self.store.put(job).await {
            error!("Could not record failure for job {}: {e}", job.id);
        }
    }
}

/// The mandatory analysis first, then the flagged extras, in fixed order.
pub fn requested_kinds(flags: GenerationFlags) -> Vec<ArtifactKind> {
    let mut kinds = vec![ArtifactKind::Analysis];
    if flags.wants_full_document {
        kinds.push(ArtifactKind::FullDocument);
    }
    if flags.wants_cover_letter {
        kinds.push(ArtifactKind::CoverLetter);
    }
    kinds
}

fn output_slot(job: &mut AnalysisJob, kind: ArtifactKind) -> &mut Option<String> {
    match kind {
        ArtifactKind::Analysis => &mut job.analysis_result,
        ArtifactKind::FullDocument => &mut job.generated_document,
        ArtifactKind::CoverLetter => &mut job.generated_cover_letter,
    }
}

/// Keeps at most `max` characters (Unicode scalar values), never splitting one.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
