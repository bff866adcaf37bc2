//! Bounded execution: runs the engine under a wall-clock budget for callers
//! that wait on the result.
//!
//! The attempt runs as its own tokio task. On timeout the task is detached,
//! NOT aborted: an in-flight generation call cannot be cancelled, so the
//! attempt keeps running and may still write to the record after the
//! timeout write (last write wins, no fencing).

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};
use uuid::Uuid;

use crate::jobs::engine::{ExecutionEngine, ExecutionError, TIMEOUT_MESSAGE};
use crate::models::job::{AnalysisJob, GenerationFlags};

pub const DEFAULT_BUDGET: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct BoundedRunner {
    engine: Arc<ExecutionEngine>,
    budget: Duration,
}

impl BoundedRunner {
    pub fn new(engine: Arc<ExecutionEngine>, budget: Duration) -> Self {
        Self { engine, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns the engine's own outcome if it finishes in time, otherwise
    /// marks the job FAILED and returns `ExecutionError::Timeout`.
    pub async fn run(
        &self,
        job_id: Uuid,
        flags: GenerationFlags,
    ) -> Result<AnalysisJob, ExecutionError> {
        let engine = Arc::clone(&self.engine);
        let attempt = tokio::spawn(async move { engine.execute(job_id, flags).await });

        // Dropping the JoinHandle on timeout detaches the task.
        match tokio::time::timeout(self.budget, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                let err = ExecutionError::Aborted(join_error.to_string());
                error!(job_id = %job_id, "Analysis attempt aborted: {join_error}");
                self.fail(job_id, &format!("An unexpected error occurred: {err}"))
                    .await;
                Err(err)
            }
            Err(_) => {
                warn!(
                    job_id = %job_id,
                    "Analysis exceeded {}s budget; abandoning attempt",
                    self.budget.as_secs()
                );
                self.fail(job_id, TIMEOUT_MESSAGE).await;
                Err(ExecutionError::Timeout(self.budget))
            }
        }
    }

    async fn fail(&self, job_id: Uuid, message: &str) {
        if let Err(e) = self.engine.mark_failed(job_id, message).await {
            error!(job_id = %job_id, "Could not mark job failed: {e}");
        }
    }
}
