//! In-memory stand-ins for the job store and the generation client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::generation::{ArtifactKind, GenerationError, Generator};
use crate::jobs::store::{JobStore, StoreError};
use crate::models::job::{AnalysisJob, JobStatus};

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<Uuid, AnalysisJob>>,
    writes: Mutex<Vec<AnalysisJob>>,
    fail_puts: AtomicBool,
}

impl InMemoryJobStore {
    /// Seeds a record without counting it as a write.
    pub fn seed(&self, job: AnalysisJob) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn remove(&self, id: Uuid) {
        self.jobs.lock().unwrap().remove(&id);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<AnalysisJob> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    /// Every record passed to `create` or `put`, in call order.
    pub fn writes(&self) -> Vec<AnalysisJob> {
        self.writes.lock().unwrap().clone()
    }

    pub fn status_history(&self) -> Vec<JobStatus> {
        self.writes().iter().map(|j| j.status).collect()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(job.clone());
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn put(&self, job: &AnalysisJob) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("store unavailable".to_string()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound(job.id));
        }
        jobs.insert(job.id, job.clone());
        self.writes.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// What the scripted generator does for one artifact kind.
#[derive(Clone)]
pub enum Scripted {
    Reply(String),
    Fail(GenerationError),
    Delay(Duration, String),
    Panic,
}

/// A `Generator` with a fixed script per kind. Unscripted kinds reply "<kind> text".
#[derive(Default)]
pub struct ScriptedGenerator {
    script: HashMap<ArtifactKind, Scripted>,
    calls: Mutex<Vec<ArtifactKind>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self::default()
            .with(ArtifactKind::Analysis, Scripted::Reply(text.to_string()))
            .with(ArtifactKind::FullDocument, Scripted::Reply(text.to_string()))
            .with(ArtifactKind::CoverLetter, Scripted::Reply(text.to_string()))
    }

    pub fn with(mut self, kind: ArtifactKind, behaviour: Scripted) -> Self {
        self.script.insert(kind, behaviour);
        self
    }

    pub fn calls(&self) -> Vec<ArtifactKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        kind: ArtifactKind,
        _job_description: &str,
        _candidate_text: &str,
    ) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(kind);
        match self.script.get(&kind).cloned() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Delay(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Scripted::Panic) => panic!("scripted generator panic for {kind}"),
            None => Ok(format!("{kind} text")),
        }
    }
}

pub fn pending_job(job_description: &str, candidate_text: &str) -> AnalysisJob {
    AnalysisJob::new(
        job_description.to_string(),
        candidate_text.to_string(),
        Default::default(),
    )
}
