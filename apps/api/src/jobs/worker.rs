//! Queue worker: consumes `JobMessage`s and runs them with no deadline.
//!
//! Nothing waits on a queued job, so failures end here: they are logged and
//! the record is left FAILED. A job deleted before it was dequeued is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::jobs::engine::{ExecutionEngine, ExecutionError};
use crate::jobs::queue::{Delivery, JobMessage, RedisJobQueue};

/// How long one blocking pop waits before re-checking for shutdown.
const POLL_WAIT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct QueueWorker {
    id: usize,
    engine: Arc<ExecutionEngine>,
    queue: RedisJobQueue,
    shutdown: watch::Receiver<bool>,
}

impl QueueWorker {
    pub fn new(
        id: usize,
        engine: Arc<ExecutionEngine>,
        queue: RedisJobQueue,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            engine,
            queue,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!(worker = self.id, "Queue worker started");

        'outer: while !*self.shutdown.borrow() {
            let mut consumer = match self.queue.consumer().await {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!(worker = self.id, "Queue connection failed: {e}");
                    if self.wait_before_reconnect().await {
                        continue 'outer;
                    }
                    break 'outer;
                }
            };

            loop {
                let next = tokio::select! {
                    _ = self.shutdown.changed() => break 'outer,
                    next = consumer.next(POLL_WAIT) => next,
                };

                match next {
                    Ok(Some(delivery)) => {
                        self.handle(&delivery).await;
                        if let Err(e) = consumer.ack(&delivery).await {
                            warn!(worker = self.id, "Failed to ack delivery: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(worker = self.id, "Queue read failed, reconnecting: {e}");
                        if self.wait_before_reconnect().await {
                            continue 'outer;
                        }
                        break 'outer;
                    }
                }
            }
        }

        info!(worker = self.id, "Queue worker stopped");
    }

    /// Sleeps `RECONNECT_DELAY` before the next connection attempt.
    /// Returns false if shutdown was signalled while waiting.
    async fn wait_before_reconnect(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown.changed() => false,
            _ = tokio::time::sleep(RECONNECT_DELAY) => true,
        }
    }

    async fn handle(&self, delivery: &Delivery) {
        match delivery.decode() {
            Ok(message) => process_message(&self.engine, message).await,
            Err(e) => warn!(worker = self.id, "Dropping undecodable queue payload: {e}"),
        }
    }
}

/// Runs one dequeued job to completion. Never returns an error.
pub async fn process_message(engine: &Arc<ExecutionEngine>, message: JobMessage) {
    let job_id = message.job_id;
    let flags = message.flags();

    // Own task so a panicking attempt is contained and still recorded.
    let attempt = {
        let engine = Arc::clone(engine);
        tokio::spawn(async move { engine.execute(job_id, flags).await })
    };

    match attempt.await {
        Ok(Ok(job)) => info!(job_id = %job_id, status = %job.status, "Queued job finished"),
        Ok(Err(ExecutionError::NotFound(_))) => {
            debug!(job_id = %job_id, "Job no longer exists; skipping")
        }
        Ok(Err(e)) => error!(job_id = %job_id, "Queued job failed: {e}"),
        Err(join_error) => {
            error!(job_id = %job_id, "Queued job aborted: {join_error}");
            let message = format!("An unexpected error occurred: {join_error}");
            if let Err(e) = engine.mark_failed(job_id, &message).await {
                error!(job_id = %job_id, "Could not mark job failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::generation::{ArtifactKind, GenerationError};
    use crate::jobs::testing::{pending_job, InMemoryJobStore, Scripted, ScriptedGenerator};
    use crate::models::job::{GenerationFlags, JobStatus};

    fn engine(store: &Arc<InMemoryJobStore>, generator: ScriptedGenerator) -> Arc<ExecutionEngine> {
        Arc::new(ExecutionEngine::new(store.clone(), Arc::new(generator)))
    }

    /// A fake redis that accepts connections and answers every command with
    /// NOAUTH. Returns its URL and a counter of commands received.
    async fn refusing_redis() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("redis://{}/", listener.local_addr().unwrap());
        let commands = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&commands);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                        // one RESP array per command
                        let chunk = &buf[..n];
                        let count = usize::from(chunk[0] == b'*')
                            + chunk.windows(3).filter(|w| *w == b"\r\n*").count();
                        counter.fetch_add(count, Ordering::SeqCst);
                        let reply = b"-NOAUTH Authentication required.\r\n".repeat(count);
                        if socket.write_all(&reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        (url, commands)
    }

    #[tokio::test]
    async fn test_failing_queue_reads_back_off_before_retrying() {
        let (url, commands) = refusing_redis().await;
        let store = Arc::new(InMemoryJobStore::default());
        let queue = RedisJobQueue::new(&url, "resumeforge:test").unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = QueueWorker::new(
            0,
            engine(&store, ScriptedGenerator::default()),
            queue,
            shutdown_rx,
        );
        let handle = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_millis(500)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop on shutdown")
            .unwrap();

        // a retry loop without a pause would issue hundreds of commands here
        let seen = commands.load(Ordering::SeqCst);
        assert!(seen <= 5, "worker retried {seen} times within 500ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_wait_lasts_reconnect_delay() {
        let store = Arc::new(InMemoryJobStore::default());
        let queue = RedisJobQueue::new("redis://127.0.0.1/", "resumeforge:test").unwrap();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut worker = QueueWorker::new(
            0,
            engine(&store, ScriptedGenerator::default()),
            queue,
            shutdown_rx,
        );
        let started = tokio::time::Instant::now();

        assert!(worker.wait_before_reconnect().await);
        assert!(started.elapsed() >= RECONNECT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_wait_ends_early_on_shutdown() {
        let store = Arc::new(InMemoryJobStore::default());
        let queue = RedisJobQueue::new("redis://127.0.0.1/", "resumeforge:test").unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut worker = QueueWorker::new(
            0,
            engine(&store, ScriptedGenerator::default()),
            queue,
            shutdown_rx,
        );
        shutdown_tx.send(true).unwrap();
        let started = tokio::time::Instant::now();

        assert!(!worker.wait_before_reconnect().await);
        assert!(started.elapsed() < RECONNECT_DELAY);
    }

    #[tokio::test]
    async fn test_deleted_job_is_a_silent_no_op() {
        let store = Arc::new(InMemoryJobStore::default());
        let job = pending_job("jd", "cv");
        let id = job.id;
        store.seed(job);
        store.remove(id);

        process_message(
            &engine(&store, ScriptedGenerator::default()),
            JobMessage::new(id, GenerationFlags::new(true, true)),
        )
        .await;

        assert!(store.writes().is_empty());
        assert!(store.snapshot(id).is_none());
    }

    #[tokio::test]
    async fn test_queued_job_runs_with_message_flags() {
        let store = Arc::new(InMemoryJobStore::default());
        let job = pending_job("Senior Go Engineer", "5 years backend experience");
        let id = job.id;
        store.seed(job);

        process_message(
            &engine(&store, ScriptedGenerator::default()),
            JobMessage::new(id, GenerationFlags::new(false, true)),
        )
        .await;

        let stored = store.snapshot(id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.generated_cover_letter.as_deref(), Some("cover letter text"));
        assert!(stored.generated_document.is_none());
    }

    #[tokio::test]
    async fn test_fault_is_swallowed_after_failed_write() {
        let store = Arc::new(InMemoryJobStore::default());
        let job = pending_job("jd", "cv");
        let id = job.id;
        store.seed(job);
        let generator = ScriptedGenerator::default().with(
            ArtifactKind::FullDocument,
            Scripted::Fail(GenerationError::Unexpected("connection reset".into())),
        );

        process_message(
            &engine(&store, generator),
            JobMessage::new(id, GenerationFlags::new(true, false)),
        )
        .await;

        let stored = store.snapshot(id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.analysis_result.unwrap().contains("connection reset"));
        assert_eq!(
            store.status_history().last().copied(),
            Some(JobStatus::Failed)
        );
    }

    #[tokio::test]
    async fn test_panic_marks_job_failed() {
        let store = Arc::new(InMemoryJobStore::default());
        let job = pending_job("jd", "cv");
        let id = job.id;
        store.seed(job);
        let generator =
            ScriptedGenerator::default().with(ArtifactKind::Analysis, Scripted::Panic);

        process_message(&engine(&store, generator), JobMessage::new(id, GenerationFlags::default()))
            .await;

        assert_eq!(store.snapshot(id).unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_redelivered_completed_job_is_left_alone() {
        let store = Arc::new(InMemoryJobStore::default());
        let job = pending_job("jd", "cv");
        let id = job.id;
        store.seed(job);
        let engine = engine(&store, ScriptedGenerator::replying("first"));
        let message = JobMessage::new(id, GenerationFlags::default());

        process_message(&engine, message.clone()).await;
        let writes_after_first = store.writes().len();
        process_message(&engine, message).await;

        assert_eq!(store.writes().len(), writes_after_first);
        assert_eq!(store.snapshot(id).unwrap().status, JobStatus::Completed);
    }
}
