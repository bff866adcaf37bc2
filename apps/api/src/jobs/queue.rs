//! Redis list-backed task queue for queued dispatch.
//!
//! - enqueue: LPUSH onto `<key>`
//! - next:    BRPOPLPUSH `<key>` → `<key>:processing`
//! - ack:     LREM the payload from `<key>:processing`
//!
//! A crash between `next` and `ack` leaves the payload in the processing
//! list; `recover_in_flight` pushes it back at startup (at-least-once).

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::GenerationFlags;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Payload carried through the queue. Flags travel with the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: Uuid,
    pub wants_full_document: bool,
    pub wants_cover_letter: bool,
}

impl JobMessage {
    pub fn new(job_id: Uuid, flags: GenerationFlags) -> Self {
        Self {
            job_id,
            wants_full_document: flags.wants_full_document,
            wants_cover_letter: flags.wants_cover_letter,
        }
    }

    pub fn flags(&self) -> GenerationFlags {
        GenerationFlags::new(self.wants_full_document, self.wants_cover_letter)
    }
}

/// Producer side of the queue, as seen by the dispatcher.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
    key: String,
    processing_key: String,
}

impl RedisJobQueue {
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let key = key.into();
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            processing_key: format!("{key}:processing"),
            key,
        })
    }

    /// Opens a dedicated connection for one consumer loop. Blocking pops must
    /// not share a connection with anything else.
    pub async fn consumer(&self) -> Result<QueueConsumer, QueueError> {
        Ok(QueueConsumer {
            conn: self.client.get_multiplexed_async_connection().await?,
            key: self.key.clone(),
            processing_key: self.processing_key.clone(),
        })
    }

    /// Moves every payload left in the processing list back onto the queue.
    pub async fn recover_in_flight(&self) -> Result<usize, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut recovered = 0;
        loop {
            let moved: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.processing_key)
                .arg(&self.key)
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                return Ok(recovered);
            }
            recovered += 1;
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

/// A raw payload taken from the queue, pending acknowledgement.
#[derive(Debug, Clone)]
pub struct Delivery {
    payload: String,
}

impl Delivery {
    pub fn new(payload: String) -> Self {
        Self { payload }
    }

    pub fn decode(&self) -> Result<JobMessage, QueueError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

pub struct QueueConsumer {
    conn: MultiplexedConnection,
    key: String,
    processing_key: String,
}

impl QueueConsumer {
    /// Blocks up to `wait` for the next payload. `None` means the wait expired.
    pub async fn next(&mut self, wait: Duration) -> Result<Option<Delivery>, QueueError> {
        let payload: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(&self.key)
            .arg(&self.processing_key)
            .arg(wait.as_secs().max(1))
            .query_async(&mut self.conn)
            .await?;
        Ok(payload.map(Delivery::new))
    }

    pub async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        let _: i64 = redis::cmd("LREM")
            .arg(&self.processing_key)
            .arg(1)
            .arg(&delivery.payload)
            .query_async(&mut self.conn)
            .await?;
        Ok(())
    }
}
