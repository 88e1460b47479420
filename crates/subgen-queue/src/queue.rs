//! Job queue using Redis Streams.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::AsyncCommands;
use subgen_models::Clip;
use tracing::{debug, info, warn};

use crate::codec::{decode_clip, encode_message};
use crate::error::{QueueError, QueueResult};
use crate::publisher::Publisher;
use crate::stream::JobStream;

/// Stream entry field holding the inbound clip payload.
const JOB_FIELD: &str = "job";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream clip jobs are read from
    pub read_stream: String,
    /// Stream status messages are written to
    pub write_stream: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter stream name
    pub dlq_stream: String,
    /// Deliveries allowed before a reclaimed job is dead-lettered
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            read_stream: "subtitle-generator:read".to_string(),
            write_stream: "subtitle-generator:write".to_string(),
            consumer_group: "subtitle-generator:workers".to_string(),
            dlq_stream: "subtitle-generator:dlq".to_string(),
            max_retries: 3,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            read_stream: std::env::var("QUEUE_READ_STREAM").unwrap_or(defaults.read_stream),
            write_stream: std::env::var("QUEUE_WRITE_STREAM").unwrap_or(defaults.write_stream),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        }
    }
}

/// A clip job read from the stream.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry ID, needed to ack
    pub message_id: String,
    /// Decoded clip
    pub clip: Clip,
    /// How many times the entry has been delivered, including this one
    pub deliveries: usize,
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.read_stream)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Add a clip job to the read stream.
    pub async fn enqueue(&self, clip: &Clip) -> QueueResult<String> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(clip)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.read_stream)
            .arg("*")
            .arg(JOB_FIELD)
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(clip_id = %clip.id, "Enqueued clip with message ID {}", message_id);
        Ok(message_id)
    }

    /// Consume new jobs from the queue.
    ///
    /// Entries that do not decode into a clip are dead-lettered and acked here,
    /// so they never reach the caller.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.connection().await?;

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.read_stream)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        let entries: Vec<StreamId> = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();

        let mut deliveries = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(clip) = self.decode_entry(&entry).await {
                debug!(clip_id = %clip.id, "Consumed clip from stream");
                deliveries.push(Delivery {
                    message_id: entry.id,
                    clip,
                    deliveries: 1,
                });
            }
        }

        Ok(deliveries)
    }

    /// Claim jobs that have been pending longer than `min_idle_ms`.
    ///
    /// Covers workers that crashed mid-job and jobs whose status message could
    /// not be published. Entries in `exclude` are never claimed. Jobs delivered
    /// more than `max_retries` times are dead-lettered instead of returned.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
        exclude: &HashSet<String>,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.connection().await?;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.read_stream)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count + exclude.len())
            .query_async(&mut conn)
            .await?;

        let candidates: Vec<_> = pending
            .ids
            .iter()
            .filter(|p| !exclude.contains(&p.id))
            .take(count)
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let delivered: HashMap<String, usize> = candidates
            .iter()
            .map(|p| (p.id.clone(), p.times_delivered))
            .collect();
        let ids: Vec<&str> = candidates.iter().map(|p| p.id.as_str()).collect();

        let claimed: StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.config.read_stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg(&ids)
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();
        for entry in claimed.ids {
            // XCLAIM bumps the delivery counter once more
            let times = delivered.get(&entry.id).copied().unwrap_or(0) + 1;

            if times > self.config.max_retries as usize {
                let payload = entry_payload(&entry).unwrap_or_default();
                warn!(
                    message_id = %entry.id,
                    deliveries = times,
                    "Job exceeded max deliveries, moving to DLQ"
                );
                self.dead_letter(&entry.id, &payload, "exceeded max deliveries")
                    .await?;
                continue;
            }

            if let Some(clip) = self.decode_entry(&entry).await {
                info!(clip_id = %clip.id, deliveries = times, "Claimed pending clip from stream");
                deliveries.push(Delivery {
                    message_id: entry.id,
                    clip,
                    deliveries: times,
                });
            }
        }

        Ok(deliveries)
    }

    /// Reset the idle time of entries this consumer is still working on.
    ///
    /// `XCLAIM ... JUSTID` with a zero idle threshold keeps ownership and does
    /// not bump the delivery counter, so the entries stay out of other
    /// consumers' `claim_pending` while their jobs run.
    pub async fn touch(&self, consumer_name: &str, message_ids: &[String]) -> QueueResult<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;

        let touched: Vec<String> = redis::cmd("XCLAIM")
            .arg(&self.config.read_stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_ids)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        if touched.len() < message_ids.len() {
            warn!(
                expected = message_ids.len(),
                touched = touched.len(),
                "Some in-flight entries are no longer pending"
            );
        }
        Ok(())
    }

    /// Decode an entry, dead-lettering it when it carries no valid clip.
    async fn decode_entry(&self, entry: &StreamId) -> Option<Clip> {
        let Some(payload) = entry_payload(entry) else {
            warn!(message_id = %entry.id, "Stream entry has no job field");
            self.dead_letter(&entry.id, "", "missing job field").await.ok();
            return None;
        };

        match decode_clip(&payload) {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!(message_id = %entry.id, error = %e, "Failed to decode job payload");
                if let Err(dlq_err) = self.dead_letter(&entry.id, &payload, &e.to_string()).await {
                    warn!(message_id = %entry.id, error = %dlq_err, "Failed to dead-letter job");
                }
                None
            }
        }
    }

    /// Acknowledge a job (mark as completed).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.read_stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        // Delete the message from the stream
        redis::cmd("XDEL")
            .arg(&self.config.read_stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Move a raw payload to the dead letter stream and ack the original entry.
    pub async fn dead_letter(&self, message_id: &str, payload: &str, error: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg(JOB_FIELD)
            .arg(payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!("Moved job {} to DLQ: {}", message_id, error);
        Ok(())
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.read_stream).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream).await?;
        Ok(len)
    }

    /// Check connectivity.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for JobQueue {
    async fn publish(&self, clip: &Clip, message_type: &str) -> QueueResult<String> {
        let payload = encode_message(clip)?;
        let mut conn = self.connection().await?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.write_stream)
            .arg("*")
            .arg("type")
            .arg(message_type)
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::publish_failed(e.to_string()))?;

        info!(
            clip_id = %clip.id,
            status = %clip.status,
            "Published {} with message ID {}",
            message_type,
            message_id
        );
        Ok(message_id)
    }
}

#[async_trait]
impl JobStream for JobQueue {
    async fn init(&self) -> QueueResult<()> {
        JobQueue::init(self).await
    }

    async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        JobQueue::consume(self, consumer_name, block_ms, count).await
    }

    async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
        exclude: &HashSet<String>,
    ) -> QueueResult<Vec<Delivery>> {
        JobQueue::claim_pending(self, consumer_name, min_idle_ms, count, exclude).await
    }

    async fn touch(&self, consumer_name: &str, message_ids: &[String]) -> QueueResult<()> {
        JobQueue::touch(self, consumer_name, message_ids).await
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        JobQueue::ack(self, message_id).await
    }
}

fn entry_payload(entry: &StreamId) -> Option<String> {
    match entry.map.get(JOB_FIELD) {
        Some(redis::Value::BulkString(payload)) => {
            Some(String::from_utf8_lossy(payload).into_owned())
        }
        Some(redis::Value::SimpleString(payload)) => Some(payload.clone()),
        _ => None,
    }
}
