//! Job source seam used by the executor.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::queue::Delivery;

/// Consumer-group style job source.
///
/// Entries are delivered to one consumer, stay pending until acked and can be
/// reclaimed by any consumer once they sit idle long enough.
#[async_trait]
pub trait JobStream: Send + Sync {
    async fn init(&self) -> QueueResult<()>;

    /// Read new entries, blocking up to `block_ms`.
    async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>>;

    /// Take over entries idle for at least `min_idle_ms`, skipping `exclude`.
    async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
        exclude: &HashSet<String>,
    ) -> QueueResult<Vec<Delivery>>;

    /// Mark entries as still being worked on.
    async fn touch(&self, consumer_name: &str, message_ids: &[String]) -> QueueResult<()>;

    async fn ack(&self, message_id: &str) -> QueueResult<()>;
}
