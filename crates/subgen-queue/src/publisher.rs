//! Status message publishing seam.

use async_trait::async_trait;
use subgen_models::Clip;

use crate::error::QueueResult;

/// Sends clip status messages to downstream consumers.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `clip` tagged with `message_type`, returning the broker message ID.
    async fn publish(&self, clip: &Clip, message_type: &str) -> QueueResult<String>;
}
