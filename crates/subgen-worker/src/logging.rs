//! Clip job lifecycle logging.

use std::time::Duration;

use subgen_models::ClipStatus;
use subgen_queue::QueueError;
use tracing::{error, info, info_span, warn, Span};

use crate::error::ChunkError;
use crate::orchestrator::ClipOutcome;

/// Lifecycle lines of one clip job, each tagged with the clip and its owner.
#[derive(Debug, Clone)]
pub struct JobLogger {
    clip_id: String,
    user_id: String,
}

impl JobLogger {
    pub fn new(clip_id: &str, user_id: &str) -> Self {
        Self {
            clip_id: clip_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Span covering the job's work, chunk tasks included.
    pub fn span(&self) -> Span {
        info_span!("clip_job", clip_id = %self.clip_id, user_id = %self.user_id)
    }

    pub fn started(&self, chunks: usize) {
        info!(
            clip_id = %self.clip_id,
            user_id = %self.user_id,
            chunks,
            "Subtitle generation started"
        );
    }

    pub fn chunk_failed(&self, err: &ChunkError) {
        warn!(
            clip_id = %self.clip_id,
            user_id = %self.user_id,
            kind = err.kind(),
            error = %err,
            "Chunk failed, clip will report an error"
        );
    }

    pub fn publish_failed(&self, status: &ClipStatus, err: &QueueError) {
        error!(
            clip_id = %self.clip_id,
            user_id = %self.user_id,
            status = %status,
            error = %err,
            "Failed to publish clip status"
        );
    }

    pub fn finished(&self, outcome: &ClipOutcome, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            ClipOutcome::Completed { subtitles } => info!(
                clip_id = %self.clip_id,
                user_id = %self.user_id,
                subtitles,
                elapsed_ms,
                "Subtitle generation complete"
            ),
            ClipOutcome::Failed {
                failed_chunks,
                total_chunks,
            } => error!(
                clip_id = %self.clip_id,
                user_id = %self.user_id,
                failed_chunks,
                total_chunks,
                elapsed_ms,
                "Subtitle generation failed"
            ),
        }
    }
}
