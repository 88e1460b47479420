//! Clip orchestration.
//!
//! Every audio chunk of a clip runs through the [`ChunkProcessor`] on a
//! bounded pool. All chunks are awaited before the clip's status is decided,
//! and exactly one status message is published per clip.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use subgen_models::{Clip, ClipStatus, SUBTITLE_GENERATOR_MESSAGE_TYPE};
use subgen_queue::Publisher;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::chunk::ChunkProcessor;
use crate::error::{ChunkError, WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::ordering::sort_chunk_results;
use crate::staging::{clip_staging_dir, remove_empty_dir};

/// Terminal state of a clip that was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    /// All chunks succeeded; `subtitles` names were attached.
    Completed { subtitles: usize },
    /// At least one chunk failed; nothing was attached.
    Failed {
        failed_chunks: usize,
        total_chunks: usize,
    },
}

impl ClipOutcome {
    pub fn status(&self) -> ClipStatus {
        match self {
            ClipOutcome::Completed { .. } => ClipStatus::SubtitleGeneratorComplete,
            ClipOutcome::Failed { .. } => ClipStatus::SubtitleGeneratorError,
        }
    }
}

/// Runs a clip's chunks and publishes its terminal status.
pub struct ClipOrchestrator {
    processor: ChunkProcessor,
    publisher: Arc<dyn Publisher>,
    max_parallel: usize,
}

impl ClipOrchestrator {
    pub fn new(
        processor: ChunkProcessor,
        publisher: Arc<dyn Publisher>,
        max_parallel: usize,
    ) -> Self {
        Self {
            processor,
            publisher,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Process every chunk of `clip`, update its status and subtitles, and publish it.
    ///
    /// Chunk failures become the clip's error status. Only a failed publish is
    /// returned as an error.
    pub async fn process(&self, clip: &mut Clip) -> WorkerResult<ClipOutcome> {
        let logger = JobLogger::new(&clip.id, &clip.user_id);
        let span = logger.span();
        self.process_inner(clip, &logger).instrument(span).await
    }

    async fn process_inner(&self, clip: &mut Clip, logger: &JobLogger) -> WorkerResult<ClipOutcome> {
        let start = Instant::now();
        let chunks = clip.audios().to_vec();
        logger.started(chunks.len());

        let results = self.run_chunks(clip, &chunks).await;

        if let Some(dir) = clip_staging_dir(self.processor.work_dir(), &clip.user_id, &clip.id) {
            remove_empty_dir(&dir).await;
        }

        let mut names = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(name) => names.push(name),
                Err(e) => failures.push(e),
            }
        }

        let outcome = if failures.is_empty() {
            sort_chunk_results(&mut names);
            let subtitles = names.len();
            clip.original_video.subtitles.extend(names);
            ClipOutcome::Completed { subtitles }
        } else {
            for e in &failures {
                logger.chunk_failed(e);
            }
            ClipOutcome::Failed {
                failed_chunks: failures.len(),
                total_chunks: chunks.len(),
            }
        };
        clip.status = outcome.status();

        if let Err(e) = self
            .publisher
            .publish(clip, SUBTITLE_GENERATOR_MESSAGE_TYPE)
            .await
        {
            metrics::record_publish_failure();
            logger.publish_failed(&clip.status, &e);
            return Err(WorkerError::Publish(e));
        }

        let elapsed = start.elapsed();
        metrics::record_job(clip.status.as_str(), elapsed.as_secs_f64());
        logger.finished(&outcome, elapsed);

        Ok(outcome)
    }

    /// Run all chunks, at most `max_parallel` at a time, and collect every result.
    async fn run_chunks(&self, clip: &Clip, chunks: &[String]) -> Vec<Result<String, ChunkError>> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let shared = Arc::new(clip.clone());

        let handles: Vec<_> = chunks
            .iter()
            .map(|chunk| {
                let semaphore = Arc::clone(&semaphore);
                let processor = self.processor.clone();
                let clip = Arc::clone(&shared);
                let chunk = chunk.clone();

                tokio::spawn(
                    async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| ChunkError::aborted(&chunk, "chunk pool closed"))?;
                        processor.process(&clip, &chunk).await
                    }
                    .in_current_span(),
                )
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(chunks)
            .map(|(joined, chunk)| {
                joined.unwrap_or_else(|e| Err(ChunkError::aborted(chunk, e.to_string())))
            })
            .collect()
    }
}
