//! Per-chunk subtitle pipeline.
//!
//! download audio -> transcribe -> build SRT -> upload SRT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use subgen_models::Clip;
use subgen_storage::{audio_key, subtitle_key, ObjectStore};
use subgen_transcribe::Transcriber;
use tracing::{debug, info, warn};

use crate::error::ChunkError;
use crate::metrics;
use crate::staging::{chunk_file_name, clip_staging_dir, subtitle_name, StagedFiles};
use crate::subtitle::{build_srt, SubtitleError};

/// Turns one audio chunk into an uploaded subtitle file.
#[derive(Clone)]
pub struct ChunkProcessor {
    store: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    work_dir: PathBuf,
}

impl ChunkProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            transcriber,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &std::path::Path {
        &self.work_dir
    }

    /// Process `chunk` of `clip`, returning the subtitle file name.
    pub async fn process(&self, clip: &Clip, chunk: &str) -> Result<String, ChunkError> {
        let start = Instant::now();
        let result = self.run(clip, chunk).await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(name) => {
                metrics::record_chunk("ok", elapsed);
                info!(clip_id = %clip.id, chunk, subtitle = %name, "Chunk processed");
            }
            Err(e) => {
                metrics::record_chunk(e.kind(), elapsed);
                warn!(clip_id = %clip.id, chunk, error = %e, "Chunk failed");
            }
        }

        result
    }

    async fn run(&self, clip: &Clip, chunk: &str) -> Result<String, ChunkError> {
        let file_name = chunk_file_name(chunk)
            .ok_or_else(|| ChunkError::staging(chunk, "chunk reference has no file name"))?;
        let dir = clip_staging_dir(&self.work_dir, &clip.user_id, &clip.id)
            .ok_or_else(|| ChunkError::staging(chunk, "clip IDs are not valid path components"))?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ChunkError::staging(chunk, format!("failed to create {}: {}", dir.display(), e)))?;
        let staged = StagedFiles::new_in(&dir, file_name)
            .map_err(|e| ChunkError::staging(chunk, format!("failed to stage in {}: {}", dir.display(), e)))?;

        // 1. Download
        let key = audio_key(&clip.user_id, &clip.id, chunk);
        debug!(clip_id = %clip.id, chunk, key = %key, "Downloading chunk");
        self.store
            .download_file(&key, staged.audio_path())
            .await
            .map_err(|source| ChunkError::Download {
                chunk: chunk.to_string(),
                source,
            })?;

        // 2. Transcribe and render
        let words = self
            .transcriber
            .transcribe(staged.audio_path())
            .await
            .map_err(|source| ChunkError::Transcription {
                chunk: chunk.to_string(),
                source,
            })?;

        let srt = build_srt(&words).map_err(|e| match e {
            SubtitleError::EmptyTranscript => ChunkError::EmptyTranscript(chunk.to_string()),
        })?;

        tokio::fs::write(staged.subtitle_path(), srt)
            .await
            .map_err(|e| ChunkError::staging(chunk, format!("failed to write subtitle file: {}", e)))?;

        // 3. Upload
        let name = subtitle_name(file_name);
        let key = subtitle_key(&clip.user_id, &clip.id, &name);
        debug!(clip_id = %clip.id, chunk, key = %key, "Uploading subtitles");
        self.store
            .upload_file(staged.subtitle_path(), &key)
            .await
            .map_err(|source| ChunkError::Upload {
                chunk: chunk.to_string(),
                source,
            })?;

        Ok(name)
    }
}
