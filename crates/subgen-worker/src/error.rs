//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure of a single audio chunk.
///
/// Chunk failures are folded into the clip's error status and never
/// returned on their own.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Download failed for {chunk}: {source}")]
    Download {
        chunk: String,
        #[source]
        source: subgen_storage::StorageError,
    },

    #[error("Transcription failed for {chunk}: {source}")]
    Transcription {
        chunk: String,
        #[source]
        source: subgen_transcribe::TranscribeError,
    },

    #[error("Transcript for {0} has no words")]
    EmptyTranscript(String),

    #[error("Upload failed for {chunk}: {source}")]
    Upload {
        chunk: String,
        #[source]
        source: subgen_storage::StorageError,
    },

    #[error("Staging failed for {chunk}: {reason}")]
    Staging { chunk: String, reason: String },

    #[error("Chunk task for {chunk} aborted: {reason}")]
    Aborted { chunk: String, reason: String },
}

impl ChunkError {
    pub fn staging(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Staging {
            chunk: chunk.into(),
            reason: reason.into(),
        }
    }

    pub fn aborted(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Aborted {
            chunk: chunk.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChunkError::Download { .. } => "download",
            ChunkError::Transcription { .. } => "transcription",
            ChunkError::EmptyTranscript(_) => "empty_transcript",
            ChunkError::Upload { .. } => "upload",
            ChunkError::Staging { .. } => "staging",
            ChunkError::Aborted { .. } => "aborted",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Publish failed: {0}")]
    Publish(#[source] subgen_queue::QueueError),

    #[error("Queue error: {0}")]
    Queue(#[from] subgen_queue::QueueError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
