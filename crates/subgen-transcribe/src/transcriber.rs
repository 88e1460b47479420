//! Transcription seam.

use std::path::Path;

use async_trait::async_trait;
use subgen_models::TimedWord;

use crate::error::TranscribeResult;

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path` into timed words, in spoken order.
    ///
    /// The language is detected by the backend.
    async fn transcribe(&self, audio_path: &Path) -> TranscribeResult<Vec<TimedWord>>;
}
