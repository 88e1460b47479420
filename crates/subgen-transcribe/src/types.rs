//! AssemblyAI request/response types.

use serde::{Deserialize, Serialize};
use subgen_models::TimedWord;

/// Response from `POST /v2/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub upload_url: String,
}

/// Body of `POST /v2/transcript`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRequest {
    /// URL returned by the upload endpoint
    pub audio_url: String,
    /// Let the service pick the spoken language
    pub language_detection: bool,
}

/// Transcript lifecycle as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl TranscriptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptStatus::Completed | TranscriptStatus::Error)
    }
}

/// A word with millisecond timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl From<Word> for TimedWord {
    fn from(word: Word) -> Self {
        TimedWord::new(word.text, word.start, word.end)
    }
}

/// Transcript resource returned by create and get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<Word>>,
}
