//! Transcription output models.

use serde::{Deserialize, Serialize};

/// A single transcribed word.
///
/// Offsets are milliseconds since the start of the audio chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWord {
    pub text: String,
    pub start: u64,
    pub end: u64,
}

impl TimedWord {
    pub fn new(text: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}
