//! Clip job model.
//!
//! A clip is the unit of work exchanged with upstream services. The worker
//! reads `originalVideo.audios`, fills `originalVideo.subtitles` and flips
//! `status`. Everything else is carried through untouched.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Clip processing status.
///
/// The string forms are shared with downstream consumers and must not change.
/// Statuses this worker does not produce are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ClipStatus {
    /// Waiting for subtitles
    #[default]
    Pending,
    /// Every chunk was transcribed and uploaded
    SubtitleGeneratorComplete,
    /// At least one chunk failed
    SubtitleGeneratorError,
    /// Any status owned by another service
    Other(String),
}

impl ClipStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClipStatus::Pending => "PENDING",
            ClipStatus::SubtitleGeneratorComplete => "SUBTITLE_GENERATOR_COMPLETE",
            ClipStatus::SubtitleGeneratorError => "SUBTITLE_GENERATOR_ERROR",
            ClipStatus::Other(s) => s,
        }
    }
}

impl From<String> for ClipStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => ClipStatus::Pending,
            "SUBTITLE_GENERATOR_COMPLETE" => ClipStatus::SubtitleGeneratorComplete,
            "SUBTITLE_GENERATOR_ERROR" => ClipStatus::SubtitleGeneratorError,
            _ => ClipStatus::Other(s),
        }
    }
}

impl From<ClipStatus> for String {
    fn from(status: ClipStatus) -> Self {
        match status {
            ClipStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source video attached to a clip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Video {
    /// Audio chunk file names, e.g. `episode_3.mp3`
    #[serde(default)]
    pub audios: Vec<String>,
    /// Subtitle file names, ordered by chunk index
    #[serde(default)]
    pub subtitles: Vec<String>,
    /// Fields owned by other services
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A clip job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Clip ID
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Owner of the clip
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    /// Current status
    #[serde(default)]
    pub status: ClipStatus,
    /// Video the audio chunks were cut from
    #[serde(default)]
    pub original_video: Video,
    /// Fields owned by other services
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Clip {
    /// Create a pending clip with the given audio chunks.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        audios: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            status: ClipStatus::Pending,
            original_video: Video {
                audios,
                ..Default::default()
            },
            extra: Map::new(),
        }
    }

    /// Audio chunk references.
    pub fn audios(&self) -> &[String] {
        &self.original_video.audios
    }

    /// Subtitle file names attached so far.
    pub fn subtitles(&self) -> &[String] {
        &self.original_video.subtitles
    }
}

/// Protobuf JSON renders 64-bit integers as strings, older producers send numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
