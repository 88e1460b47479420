//! Outbound status message.

use serde::{Deserialize, Serialize};

use crate::clip::Clip;

/// Type tag downstream consumers dispatch on.
pub const SUBTITLE_GENERATOR_MESSAGE_TYPE: &str = "App\\Protobuf\\SubtitleGeneratorMessage";

/// Message published once per clip after subtitle generation finished or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleGeneratorMessage {
    pub clip: Clip,
}

impl SubtitleGeneratorMessage {
    pub fn new(clip: Clip) -> Self {
        Self { clip }
    }
}

impl From<Clip> for SubtitleGeneratorMessage {
    fn from(clip: Clip) -> Self {
        Self::new(clip)
    }
}
