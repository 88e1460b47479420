//! JSON mapping between stream payloads and clips.
//!
//! Inbound payloads carry the clip object itself. Some producers wrap it as
//! `{"clip": {...}}`, which is accepted too. Outbound payloads always use the
//! wrapped `SubtitleGeneratorMessage` form.

use serde_json::Value;
use subgen_models::{Clip, SubtitleGeneratorMessage};

use crate::error::{QueueError, QueueResult};

/// Decode an inbound payload into a clip.
pub fn decode_clip(payload: &str) -> QueueResult<Clip> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| QueueError::decode(e.to_string()))?;

    let clip_value = match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("clip") => {
            map.remove("clip").unwrap_or_default()
        }
        other => other,
    };

    serde_json::from_value(clip_value).map_err(|e| QueueError::decode(e.to_string()))
}

/// Encode the outbound status message for a clip.
pub fn encode_message(clip: &Clip) -> QueueResult<String> {
    let message = SubtitleGeneratorMessage::new(clip.clone());
    Ok(serde_json::to_string(&message)?)
}
