//! Shared data models for the subtitle generator.
//!
//! This crate provides Serde-serializable types for:
//! - Clip jobs and their status
//! - Transcribed words
//! - The outbound status message envelope
//! - SRT timecode formatting

pub mod clip;
pub mod message;
pub mod timecode;
pub mod transcript;

// Re-export common types
pub use clip::{Clip, ClipStatus, Video};
pub use message::{SubtitleGeneratorMessage, SUBTITLE_GENERATOR_MESSAGE_TYPE};
pub use timecode::{format_srt_timestamp, parse_srt_timestamp, TimecodeError};
pub use transcript::TimedWord;
