//! Client for the AssemblyAI speech-to-text service.
//!
//! The worker only needs word-level timings for an audio file, so the
//! surface is a single `Transcriber` trait. `AssemblyAiClient` implements it
//! by uploading the file, creating a transcript with language detection and
//! polling until the service finishes.

pub mod client;
pub mod error;
pub mod transcriber;
pub mod types;

pub use client::{AssemblyAiClient, AssemblyAiConfig};
pub use error::{TranscribeError, TranscribeResult};
pub use transcriber::Transcriber;
