//! Subtitle generation worker.
//!
//! This crate provides:
//! - SRT cue building from word timings
//! - The per-chunk download, transcribe and upload pipeline
//! - Clip orchestration with a bounded chunk pool and a single status publish
//! - The queue-driven job executor with in-flight tracking and graceful shutdown

pub mod chunk;
pub mod config;
pub mod error;
pub mod executor;
mod in_flight;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod ordering;
pub mod staging;
pub mod subtitle;

pub use chunk::ChunkProcessor;
pub use config::WorkerConfig;
pub use error::{ChunkError, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{ClipOrchestrator, ClipOutcome};
pub use ordering::{chunk_sort_key, sort_chunk_results, ChunkKey};
pub use subtitle::{build_cues, build_srt, SubtitleCue, SubtitleError};
