//! S3-compatible object storage.
//!
//! This crate provides:
//! - The `ObjectStore` seam used by the chunk pipeline
//! - Object key layout for audio chunks and subtitles
//! - An S3 client (AWS, R2, MinIO) implementing the seam

pub mod client;
pub mod error;
pub mod keys;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use keys::{audio_key, subtitle_key};
pub use store::ObjectStore;
