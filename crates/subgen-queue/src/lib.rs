//! Redis Streams job queue.
//!
//! This crate provides:
//! - Clip job consumption through a consumer group
//! - Reclaiming of jobs left pending by crashed workers, with a heartbeat
//!   that keeps in-flight jobs from being reclaimed
//! - Dead-lettering of undecodable or exhausted jobs
//! - Publishing of status messages to the write stream

pub mod codec;
pub mod error;
pub mod publisher;
pub mod queue;
pub mod stream;

pub use codec::{decode_clip, encode_message};
pub use error::{QueueError, QueueResult};
pub use publisher::Publisher;
pub use queue::{Delivery, JobQueue, QueueConfig};
pub use stream::JobStream;
