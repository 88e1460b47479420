//! Worker metrics.
//!
//! Counters and histograms for clip jobs and audio chunks, exported through
//! Prometheus when a port is configured.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Clip jobs that reached a terminal status, by status.
    pub const JOBS_TOTAL: &str = "subgen_jobs_total";

    /// Clip jobs whose status message could not be published.
    pub const PUBLISH_FAILURES_TOTAL: &str = "subgen_publish_failures_total";

    /// Clip job duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "subgen_job_duration_seconds";

    /// Chunks processed, by outcome.
    pub const CHUNKS_TOTAL: &str = "subgen_chunks_total";

    /// Chunk duration in seconds.
    pub const CHUNK_DURATION_SECONDS: &str = "subgen_chunk_duration_seconds";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a clip job that was published with `status`.
pub fn record_job(status: &str, duration_secs: f64) {
    counter!(names::JOBS_TOTAL, "status" => status.to_string()).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed status publish.
pub fn record_publish_failure() {
    counter!(names::PUBLISH_FAILURES_TOTAL).increment(1);
}

/// Record a processed chunk. `outcome` is `ok` or a chunk error kind.
pub fn record_chunk(outcome: &'static str, duration_secs: f64) {
    counter!(names::CHUNKS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::CHUNK_DURATION_SECONDS).record(duration_secs);
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn init_metrics(port: u16) -> WorkerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("Failed to install metrics exporter: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================
