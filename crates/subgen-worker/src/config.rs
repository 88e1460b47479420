//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of chunks transcribed in parallel within a clip.
pub const DEFAULT_CHUNK_PARALLEL: usize = 5;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent clip jobs
    pub max_concurrent_jobs: usize,
    /// Maximum chunks processed in parallel within a single clip
    pub max_chunk_parallel: usize,
    /// Work directory for staged audio and subtitle files
    pub work_dir: PathBuf,
    /// How long a consume call blocks waiting for new entries
    pub consume_block: Duration,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// How often running jobs refresh their idle time so they are not reclaimed
    pub job_heartbeat_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Port for the Prometheus exporter, disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            max_chunk_parallel: DEFAULT_CHUNK_PARALLEL,
            work_dir: PathBuf::from("/tmp/subgen"),
            consume_block: Duration::from_millis(1000),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300), // 5 minutes
            job_heartbeat_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(60),
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse::<usize>("WORKER_MAX_JOBS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            max_chunk_parallel: env_parse::<usize>("WORKER_MAX_CHUNK_PARALLEL")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_chunk_parallel),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            consume_block: env_parse::<u64>("WORKER_CONSUME_BLOCK_MS")
                .filter(|n| *n > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.consume_block),
            claim_interval: env_parse::<u64>("WORKER_CLAIM_INTERVAL_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_interval),
            claim_min_idle: env_parse("WORKER_CLAIM_MIN_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_min_idle),
            job_heartbeat_interval: env_parse::<u64>("WORKER_JOB_HEARTBEAT_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_heartbeat_interval),
            shutdown_timeout: env_parse("WORKER_SHUTDOWN_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            metrics_port: env_parse("METRICS_PORT"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
