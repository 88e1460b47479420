//! Subtitle generation worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subgen_queue::{JobQueue, Publisher};
use subgen_storage::{ObjectStore, S3Client};
use subgen_transcribe::{AssemblyAiClient, Transcriber};
use subgen_worker::{ChunkProcessor, ClipOrchestrator, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("subgen=info".parse().expect("valid directive"))
        .add_directive("aws_config=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting subgen-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        match subgen_worker::metrics::init_metrics(port) {
            Ok(()) => info!("Prometheus metrics enabled on port {}", port),
            Err(e) => error!("{}", e),
        }
    }

    let store: Arc<dyn ObjectStore> = match S3Client::from_env() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let transcriber: Arc<dyn Transcriber> = match AssemblyAiClient::from_env() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!("Failed to create transcription client: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let processor = ChunkProcessor::new(store, transcriber, config.work_dir.clone());
    let publisher: Arc<dyn Publisher> = queue.clone();
    let orchestrator = ClipOrchestrator::new(processor, publisher, config.max_chunk_parallel);
    let executor = Arc::new(JobExecutor::new(config, queue, orchestrator));

    // Setup signal handler
    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
