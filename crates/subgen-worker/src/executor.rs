//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use subgen_queue::{Delivery, JobStream, QueueResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::in_flight::InFlightJobs;
use crate::orchestrator::ClipOrchestrator;

/// Ack attempts made right after a job finishes.
const ACK_ATTEMPTS: u32 = 3;
const ACK_RETRY_DELAY: Duration = Duration::from_millis(100);
/// `tokio::time::interval` panics on a zero period.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Everything a spawned job needs.
#[derive(Clone)]
struct JobContext {
    stream: Arc<dyn JobStream>,
    orchestrator: Arc<ClipOrchestrator>,
    in_flight: InFlightJobs,
}

/// Job executor that processes clips from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    jobs: JobContext,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        stream: Arc<dyn JobStream>,
        orchestrator: ClipOrchestrator,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            jobs: JobContext {
                stream,
                orchestrator: Arc::new(orchestrator),
                in_flight: InFlightJobs::new(),
            },
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor. Returns once shutdown was signalled and in-flight jobs drained.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.jobs.stream.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = tokio::spawn(Self::claim_loop(
            self.jobs.clone(),
            Arc::clone(&self.job_semaphore),
            self.consumer_name.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        ));
        // Runs until in-flight jobs drained, so they are not reclaimed mid-shutdown
        let heartbeat_task = tokio::spawn(Self::heartbeat_loop(
            self.jobs.clone(),
            self.consumer_name.clone(),
            self.config.job_heartbeat_interval,
        ));

        // Main job consumption loop
        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "In-flight jobs still running after {:?}, they will be reclaimed by another worker",
                self.config.shutdown_timeout
            );
        }

        heartbeat_task.abort();
        Self::retry_unacked(&self.jobs).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and dispatch new jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .jobs
            .stream
            .consume(
                &self.consumer_name,
                self.config.consume_block.as_millis() as u64,
                available,
            )
            .await?;

        if deliveries.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", deliveries.len());

        for delivery in deliveries {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("job semaphore closed"))?;
            let jobs = self.jobs.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(jobs, delivery).await;
            });
        }

        Ok(())
    }

    /// Periodically reclaim jobs left pending by crashed workers or failed publishes.
    ///
    /// Entries this worker still holds are never reclaimed.
    async fn claim_loop(
        jobs: JobContext,
        semaphore: Arc<Semaphore>,
        consumer_name: String,
        config: WorkerConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(config.claim_interval.max(MIN_TICK));
        let min_idle_ms = config.claim_min_idle.as_millis() as u64;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let count = config.max_concurrent_jobs;
                    let held = jobs.in_flight.held();
                    match jobs.stream.claim_pending(&consumer_name, min_idle_ms, count, &held).await {
                        Ok(deliveries) if !deliveries.is_empty() => {
                            info!("Claimed {} pending jobs", deliveries.len());
                            for delivery in deliveries {
                                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                                    return;
                                };
                                let jobs = jobs.clone();

                                tokio::spawn(async move {
                                    let _permit = permit;
                                    Self::execute_job(jobs, delivery).await;
                                });
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Failed to claim pending jobs: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Keep held entries fresh and retry acks that failed earlier.
    async fn heartbeat_loop(jobs: JobContext, consumer_name: String, every: Duration) {
        let mut interval = tokio::time::interval(every.max(MIN_TICK));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            Self::retry_unacked(&jobs).await;

            let held: Vec<String> = jobs.in_flight.held().into_iter().collect();
            if held.is_empty() {
                continue;
            }
            match jobs.stream.touch(&consumer_name, &held).await {
                Ok(()) => debug!(entries = held.len(), "Refreshed in-flight jobs"),
                Err(e) => warn!("Failed to refresh in-flight jobs: {}", e),
            }
        }
    }

    async fn retry_unacked(jobs: &JobContext) {
        for message_id in jobs.in_flight.unacked() {
            match jobs.stream.ack(&message_id).await {
                Ok(()) => {
                    info!("Acked job {} on retry", message_id);
                    jobs.in_flight.acked(&message_id);
                }
                Err(e) => warn!("Ack of job {} still failing: {}", message_id, e),
            }
        }
    }

    /// Execute a single clip job. The entry is acked only once its status message is out.
    async fn execute_job(jobs: JobContext, delivery: Delivery) {
        let Delivery {
            message_id,
            mut clip,
            deliveries,
        } = delivery;

        let Some(_running) = jobs.in_flight.start(&message_id) else {
            debug!(clip_id = %clip.id, "Job {} already held by this worker", message_id);
            return;
        };
        info!(
            clip_id = %clip.id,
            deliveries,
            "Executing clip job {}", message_id
        );

        match jobs.orchestrator.process(&mut clip).await {
            Ok(outcome) => {
                debug!(clip_id = %clip.id, ?outcome, "Clip job finished");
                if let Err(e) = ack_with_retry(jobs.stream.as_ref(), &message_id).await {
                    // Published already; held until an ack goes through so it never re-runs
                    error!(clip_id = %clip.id, "Failed to ack job {}: {}", message_id, e);
                    jobs.in_flight.mark_unacked(&message_id);
                }
            }
            Err(e) => {
                // Left pending; claim_pending picks it up again after the idle threshold
                error!(
                    clip_id = %clip.id,
                    error = %e,
                    "Clip job {} not acknowledged", message_id
                );
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

async fn ack_with_retry(stream: &dyn JobStream, message_id: &str) -> QueueResult<()> {
    let mut attempt = 1;
    loop {
        match stream.ack(message_id).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= ACK_ATTEMPTS => return Err(e),
            Err(e) => {
                warn!(attempt, "Ack of job {} failed, retrying: {}", message_id, e);
                tokio::time::sleep(ACK_RETRY_DELAY * attempt).await;
                attempt += 1;
            }
        }
    }
}
