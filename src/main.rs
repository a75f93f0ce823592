//! Tiered Export Worker Service
//!
//! Consumes export jobs from a Redis queue, renders each one as a tier-gated
//! PDF, CSV or JSON artifact and writes it to the job's output path.
//!
//! ## Architecture
//!
//! - **Queue**: Redis list (`tiered-export:queue`)
//! - **Status**: Redis keys (`tiered-export:status:{job_id}`)
//! - **Formatter**: `tiered_export::service::ExportService`
//! - **Telemetry**: OpenTelemetry OTLP export
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_URL`: Redis connection string (default: redis://127.0.0.1/)
//! - `WORKER_CONCURRENCY`: Number of concurrent jobs (default: 4)
//! - `EXPORT_PAGE_SIZE`: `a4` or `letter` (default: a4)
//! - `LOG_FORMAT`: `plain` or `json` (default: plain)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use std::sync::Arc;
use tiered_export::config::WorkerConfig;
use tiered_export::job::ExportJob;
use tiered_export::queue::JobQueue;
use tiered_export::service::ExportService;
use tiered_export::sink::{ArtifactSink, FileSink};
use tiered_export::telemetry;
use tiered_export::worker::{run_job, JobOutcome};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Emit a heartbeat every this many dequeue attempts.
const HEARTBEAT_EVERY: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let config = WorkerConfig::from_env();
    telemetry::init_logging(config.log_format);

    if let Err(e) = telemetry::init_telemetry(&config) {
        warn!(error = %e, "Failed to initialize telemetry");
    }

    info!(
        redis_url = %config.redis_url,
        concurrency = config.concurrency,
        page_width = config.page_geometry.width,
        page_height = config.page_geometry.height,
        "Starting export worker service"
    );

    let queue = JobQueue::connect(&config.redis_url).await?;
    info!("Connected to Redis");

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let service = ExportService::with_geometry(config.page_geometry);
    let sink: Arc<dyn ArtifactSink> = Arc::new(FileSink);
    let shutdown = CancellationToken::new();

    let mut workers = JoinSet::new();
    for worker_id in 0..config.concurrency {
        workers.spawn(worker_loop(
            worker_id,
            queue.clone(),
            semaphore.clone(),
            service,
            sink.clone(),
            shutdown.clone(),
        ));
    }

    info!("Worker service ready, press Ctrl+C to shutdown");
    signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    info!("Received shutdown signal, waiting for workers to finish...");
    shutdown.cancel();

    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Worker task panicked");
        }
    }

    info!("Worker service shutdown complete");
    Ok(())
}

/// Pulls jobs until `shutdown` fires. In-flight jobs are awaited before returning.
async fn worker_loop(
    worker_id: usize,
    mut queue: JobQueue,
    semaphore: Arc<Semaphore>,
    service: ExportService,
    sink: Arc<dyn ArtifactSink>,
    shutdown: CancellationToken,
) {
    info!(worker_id, "Worker started");
    let mut in_flight = JoinSet::new();
    let mut polls: u64 = 0;

    // BLPOP gives up every five seconds, so cancellation is noticed between polls.
    while !shutdown.is_cancelled() {
        let dequeued = queue.dequeue().await;

        polls += 1;
        if polls % HEARTBEAT_EVERY == 0 {
            if let Ok(queue_len) = queue.queue_length().await {
                telemetry::record_worker_heartbeat(queue_len);
            }
        }

        let job = match dequeued {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!(worker_id, error = %format!("{:#}", e), "Failed to dequeue job");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(5)) => continue,
                }
            }
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(worker_id, job_id = %job.job_id, "Semaphore closed, re-queueing job");
                if let Err(e) = queue.enqueue(&job).await {
                    error!(job_id = %job.job_id, error = %e, "Failed to re-queue job");
                }
                break;
            }
        };

        let queue = queue.clone();
        let sink = sink.clone();
        in_flight.spawn(async move {
            process_job(job, queue, service, sink).await;
            drop(permit);
        });

        // Reap finished jobs so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!(worker_id, "Worker stopped");
}

/// Runs one job and records the result in its status key.
///
/// Rejected requests fail immediately. Storage failures go back on the
/// queue until the retry budget is spent.
async fn process_job(
    mut job: ExportJob,
    mut queue: JobQueue,
    service: ExportService,
    sink: Arc<dyn ArtifactSink>,
) {
    info!(
        job_id = %job.job_id,
        tool_type = %job.request.tool_type,
        format = %job.request.format,
        "Processing job"
    );

    job.start_processing();
    if let Err(e) = queue.update_status(&job).await {
        error!(job_id = %job.job_id, error = %e, "Failed to update job status");
    }

    let snapshot = job.clone();
    let outcome = match tokio::task::spawn_blocking(move || {
        run_job(&snapshot, &service, sink.as_ref())
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => JobOutcome::Rejected(format!("export task panicked: {e}")),
    };

    match outcome {
        JobOutcome::Completed(artifact) => {
            job.mark_complete(artifact);
            if let Err(e) = queue.update_status(&job).await {
                error!(job_id = %job.job_id, error = %e, "Failed to update job status");
            }
            info!(
                job_id = %job.job_id,
                duration_ms = ?job.processing_duration_ms(),
                "Job completed"
            );
        }
        JobOutcome::Rejected(reason) => {
            job.mark_failed(reason);
            if let Err(e) = queue.update_status(&job).await {
                error!(job_id = %job.job_id, error = %e, "Failed to update job status");
            }
        }
        JobOutcome::Retry(reason) => match queue.retry_job(job.clone(), reason.clone()).await {
            Ok(true) => {
                // Mirror the state the queue stored.
                job.retry(reason);
                info!(job_id = %job.job_id, retry_count = job.retry_count, "Job re-queued for retry");
            }
            Ok(false) => {
                job.retry(reason);
                warn!(job_id = %job.job_id, "Job failed permanently, max retries exceeded");
            }
            Err(e) => {
                let requeue_error = format!("{:#}", e);
                error!(job_id = %job.job_id, error = %requeue_error, "Failed to retry job");
                job.fail_requeue(&reason, &requeue_error);
                if let Err(e) = queue.update_status(&job).await {
                    error!(job_id = %job.job_id, error = %e, "Failed to update job status");
                }
            }
        },
    }

    telemetry::record_job_telemetry(&job);
}
