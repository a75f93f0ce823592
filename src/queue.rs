//! Redis-based job queue for export tasks.

use crate::job::ExportJob;
use anyhow::{Context, Result};
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, error, info};

/// Queue name for export jobs.
const QUEUE_KEY: &str = "tiered-export:queue";

/// Status key prefix for job status tracking.
const STATUS_KEY_PREFIX: &str = "tiered-export:status";

/// Job TTL in seconds (24 hours).
const JOB_TTL_SECONDS: u64 = 86400;

/// Seconds BLPOP waits before reporting an empty queue.
const DEQUEUE_TIMEOUT_SECONDS: f64 = 5.0;

fn status_key(job_id: &str) -> String {
    format!("{}:{}", STATUS_KEY_PREFIX, job_id)
}

/// Redis-based job queue manager.
///
/// Jobs are stored as JSON in a Redis list, with a separate status key per
/// job for client polling.
#[derive(Clone)]
pub struct JobQueue {
    conn: ConnectionManager,
}

impl JobQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connects to `redis_url` and wraps the connection in a manager.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self::new(conn))
    }

    /// Pushes `job` onto the queue and creates its status key (24 h TTL).
    pub async fn enqueue(&mut self, job: &ExportJob) -> Result<()> {
        let job_json = serde_json::to_string(job).context("Failed to serialize job")?;

        // RPUSH + BLPOP keeps FIFO order
        self.conn
            .rpush::<_, _, ()>(QUEUE_KEY, &job_json)
            .await
            .context("Failed to push job to queue")?;

        self.conn
            .set_ex::<_, _, ()>(status_key(&job.job_id), &job_json, JOB_TTL_SECONDS)
            .await
            .context("Failed to set job status")?;

        info!(
            job_id = %job.job_id,
            tool_type = %job.request.tool_type,
            format = %job.request.format,
            "Enqueued export job"
        );

        Ok(())
    }

    /// Waits up to five seconds for the next job. `Ok(None)` means the wait timed out.
    pub async fn dequeue(&mut self) -> Result<Option<ExportJob>> {
        let result: Option<(String, String)> = self
            .conn
            .blpop(QUEUE_KEY, DEQUEUE_TIMEOUT_SECONDS)
            .await
            .context("Failed to pop job from queue")?;

        match result {
            Some((_key, job_json)) => {
                let job: ExportJob =
                    serde_json::from_str(&job_json).context("Failed to deserialize job")?;
                debug!(job_id = %job.job_id, "Dequeued job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Writes the job's current state to its status key.
    pub async fn update_status(&mut self, job: &ExportJob) -> Result<()> {
        let job_json = serde_json::to_string(job).context("Failed to serialize job status")?;

        self.conn
            .set_ex::<_, _, ()>(status_key(&job.job_id), &job_json, JOB_TTL_SECONDS)
            .await
            .context("Failed to update job status")?;

        debug!(job_id = %job.job_id, status = %job.status, "Updated job status");
        Ok(())
    }

    pub async fn get_status(&mut self, job_id: &str) -> Result<Option<ExportJob>> {
        let job_json: Option<String> = self
            .conn
            .get(status_key(job_id))
            .await
            .context("Failed to get job status")?;

        match job_json {
            Some(json) => {
                let job: ExportJob =
                    serde_json::from_str(&json).context("Failed to deserialize job status")?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Re-enqueues a job whose retryable step failed.
    ///
    /// Returns `Ok(false)` once the retry budget is spent; the job is then
    /// stored as failed.
    pub async fn retry_job(&mut self, mut job: ExportJob, reason: String) -> Result<bool> {
        if job.retry(reason) {
            self.enqueue(&job).await?;
            Ok(true)
        } else {
            self.update_status(&job).await?;
            error!(
                job_id = %job.job_id,
                error = ?job.error,
                "Job failed after max retries"
            );
            Ok(false)
        }
    }

    pub async fn queue_length(&mut self) -> Result<usize> {
        let len: usize = self
            .conn
            .llen(QUEUE_KEY)
            .await
            .context("Failed to get queue length")?;
        Ok(len)
    }
}
