//! Job models and state management for the export queue.

use crate::request::{ExportArtifact, ExportRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Attempts allowed after the first failure of a retryable step.
pub const MAX_RETRIES: u8 = 3;

/// Export job as stored in the queue and in the status key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: String,
    pub request: ExportRequest,
    pub output_path: String,
    pub status: JobStatus,
    pub retry_count: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactInfo>,
}

/// Summary of a written artifact, for clients polling the status key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub mime_type: String,
    pub file_name: String,
    pub size_bytes: usize,
}

impl From<&ExportArtifact> for ArtifactInfo {
    fn from(artifact: &ExportArtifact) -> Self {
        Self {
            mime_type: artifact.mime_type.clone(),
            file_name: artifact.file_name.clone(),
            size_bytes: artifact.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl ExportJob {
    pub fn new(request: ExportRequest, output_path: String) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            request,
            output_path,
            status: JobStatus::Queued,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            error: None,
            artifact: None,
        }
    }

    pub fn start_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn mark_complete(&mut self, artifact: ArtifactInfo) {
        self.status = JobStatus::Complete;
        self.updated_at = Utc::now();
        self.error = None;
        self.artifact = Some(artifact);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
        self.error = Some(error);
    }

    /// Re-queues the job if attempts remain, otherwise fails it for good.
    pub fn retry(&mut self, error: String) -> bool {
        if self.retry_count < MAX_RETRIES {
            self.retry_count += 1;
            self.status = JobStatus::Queued;
            self.updated_at = Utc::now();
            self.error = Some(error);
            true
        } else {
            self.mark_failed(format!("Max retries exceeded: {error}"));
            false
        }
    }

    /// Fails a job whose retry could not be put back on the queue.
    pub fn fail_requeue(&mut self, reason: &str, requeue_error: &str) {
        self.mark_failed(format!("Failed to re-queue ({requeue_error}): {reason}"));
    }

    pub fn processing_duration_ms(&self) -> Option<i64> {
        if self.status == JobStatus::Complete || self.status == JobStatus::Failed {
            Some(self.updated_at.signed_duration_since(self.created_at).num_milliseconds())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> ExportJob {
        let request = ExportRequest::new("seo-audit", "Auditoría", json!({ "issues": [] }), "free", "pdf");
        ExportJob::new(request, "/tmp/audit.pdf".to_string())
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.retry_count, 0);
        assert!(job.artifact.is_none());
        assert!(Uuid::parse_str(&job.job_id).is_ok());
        assert_eq!(job.processing_duration_ms(), None);
    }

    #[test]
    fn test_complete_records_artifact() {
        let mut job = job();
        job.start_processing();
        assert_eq!(job.status, JobStatus::Processing);

        job.mark_complete(ArtifactInfo {
            mime_type: "application/pdf".to_string(),
            file_name: "auditoria-20240301.pdf".to_string(),
            size_bytes: 1024,
        });
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.artifact.as_ref().map(|a| a.size_bytes), Some(1024));
        assert!(job.processing_duration_ms().is_some());
    }

    #[test]
    fn test_retry_budget() {
        let mut job = job();
        for attempt in 1..=MAX_RETRIES {
            assert!(job.retry("disk full".to_string()));
            assert_eq!(job.retry_count, attempt);
            assert_eq!(job.status, JobStatus::Queued);
        }
        assert!(!job.retry("disk full".to_string()));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("Max retries exceeded: disk full"));
    }

    #[test]
    fn test_failed_requeue_is_terminal() {
        let mut job = job();
        job.start_processing();
        job.fail_requeue("disk full", "connection refused");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some("Failed to re-queue (connection refused): disk full")
        );
        assert!(job.processing_duration_ms().is_some());
    }

    #[test]
    fn test_wire_form() {
        let mut job = job();
        job.start_processing();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "processing");
        assert_eq!(value["request"]["toolType"], "seo-audit");
        assert!(value.get("artifact").is_none());

        let back: ExportJob = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }
}
