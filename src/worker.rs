//! One export job, from request to stored artifact.

use crate::job::{ArtifactInfo, ExportJob};
use crate::service::ExportService;
use crate::sink::ArtifactSink;
use tracing::{error, info, warn};

/// What happened to a job and what the queue should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Artifact generated and stored.
    Completed(ArtifactInfo),
    /// Generation failed. Retrying the same request cannot succeed.
    Rejected(String),
    /// Storing the artifact failed; worth another attempt.
    Retry(String),
}

/// Generates the artifact for `job` and hands it to `sink`.
pub fn run_job(job: &ExportJob, service: &ExportService, sink: &dyn ArtifactSink) -> JobOutcome {
    let artifact = match service.generate_export(&job.request) {
        Ok(artifact) => artifact,
        Err(e) => {
            if e.is_structural() {
                warn!(job_id = %job.job_id, error = %e, "Rejected export request");
            } else {
                error!(job_id = %job.job_id, error = %e, "Export generation failed");
            }
            return JobOutcome::Rejected(e.to_string());
        }
    };

    match sink.write(&job.output_path, &artifact) {
        Ok(()) => {
            info!(
                job_id = %job.job_id,
                output_path = %job.output_path,
                size_bytes = artifact.len(),
                "Artifact stored"
            );
            JobOutcome::Completed(ArtifactInfo::from(&artifact))
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            warn!(job_id = %job.job_id, error = %reason, "Failed to store artifact");
            JobOutcome::Retry(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExportRequest;
    use crate::sink::MockArtifactSink;
    use anyhow::anyhow;
    use mockall::predicate::eq;
    use serde_json::json;

    fn job(tool: &str, format: &str) -> ExportJob {
        let request = ExportRequest::new(
            tool,
            "Auditoría SEO",
            json!({ "score": 72, "issues": [{ "title": "Falta H1", "priority": "high" }] }),
            "trial",
            format,
        );
        ExportJob::new(request, "/exports/audit".to_string())
    }

    #[test]
    fn test_completed_job_reports_artifact() {
        let mut sink = MockArtifactSink::new();
        sink.expect_write()
            .with(eq("/exports/audit"), mockall::predicate::always())
            .times(1)
            .returning(|_, artifact| {
                assert_eq!(artifact.mime_type, "application/pdf");
                assert!(artifact.bytes.starts_with(b"%PDF"));
                Ok(())
            });

        match run_job(&job("seo-audit", "pdf"), &ExportService::new(), &sink) {
            JobOutcome::Completed(info) => {
                assert_eq!(info.mime_type, "application/pdf");
                assert!(info.size_bytes > 0);
                assert!(info.file_name.ends_with(".pdf"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_structural_error_never_reaches_sink() {
        let mut sink = MockArtifactSink::new();
        sink.expect_write().times(0);

        let outcome = run_job(&job("nonexistent-tool", "pdf"), &ExportService::new(), &sink);
        assert_eq!(
            outcome,
            JobOutcome::Rejected("unsupported tool type: nonexistent-tool".to_string())
        );

        let outcome = run_job(&job("seo-audit", "xlsx"), &ExportService::new(), &sink);
        assert_eq!(
            outcome,
            JobOutcome::Rejected("unsupported export format: xlsx".to_string())
        );
    }

    #[test]
    fn test_sink_failure_is_retryable() {
        let mut sink = MockArtifactSink::new();
        sink.expect_write()
            .times(1)
            .returning(|_, _| Err(anyhow!("disk full")));

        let outcome = run_job(&job("seo-audit", "csv"), &ExportService::new(), &sink);
        assert_eq!(outcome, JobOutcome::Retry("disk full".to_string()));
    }
}
