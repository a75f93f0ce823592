//! Telemetry and structured logging for the export worker.

use crate::config::{LogFormat, WorkerConfig};
use crate::job::{ExportJob, JobStatus};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TRACER_NAME: &str = "tiered-export-worker";

/// Jobs slower than this are logged as a warning.
const SLOW_JOB_THRESHOLD_MS: i64 = 5000;

/// Records telemetry for a completed or failed job.
///
/// Emits one `export_job` span carrying the job's tool type, format, tier,
/// retry count and, when known, duration and artifact size.
pub fn record_job_telemetry(job: &ExportJob) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("export_job");

    span.set_attribute(KeyValue::new("job_id", job.job_id.clone()));
    span.set_attribute(KeyValue::new("tool_type", job.request.tool_type.clone()));
    span.set_attribute(KeyValue::new("format", job.request.format.clone()));
    span.set_attribute(KeyValue::new("tier", job.request.tier().as_str()));
    span.set_attribute(KeyValue::new("status", job.status.to_string()));
    span.set_attribute(KeyValue::new("retry_count", job.retry_count as i64));

    if let Some(artifact) = &job.artifact {
        span.set_attribute(KeyValue::new("size_bytes", artifact.size_bytes as i64));
        span.set_attribute(KeyValue::new("mime_type", artifact.mime_type.clone()));
    }

    if let Some(duration_ms) = job.processing_duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        info!(
            job_id = %job.job_id,
            tool_type = %job.request.tool_type,
            duration_ms = duration_ms,
            status = %job.status,
            "Export job finished"
        );

        if duration_ms > SLOW_JOB_THRESHOLD_MS {
            warn!(
                job_id = %job.job_id,
                duration_ms = duration_ms,
                "Export exceeded performance threshold (5000ms)"
            );
        }
    }

    if job.status == JobStatus::Failed {
        if let Some(ref error) = job.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
            warn!(
                job_id = %job.job_id,
                error = %error,
                retry_count = job.retry_count,
                "Export job failed"
            );
        }
    }

    span.end();
}

/// Records a worker heartbeat with the current queue length.
pub fn record_worker_heartbeat(queue_length: usize) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("worker_heartbeat");

    span.set_attribute(KeyValue::new("queue_length", queue_length as i64));
    span.end();

    info!(queue_length = queue_length, "Worker heartbeat");
}

/// Installs the global `tracing` subscriber: `RUST_LOG` filter (default
/// `info`) plus either a plain or a JSON formatting layer.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (plain, json) = match format {
        LogFormat::Plain => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();
}

/// Initializes OpenTelemetry with an OTLP exporter.
///
/// Called once at worker startup. Failure is not fatal to the worker; the
/// caller logs it and carries on with the no-op tracer.
pub fn init_telemetry(config: &WorkerConfig) -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&config.otlp_endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", config.service_name.clone()),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    if let Some(provider) = tracer.provider() {
        global::set_tracer_provider(provider);
    }

    info!(endpoint = %config.otlp_endpoint, "Telemetry initialized");
    Ok(())
}
