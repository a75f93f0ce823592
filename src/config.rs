//! Worker configuration from environment variables.

use crate::layout::PageGeometry;
use tracing::warn;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
pub const DEFAULT_SERVICE_NAME: &str = "tiered-export-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Some(LogFormat::Plain),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub concurrency: usize,
    pub page_geometry: PageGeometry,
    pub log_format: LogFormat,
    pub otlp_endpoint: String,
    pub service_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            page_geometry: PageGeometry::default(),
            log_format: LogFormat::default(),
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let concurrency = match lookup("WORKER_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => n.max(1),
                Err(_) => {
                    warn!(value = %raw, "Invalid WORKER_CONCURRENCY, using default");
                    defaults.concurrency
                }
            },
            None => defaults.concurrency,
        };

        let page_geometry = match lookup("EXPORT_PAGE_SIZE") {
            Some(raw) => PageGeometry::from_name(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown EXPORT_PAGE_SIZE, using A4");
                defaults.page_geometry
            }),
            None => defaults.page_geometry,
        };

        let log_format = lookup("LOG_FORMAT")
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or(defaults.log_format);

        Self {
            redis_url: non_empty(lookup("REDIS_URL")).unwrap_or(defaults.redis_url),
            concurrency,
            page_geometry,
            log_format,
            otlp_endpoint: non_empty(lookup("OTEL_EXPORTER_OTLP_ENDPOINT"))
                .unwrap_or(defaults.otlp_endpoint),
            service_name: non_empty(lookup("OTEL_SERVICE_NAME")).unwrap_or(defaults.service_name),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), WorkerConfig::default());
        assert_eq!(config(&[]).page_geometry, PageGeometry::A4);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("REDIS_URL", "redis://cache:6379/2"),
            ("WORKER_CONCURRENCY", "8"),
            ("EXPORT_PAGE_SIZE", "Letter"),
            ("LOG_FORMAT", "JSON"),
            ("OTEL_SERVICE_NAME", "exports"),
        ]);
        assert_eq!(cfg.redis_url, "redis://cache:6379/2");
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.page_geometry, PageGeometry::LETTER);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.service_name, "exports");
        assert_eq!(cfg.otlp_endpoint, DEFAULT_OTLP_ENDPOINT);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = config(&[
            ("REDIS_URL", " "),
            ("WORKER_CONCURRENCY", "many"),
            ("EXPORT_PAGE_SIZE", "a3"),
            ("LOG_FORMAT", "xml"),
        ]);
        assert_eq!(cfg, WorkerConfig::default());
    }

    #[test]
    fn test_concurrency_has_floor_of_one() {
        assert_eq!(config(&[("WORKER_CONCURRENCY", "0")]).concurrency, 1);
    }
}
