//! Tiered Export Library
//!
//! Turns an SEO tool's result payload into a PDF, CSV or JSON artifact whose
//! content and look depend on the caller's subscription tier. Also ships the
//! queue, sink and telemetry pieces used by the export worker binary.
//!
//! ## Module Overview
//!
//! - `request`: request/artifact model and typed resolution of its string fields
//! - `tier`: subscription tier policy
//! - `sections`: per-tool section renderers producing layout blocks
//! - `layout`: paginating layout cursor
//! - `pdf`, `csv_export`, `json_export`: format adapters
//! - `service`: the `generate_export` entry point
//! - `job`, `queue`, `sink`, `worker`: background worker plumbing
//! - `config`, `telemetry`: environment configuration, logging and OpenTelemetry
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tiered_export::{ExportRequest, ExportService};
//!
//! let request = ExportRequest::new(
//!     "keyword-research",
//!     "Investigación de palabras clave",
//!     json!({ "keywords": [{ "keyword": "zapatillas running", "volume": 12000 }] }),
//!     "free",
//!     "csv",
//! );
//!
//! let artifact = ExportService::new().generate_export(&request)?;
//! assert_eq!(artifact.mime_type, "text/csv; charset=utf-8");
//! # Ok::<(), tiered_export::ExportError>(())
//! ```

pub mod blocks;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod job;
pub mod json_export;
pub mod layout;
pub mod payload;
pub mod pdf;
pub mod queue;
pub mod request;
pub mod sections;
pub mod service;
pub mod sink;
pub mod telemetry;
pub mod tier;
pub mod worker;

pub use error::{ExportError, Result};
pub use request::{ExportArtifact, ExportFormat, ExportRequest, SubscriptionTier, ToolType};
pub use service::ExportService;
pub use tier::{compute_limits, TierLimits};
