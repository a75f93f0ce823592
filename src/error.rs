//! Error taxonomy for export generation.

use thiserror::Error;

/// Errors returned by [`crate::service::ExportService::generate_export`] and
/// the pieces it drives.
///
/// `UnsupportedToolType` and `UnsupportedFormat` are structural: they are
/// raised before any bytes are produced. `InvalidState` signals misuse of the
/// layout engine and indicates a bug, not bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("unsupported tool type: {0}")]
    UnsupportedToolType(String),

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid layout state: {0}")]
    InvalidState(String),

    #[error("failed to encode artifact: {0}")]
    Encoding(String),
}

impl ExportError {
    /// Whether the error comes from the request itself. Such jobs are never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ExportError::UnsupportedToolType(_) | ExportError::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
