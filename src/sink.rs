//! Where finished artifacts go.

use crate::request::ExportArtifact;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Destination for export artifacts.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactSink: Send + Sync {
    /// Stores `artifact` at `output_path`.
    fn write(&self, output_path: &str, artifact: &ExportArtifact) -> Result<()>;
}

/// Writes artifacts to the local filesystem.
///
/// Bytes go to a temporary file in the destination directory first and are
/// then persisted over `output_path`, so readers never see a partial file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl ArtifactSink for FileSink {
    fn write(&self, output_path: &str, artifact: &ExportArtifact) -> Result<()> {
        let path = Path::new(output_path);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(&artifact.bytes)
            .context("Failed to write artifact bytes")?;
        tmp.flush().context("Failed to flush artifact")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to persist artifact to {}", path.display()))?;

        debug!(
            output_path = %output_path,
            size_bytes = artifact.len(),
            "Artifact written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExportFormat;
    use chrono::Utc;

    fn artifact(bytes: &[u8]) -> ExportArtifact {
        ExportArtifact::new(ExportFormat::Csv, "Informe", Utc::now(), bytes.to_vec())
    }

    #[test]
    fn test_file_sink_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/informe.csv");

        FileSink
            .write(path.to_str().unwrap(), &artifact(b"a,b\n"))
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n");
    }

    #[test]
    fn test_file_sink_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("informe.csv");
        std::fs::write(&path, b"old contents that are longer").unwrap();

        FileSink
            .write(path.to_str().unwrap(), &artifact(b"new"))
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_sink_reports_unwritable_target() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is an existing directory.
        let err = FileSink
            .write(dir.path().to_str().unwrap(), &artifact(b"x"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to persist artifact"));
    }
}
