//! Export entry point.

use crate::csv_export;
use crate::error::Result;
use crate::json_export;
use crate::layout::PageGeometry;
use crate::pdf::PdfRenderer;
use crate::request::{ExportArtifact, ExportFormat, ExportRequest, SubscriptionTier, ToolType};
use crate::tier::TierLimits;
use tracing::{debug, info};

/// A request resolved against the tier policy, shared by every adapter.
#[derive(Debug, Clone, Copy)]
pub struct ExportContext<'a> {
    pub request: &'a ExportRequest,
    pub tool: ToolType,
    pub tier: SubscriptionTier,
    pub format: ExportFormat,
    pub limits: TierLimits,
}

impl<'a> ExportContext<'a> {
    /// Validates tool type, then format, before anything is rendered.
    pub fn resolve(request: &'a ExportRequest) -> Result<Self> {
        let tool = request.tool_type()?;
        let format = request.format()?;
        let tier = request.tier();
        Ok(Self {
            request,
            tool,
            tier,
            format,
            limits: TierLimits::for_tool(tool, tier),
        })
    }

    /// Request timestamp as printed in artifacts.
    pub fn generated_at(&self) -> String {
        self.request
            .requested_at
            .format("%d/%m/%Y %H:%M UTC")
            .to_string()
    }
}

/// Stateless export service. Cheap to clone and safe to share across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportService {
    pdf: PdfRenderer,
}

impl ExportService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(geometry: PageGeometry) -> Self {
        Self {
            pdf: PdfRenderer::new(geometry),
        }
    }

    /// Produces the artifact for `request`, or fails before producing any bytes.
    pub fn generate_export(&self, request: &ExportRequest) -> Result<ExportArtifact> {
        let ctx = ExportContext::resolve(request)?;
        debug!(
            tool = %ctx.tool,
            format = %ctx.format,
            tier = %ctx.tier,
            max_list_items = ctx.limits.max_list_items,
            "Resolved export request"
        );

        let bytes = match ctx.format {
            ExportFormat::Pdf => self.pdf.render(&ctx)?,
            ExportFormat::Csv => csv_export::render(&ctx)?,
            ExportFormat::Json => json_export::render(&ctx)?,
        };

        let artifact = ExportArtifact::new(ctx.format, &request.title, request.requested_at, bytes);
        info!(
            tool = %ctx.tool,
            format = %ctx.format,
            tier = %ctx.tier,
            size_bytes = artifact.len(),
            file_name = %artifact.file_name,
            "Export generated"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use serde_json::json;

    #[test]
    fn test_unknown_tool_fails_before_format_check() {
        let request = ExportRequest::new("nonexistent-tool", "x", json!({}), "premium", "docx");
        assert_eq!(
            ExportService::new().generate_export(&request),
            Err(ExportError::UnsupportedToolType("nonexistent-tool".to_string()))
        );
    }

    #[test]
    fn test_unknown_format() {
        let request = ExportRequest::new("seo-audit", "x", json!({}), "premium", "docx");
        assert_eq!(
            ExportService::new().generate_export(&request),
            Err(ExportError::UnsupportedFormat("docx".to_string()))
        );
    }

    #[test]
    fn test_mime_types_per_format() {
        let service = ExportService::new();
        for (format, mime) in [
            ("pdf", "application/pdf"),
            ("csv", "text/csv; charset=utf-8"),
            ("json", "application/json"),
        ] {
            let request = ExportRequest::new("core-vitals", "Vitals", json!({}), "free", format);
            let artifact = service.generate_export(&request).unwrap();
            assert_eq!(artifact.mime_type, mime);
            assert!(!artifact.is_empty());
        }
    }

    #[test]
    fn test_context_resolution() {
        let request = ExportRequest::new("keyword-research", "x", json!({}), "gold", "CSV");
        let ctx = ExportContext::resolve(&request).unwrap();
        assert_eq!(ctx.tier, SubscriptionTier::Free);
        assert_eq!(ctx.format, ExportFormat::Csv);
        assert_eq!(ctx.limits.max_list_items, 5);
    }
}
