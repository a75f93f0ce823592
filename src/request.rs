//! Export request model and its typed resolution.

use crate::error::{ExportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// The SEO tools whose results can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    TitleGenerator,
    KeywordResearch,
    SeoAudit,
    CoreVitals,
    ContentOptimizer,
    DuplicateDetector,
}

impl ToolType {
    pub const ALL: [ToolType; 6] = [
        ToolType::TitleGenerator,
        ToolType::KeywordResearch,
        ToolType::SeoAudit,
        ToolType::CoreVitals,
        ToolType::ContentOptimizer,
        ToolType::DuplicateDetector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::TitleGenerator => "title-generator",
            ToolType::KeywordResearch => "keyword-research",
            ToolType::SeoAudit => "seo-audit",
            ToolType::CoreVitals => "core-vitals",
            ToolType::ContentOptimizer => "content-optimizer",
            ToolType::DuplicateDetector => "duplicate-detector",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        ToolType::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s.trim())
            .ok_or_else(|| ExportError::UnsupportedToolType(s.to_string()))
    }
}

/// Subscription level gating what an export may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Trial,
    Premium,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Free,
        SubscriptionTier::Trial,
        SubscriptionTier::Premium,
    ];

    /// Parses a tier name, falling back to `Free` for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => SubscriptionTier::Free,
            "trial" => SubscriptionTier::Trial,
            "premium" => SubscriptionTier::Premium,
            other => {
                warn!(tier = %other, "Unknown subscription tier, treating as free");
                SubscriptionTier::Free
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Trial => "trial",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Label printed on PDF badges and footers.
    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "GRATUITO",
            SubscriptionTier::Trial => "TRIAL",
            SubscriptionTier::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingOptions {
    pub logo_ref: Option<String>,
    pub company_name: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

/// One export click. Consumed once by the service and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub tool_type: String,
    pub title: String,
    #[serde(default)]
    pub result_payload: Value,
    pub subscription_tier: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding_options: Option<BrandingOptions>,
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
}

impl ExportRequest {
    pub fn new(
        tool_type: impl Into<String>,
        title: impl Into<String>,
        result_payload: Value,
        subscription_tier: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            tool_type: tool_type.into(),
            title: title.into(),
            result_payload,
            subscription_tier: subscription_tier.into(),
            format: format.into(),
            branding_options: None,
            requested_at: Utc::now(),
        }
    }

    pub fn with_branding(mut self, branding: BrandingOptions) -> Self {
        self.branding_options = Some(branding);
        self
    }

    pub fn with_requested_at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }

    pub fn tool_type(&self) -> Result<ToolType> {
        self.tool_type.parse()
    }

    pub fn format(&self) -> Result<ExportFormat> {
        self.format.parse()
    }

    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::parse_lenient(&self.subscription_tier)
    }
}

/// Finished export. Ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub mime_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(format: ExportFormat, title: &str, requested_at: DateTime<Utc>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: format.mime_type().to_string(),
            file_name: format!(
                "{}-{}.{}",
                slugify(title),
                requested_at.format("%Y%m%d"),
                format.as_str()
            ),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "export".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_tool_type_parsing() {
        assert_eq!("seo-audit".parse::<ToolType>().unwrap(), ToolType::SeoAudit);
        for tool in ToolType::ALL {
            assert_eq!(tool.as_str().parse::<ToolType>().unwrap(), tool);
        }
        assert_eq!(
            "nonexistent-tool".parse::<ToolType>(),
            Err(ExportError::UnsupportedToolType("nonexistent-tool".to_string()))
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unknown_tier_falls_back_to_free() {
        assert_eq!(SubscriptionTier::parse_lenient("enterprise"), SubscriptionTier::Free);
        assert_eq!(SubscriptionTier::parse_lenient(" Premium "), SubscriptionTier::Premium);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ExportRequest = serde_json::from_value(json!({
            "toolType": "keyword-research",
            "title": "Keywords",
            "resultPayload": { "keywords": [] },
            "subscriptionTier": "trial",
            "format": "csv",
            "brandingOptions": { "companyName": "Acme" },
            "requestedAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(request.tool_type().unwrap(), ToolType::KeywordResearch);
        assert_eq!(request.tier(), SubscriptionTier::Trial);
        assert_eq!(
            request.branding_options.unwrap().company_name.as_deref(),
            Some("Acme")
        );
        assert_eq!(
            request.requested_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_artifact_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let artifact = ExportArtifact::new(ExportFormat::Csv, "Auditoría SEO: ejemplo.com", at, vec![1]);
        assert_eq!(artifact.file_name, "auditor-a-seo-ejemplo-com-20240301.csv");
        assert_eq!(artifact.mime_type, "text/csv; charset=utf-8");

        let untitled = ExportArtifact::new(ExportFormat::Pdf, "!!!", at, vec![]);
        assert_eq!(untitled.file_name, "export-20240301.pdf");
        assert!(untitled.is_empty());
    }
}
