//! Per-tool section renderers.
//!
//! Each tool module turns its result payload into an ordered list of
//! [`LayoutBlock`]s and exposes the typed rows the CSV adapter reuses.

pub mod content_optimizer;
pub mod core_vitals;
pub mod duplicate_detector;
pub mod keyword_research;
pub mod seo_audit;
pub mod title_generator;

use crate::blocks::LayoutBlock;
use crate::request::ToolType;
use crate::tier::TierLimits;
use serde_json::Value;

pub fn render(tool: ToolType, payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    match tool {
        ToolType::TitleGenerator => title_generator::render(payload, limits),
        ToolType::KeywordResearch => keyword_research::render(payload, limits),
        ToolType::SeoAudit => seo_audit::render(payload, limits),
        ToolType::CoreVitals => core_vitals::render(payload, limits),
        ToolType::ContentOptimizer => content_optimizer::render(payload, limits),
        ToolType::DuplicateDetector => duplicate_detector::render(payload, limits),
    }
}

/// Counts per priority, in high/medium/low order.
pub(crate) fn priority_rows(high: usize, medium: usize, low: usize) -> Vec<(String, String)> {
    vec![
        ("Prioridad alta".to_string(), high.to_string()),
        ("Prioridad media".to_string(), medium.to_string()),
        ("Prioridad baja".to_string(), low.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SubscriptionTier;
    use serde_json::json;

    #[test]
    fn test_every_tool_survives_an_empty_payload() {
        for tool in ToolType::ALL {
            for tier in SubscriptionTier::ALL {
                let limits = TierLimits::for_tool(tool, tier);
                let blocks = render(tool, &json!({}), &limits);
                assert!(!blocks.is_empty(), "{tool} produced no blocks");
                assert!(matches!(blocks[0], LayoutBlock::Heading { .. }));
            }
        }
    }

    #[test]
    fn test_every_tool_survives_a_non_object_payload() {
        for tool in ToolType::ALL {
            let limits = TierLimits::for_tool(tool, SubscriptionTier::Free);
            assert!(!render(tool, &json!([1, "x", null]), &limits).is_empty());
            assert!(!render(tool, &Value::Null, &limits).is_empty());
        }
    }
}
