//! Subscription tier policy.
//!
//! Maps a (tool, tier) pair to the data subset and visual treatment an export
//! is allowed to carry. Pure and total over the typed enums; the string entry
//! point rejects unknown tools and degrades unknown tiers to `free`.

use crate::error::Result;
use crate::request::{SubscriptionTier, ToolType};

/// Limits applied to one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_list_items: usize,
    pub include_watermark: bool,
    pub include_custom_branding: bool,
    pub include_advanced_fields: bool,
}

impl TierLimits {
    pub const UNLIMITED: usize = usize::MAX;

    pub fn for_tool(tool: ToolType, tier: SubscriptionTier) -> Self {
        Self {
            max_list_items: max_list_items(tool, tier),
            include_watermark: tier == SubscriptionTier::Trial,
            include_custom_branding: tier == SubscriptionTier::Premium,
            include_advanced_fields: tier != SubscriptionTier::Free,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_list_items == Self::UNLIMITED
    }
}

fn max_list_items(tool: ToolType, tier: SubscriptionTier) -> usize {
    match (tier, tool) {
        (SubscriptionTier::Premium, _) => TierLimits::UNLIMITED,
        (SubscriptionTier::Free, ToolType::KeywordResearch | ToolType::SeoAudit) => 5,
        (SubscriptionTier::Free, _) => 3,
        (SubscriptionTier::Trial, ToolType::KeywordResearch) => 25,
        (SubscriptionTier::Trial, ToolType::SeoAudit) => 20,
        (SubscriptionTier::Trial, _) => 10,
    }
}

/// String-level entry point used by callers that have not resolved the request yet.
pub fn compute_limits(tool_type: &str, subscription_tier: &str) -> Result<TierLimits> {
    let tool: ToolType = tool_type.parse()?;
    let tier = SubscriptionTier::parse_lenient(subscription_tier);
    Ok(TierLimits::for_tool(tool, tier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;

    #[test]
    fn test_limits_are_monotonic_across_tiers() {
        for tool in ToolType::ALL {
            let free = TierLimits::for_tool(tool, SubscriptionTier::Free);
            let trial = TierLimits::for_tool(tool, SubscriptionTier::Trial);
            let premium = TierLimits::for_tool(tool, SubscriptionTier::Premium);

            assert!(free.max_list_items <= trial.max_list_items, "{tool}");
            assert!(trial.max_list_items <= premium.max_list_items, "{tool}");
            assert!(!free.include_custom_branding);
            assert!(!trial.include_custom_branding);
            assert!(trial.include_watermark);
            assert!(!premium.include_watermark);
            assert!(premium.is_unlimited());
        }
    }

    #[test]
    fn test_limits_are_deterministic() {
        for tool in ToolType::ALL {
            for tier in SubscriptionTier::ALL {
                assert_eq!(TierLimits::for_tool(tool, tier), TierLimits::for_tool(tool, tier));
            }
        }
    }

    #[test]
    fn test_keyword_research_free_limit() {
        let limits = compute_limits("keyword-research", "free").unwrap();
        assert_eq!(limits.max_list_items, 5);
        assert!(!limits.include_advanced_fields);
    }

    #[test]
    fn test_compute_limits_rejects_unknown_tool() {
        assert_eq!(
            compute_limits("nonexistent-tool", "premium"),
            Err(ExportError::UnsupportedToolType("nonexistent-tool".to_string()))
        );
    }

    #[test]
    fn test_unknown_tier_gets_free_limits() {
        assert_eq!(
            compute_limits("seo-audit", "platinum").unwrap(),
            TierLimits::for_tool(ToolType::SeoAudit, SubscriptionTier::Free)
        );
    }
}
