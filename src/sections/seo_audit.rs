use super::priority_rows;
use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock, ListItem, Priority};
use crate::payload::{PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct AuditIssue {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Option<String>,
    pub recommendation: Option<String>,
}

pub fn issues(payload: &Value) -> Vec<AuditIssue> {
    payload
        .list(&["issues", "problems"])
        .iter()
        .map(|item| AuditIssue {
            title: item.text_or_na(&["title", "issue", "message"]),
            description: item.text(&["description", "details"]),
            priority: Priority::parse(item.text(&["priority", "severity"]).as_deref()),
            category: item.text(&["category", "type"]),
            recommendation: item.text(&["recommendation", "fix"]),
        })
        .collect()
}

/// High/medium/low counts over every issue, before any truncation.
pub fn priority_counts(issues: &[AuditIssue]) -> (usize, usize, usize) {
    issues.iter().fold((0, 0, 0), |(h, m, l), issue| match issue.priority {
        Priority::High => (h + 1, m, l),
        Priority::Medium => (h, m + 1, l),
        Priority::Low => (h, m, l + 1),
    })
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Auditoría SEO")];

    if let Some(url) = payload.text(&["url", "domain"]) {
        blocks.push(LayoutBlock::paragraph(format!("Sitio analizado: {url}")));
    }

    blocks.push(LayoutBlock::ScoreGauge {
        label: "Puntuación SEO".to_string(),
        score: payload.number(&["score", "overallScore"]),
    });

    let all = issues(payload);
    let (high, medium, low) = priority_counts(&all);
    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen de problemas".to_string()),
        rows: priority_rows(high, medium, low),
    });

    if all.is_empty() {
        blocks.push(LayoutBlock::paragraph("No se detectaron problemas."));
        return blocks;
    }

    let (shown, remaining) = truncate_list(all, limits.max_list_items);
    let items = shown
        .into_iter()
        .map(|issue| {
            let mut detail = issue.description.unwrap_or_default();
            if let Some(category) = issue.category {
                detail = if detail.is_empty() {
                    format!("Categoría: {category}")
                } else {
                    format!("{detail} (Categoría: {category})")
                };
            }
            if limits.include_advanced_fields {
                let recommendation = issue
                    .recommendation
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                detail = if detail.is_empty() {
                    format!("Recomendación: {recommendation}")
                } else {
                    format!("{detail}. Recomendación: {recommendation}")
                };
            }
            ListItem::new(issue.title)
                .with_detail(detail)
                .with_priority(issue.priority)
        })
        .collect();

    blocks.push(LayoutBlock::subheading("Problemas detectados"));
    blocks.push(LayoutBlock::ItemizedList { items });
    push_upgrade_notice(&mut blocks, remaining);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{SubscriptionTier, ToolType};
    use serde_json::json;

    fn audit_payload() -> Value {
        json!({
            "url": "https://ejemplo.com",
            "score": 72,
            "issues": [
                { "title": "Sin meta description", "priority": "high", "category": "On-page" },
                { "title": "Imágenes sin alt", "priority": "high" },
                { "title": "H1 duplicado", "priority": "medium" },
                { "title": "URL larga", "priority": "medium", "recommendation": "Acortar" },
                { "title": "Falta favicon", "priority": "low" }
            ]
        })
    }

    #[test]
    fn test_premium_audit_renders_everything() {
        let limits = TierLimits::for_tool(ToolType::SeoAudit, SubscriptionTier::Premium);
        let blocks = render(&audit_payload(), &limits);

        let summary = blocks.iter().find_map(|b| match b {
            LayoutBlock::KeyValueTable { rows, .. } => Some(rows.clone()),
            _ => None,
        });
        let counts: Vec<String> = summary.unwrap().into_iter().map(|(_, v)| v).collect();
        assert_eq!(counts, vec!["2", "2", "1"]);

        let items = blocks.iter().find_map(|b| match b {
            LayoutBlock::ItemizedList { items } => Some(items.len()),
            _ => None,
        });
        assert_eq!(items, Some(5));
        assert!(!blocks.iter().any(|b| matches!(b, LayoutBlock::UpgradeNotice { .. })));
    }

    #[test]
    fn test_counts_ignore_truncation() {
        let mut payload = audit_payload();
        let extra: Vec<Value> = (0..10).map(|_| json!({ "title": "x", "priority": "alta" })).collect();
        payload["issues"].as_array_mut().unwrap().extend(extra);

        let limits = TierLimits::for_tool(ToolType::SeoAudit, SubscriptionTier::Free);
        let blocks = render(&payload, &limits);
        let summary = blocks.iter().find_map(|b| match b {
            LayoutBlock::KeyValueTable { rows, .. } => Some(rows[0].1.clone()),
            _ => None,
        });
        assert_eq!(summary.as_deref(), Some("12"));
        assert_eq!(blocks.last(), Some(&LayoutBlock::UpgradeNotice { remaining: 10 }));
    }

    #[test]
    fn test_missing_priority_counts_as_low() {
        let found = issues(&json!({ "issues": [{ "title": "?" }, {}] }));
        assert_eq!(priority_counts(&found), (0, 0, 2));
        assert_eq!(found[1].title, "N/A");
    }

    #[test]
    fn test_recommendation_only_with_advanced_fields() {
        let free = TierLimits::for_tool(ToolType::SeoAudit, SubscriptionTier::Free);
        let blocks = render(&audit_payload(), &free);
        let details: Vec<String> = blocks
            .iter()
            .filter_map(|b| match b {
                LayoutBlock::ItemizedList { items } => Some(items.clone()),
                _ => None,
            })
            .flatten()
            .filter_map(|i| i.detail)
            .collect();
        assert!(details.iter().all(|d| !d.contains("Recomendación")));
        assert_eq!(details, vec!["Categoría: On-page".to_string()]);
    }
}
