use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock, ListItem};
use crate::payload::{average, format_optional, PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateFragment {
    pub text: String,
    /// Percentage in 0..=100. Ratios in 0..=1 are scaled up.
    pub similarity: Option<f64>,
    pub source: String,
}

pub fn fragments(payload: &Value) -> Vec<DuplicateFragment> {
    payload
        .list(&["duplicates", "matches", "fragments"])
        .iter()
        .map(|item| DuplicateFragment {
            text: item.text_or_na(&["text", "fragment", "content"]),
            similarity: item
                .number(&["similarity", "score"])
                .map(|s| if s <= 1.0 { s * 100.0 } else { s })
                .map(|s| s.clamp(0.0, 100.0)),
            source: item.text_or_na(&["source", "url"]),
        })
        .collect()
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Detección de contenido duplicado")];

    if let Some(url) = payload.text(&["url", "source"]) {
        blocks.push(LayoutBlock::paragraph(format!("Contenido analizado: {url}")));
    }

    let all = fragments(payload);
    let highest = all
        .iter()
        .filter_map(|f| f.similarity)
        .fold(None, |max: Option<f64>, s| Some(max.map_or(s, |m| m.max(s))));
    let originality = if all.is_empty() {
        Some(100.0)
    } else {
        highest.map(|h| 100.0 - h)
    };

    blocks.push(LayoutBlock::ScoreGauge {
        label: "Originalidad".to_string(),
        score: originality,
    });
    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen".to_string()),
        rows: vec![
            ("Fragmentos duplicados".to_string(), all.len().to_string()),
            (
                "Similitud media".to_string(),
                percent(average(all.iter().map(|f| f.similarity))),
            ),
            ("Similitud máxima".to_string(), percent(highest)),
        ],
    });

    if all.is_empty() {
        blocks.push(LayoutBlock::paragraph("No se encontró contenido duplicado."));
        return blocks;
    }

    let (shown, remaining) = truncate_list(all, limits.max_list_items);
    let items = shown
        .into_iter()
        .map(|f| {
            let mut detail = format!("Similitud: {}", percent(f.similarity));
            if limits.include_advanced_fields {
                detail.push_str(&format!(" · Fuente: {}", f.source));
            }
            ListItem::new(f.text).with_detail(detail)
        })
        .collect();

    blocks.push(LayoutBlock::subheading("Fragmentos"));
    blocks.push(LayoutBlock::ItemizedList { items });
    push_upgrade_notice(&mut blocks, remaining);
    blocks
}

pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(_) => format!("{}%", format_optional(value, 1)),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{SubscriptionTier, ToolType};
    use serde_json::json;

    #[test]
    fn test_ratio_similarity_is_scaled() {
        let found = fragments(&json!({ "duplicates": [{ "text": "a", "similarity": 0.85 }, { "text": "b", "similarity": 140 }] }));
        assert_eq!(found[0].similarity, Some(85.0));
        assert_eq!(found[1].similarity, Some(100.0));
        assert_eq!(found[0].source, "N/A");
    }

    #[test]
    fn test_originality_from_highest_similarity() {
        let payload = json!({ "duplicates": [{ "text": "a", "similarity": 40 }, { "text": "b", "similarity": 70 }] });
        let blocks = render(&payload, &TierLimits::for_tool(ToolType::DuplicateDetector, SubscriptionTier::Premium));
        let score = blocks.iter().find_map(|b| match b {
            LayoutBlock::ScoreGauge { score, .. } => Some(*score),
            _ => None,
        });
        assert_eq!(score, Some(Some(30.0)));
    }

    #[test]
    fn test_no_duplicates_is_fully_original() {
        let blocks = render(&json!({ "duplicates": [] }), &TierLimits::for_tool(ToolType::DuplicateDetector, SubscriptionTier::Free));
        assert!(blocks.contains(&LayoutBlock::ScoreGauge {
            label: "Originalidad".to_string(),
            score: Some(100.0),
        }));
    }
}
