use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock};
use crate::payload::{average, format_optional, value_as_text, PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordEntry {
    pub keyword: String,
    pub volume: Option<f64>,
    pub difficulty: Option<f64>,
    pub cpc: Option<f64>,
    pub competition: Option<String>,
    pub intent: Option<String>,
}

pub fn keywords(payload: &Value) -> Vec<KeywordEntry> {
    payload
        .list(&["keywords", "results"])
        .iter()
        .map(|item| KeywordEntry {
            keyword: match item {
                Value::String(_) => value_as_text(item),
                _ => item.text(&["keyword", "term"]),
            }
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            volume: item.number(&["volume", "searchVolume"]),
            difficulty: item.number(&["difficulty", "kd"]),
            cpc: item.number(&["cpc"]),
            competition: item.text(&["competition"]),
            intent: item.text(&["intent", "searchIntent"]),
        })
        .collect()
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Investigación de palabras clave")];

    if let Some(seed) = payload.text(&["seedKeyword", "seed", "query"]) {
        blocks.push(LayoutBlock::paragraph(format!("Palabra clave semilla: {seed}")));
    }

    let all = keywords(payload);
    let mut summary = vec![
        ("Palabras clave encontradas".to_string(), all.len().to_string()),
        (
            "Volumen medio".to_string(),
            format_optional(average(all.iter().map(|k| k.volume)), 0),
        ),
        (
            "Dificultad media".to_string(),
            format_optional(average(all.iter().map(|k| k.difficulty)), 1),
        ),
    ];
    if limits.include_advanced_fields {
        summary.push((
            "CPC medio".to_string(),
            format_optional(average(all.iter().map(|k| k.cpc)), 2),
        ));
    }
    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen".to_string()),
        rows: summary,
    });

    if all.is_empty() {
        blocks.push(LayoutBlock::paragraph("No se encontraron palabras clave."));
        return blocks;
    }

    let mut headers = vec![
        "Palabra clave".to_string(),
        "Volumen".to_string(),
        "Dificultad".to_string(),
    ];
    if limits.include_advanced_fields {
        headers.push("CPC".to_string());
        headers.push("Competencia".to_string());
    }

    let (shown, remaining) = truncate_list(all, limits.max_list_items);
    let rows = shown
        .into_iter()
        .map(|k| {
            let mut row = vec![
                k.keyword,
                format_optional(k.volume, 0),
                format_optional(k.difficulty, 1),
            ];
            if limits.include_advanced_fields {
                row.push(format_optional(k.cpc, 2));
                row.push(k.competition.unwrap_or_else(|| NOT_AVAILABLE.to_string()));
            }
            row
        })
        .collect();

    blocks.push(LayoutBlock::subheading("Palabras clave"));
    blocks.push(LayoutBlock::Table { headers, rows });
    push_upgrade_notice(&mut blocks, remaining);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{SubscriptionTier, ToolType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(count: usize) -> Value {
        let keywords: Vec<Value> = (0..count)
            .map(|i| json!({ "keyword": format!("kw {i}"), "volume": 100 * (i + 1), "difficulty": 10 }))
            .collect();
        json!({ "seedKeyword": "seo", "keywords": keywords })
    }

    #[test]
    fn test_six_keywords_free_tier() {
        let limits = TierLimits::for_tool(ToolType::KeywordResearch, SubscriptionTier::Free);
        let blocks = render(&payload(6), &limits);

        let table_index = blocks
            .iter()
            .position(|b| matches!(b, LayoutBlock::Table { .. }))
            .unwrap();
        match &blocks[table_index] {
            LayoutBlock::Table { rows, .. } => assert_eq!(rows.len(), 5),
            _ => unreachable!(),
        }
        assert_eq!(blocks[table_index + 1], LayoutBlock::UpgradeNotice { remaining: 1 });
        assert_eq!(blocks.len(), table_index + 2);
    }

    #[test]
    fn test_summary_uses_all_keywords() {
        let limits = TierLimits::for_tool(ToolType::KeywordResearch, SubscriptionTier::Free);
        let blocks = render(&payload(6), &limits);
        let summary = blocks.iter().find_map(|b| match b {
            LayoutBlock::KeyValueTable { rows, .. } => Some(rows.clone()),
            _ => None,
        });
        assert_eq!(
            summary.unwrap(),
            vec![
                ("Palabras clave encontradas".to_string(), "6".to_string()),
                ("Volumen medio".to_string(), "350".to_string()),
                ("Dificultad media".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_metrics_render_placeholders() {
        let limits = TierLimits::for_tool(ToolType::KeywordResearch, SubscriptionTier::Trial);
        let blocks = render(&json!({ "keywords": [{ "keyword": "solo" }] }), &limits);
        let row = blocks.iter().find_map(|b| match b {
            LayoutBlock::Table { rows, .. } => rows.first().cloned(),
            _ => None,
        });
        assert_eq!(
            row.unwrap(),
            vec!["solo", "N/A", "N/A", "N/A", "N/A"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }
}
