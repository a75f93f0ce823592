use super::priority_rows;
use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock, ListItem, Priority};
use crate::payload::{format_optional, value_as_text, PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub kind: String,
    pub message: String,
    pub priority: Priority,
}

pub fn suggestions(payload: &Value) -> Vec<Suggestion> {
    payload
        .list(&["suggestions", "recommendations"])
        .iter()
        .map(|item| match item {
            Value::Object(_) => Suggestion {
                kind: item.text_or_na(&["type", "category"]),
                message: item.text_or_na(&["message", "text", "suggestion"]),
                priority: Priority::parse(item.text(&["priority", "impact"]).as_deref()),
            },
            other => Suggestion {
                kind: NOT_AVAILABLE.to_string(),
                message: value_as_text(other).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                priority: Priority::Low,
            },
        })
        .collect()
}

/// Word count from the analysed text when present, otherwise the reported figure.
pub fn word_count(payload: &Value) -> Option<f64> {
    match payload.text(&["content", "text"]) {
        Some(content) => Some(content.split_whitespace().count() as f64),
        None => payload.number(&["wordCount", "words"]),
    }
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Optimización de contenido")];

    if let Some(keyword) = payload.text(&["targetKeyword", "keyword"]) {
        blocks.push(LayoutBlock::paragraph(format!("Palabra clave objetivo: {keyword}")));
    }

    blocks.push(LayoutBlock::ScoreGauge {
        label: "Puntuación de contenido".to_string(),
        score: payload.number(&["score", "contentScore"]),
    });

    let all = suggestions(payload);
    let high = all.iter().filter(|s| s.priority == Priority::High).count();
    let medium = all.iter().filter(|s| s.priority == Priority::Medium).count();
    let low = all.len() - high - medium;

    let mut summary = vec![
        ("Palabras".to_string(), format_optional(word_count(payload), 0)),
        (
            "Legibilidad".to_string(),
            format_optional(payload.number(&["readabilityScore", "readability"]), 1),
        ),
        ("Sugerencias".to_string(), all.len().to_string()),
    ];
    summary.extend(priority_rows(high, medium, low));
    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen".to_string()),
        rows: summary,
    });

    if limits.include_advanced_fields {
        let density = payload.list(&["keywordDensity", "keywords"]);
        if !density.is_empty() {
            let (shown, remaining) = truncate_list(density.to_vec(), limits.max_list_items);
            let rows = shown
                .iter()
                .map(|entry| {
                    vec![
                        entry.text_or_na(&["keyword", "term"]),
                        format_optional(entry.number(&["density"]), 2),
                        format_optional(entry.number(&["count", "occurrences"]), 0),
                    ]
                })
                .collect();
            blocks.push(LayoutBlock::subheading("Densidad de palabras clave"));
            blocks.push(LayoutBlock::Table {
                headers: vec![
                    "Palabra clave".to_string(),
                    "Densidad (%)".to_string(),
                    "Apariciones".to_string(),
                ],
                rows,
            });
            push_upgrade_notice(&mut blocks, remaining);
        }
    }

    if all.is_empty() {
        blocks.push(LayoutBlock::paragraph("No hay sugerencias de mejora."));
        return blocks;
    }

    let (shown, remaining) = truncate_list(all, limits.max_list_items);
    let items = shown
        .into_iter()
        .map(|s| {
            ListItem::new(s.message)
                .with_detail(format!("Tipo: {}", s.kind))
                .with_priority(s.priority)
        })
        .collect();
    blocks.push(LayoutBlock::subheading("Sugerencias"));
    blocks.push(LayoutBlock::ItemizedList { items });
    push_upgrade_notice(&mut blocks, remaining);
    blocks
}
