use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock};
use crate::payload::{format_optional, joined_text, value_as_text, PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

const OPTIMAL_LENGTH: std::ops::RangeInclusive<usize> = 50..=60;

#[derive(Debug, Clone, PartialEq)]
pub struct TitleEntry {
    pub title: String,
    /// Character count of the title, always computed from the text.
    pub length: usize,
    pub keywords: Option<String>,
    pub score: Option<f64>,
}

/// Accepts plain strings or `{title, keywords, score}` objects.
pub fn titles(payload: &Value) -> Vec<TitleEntry> {
    payload
        .list(&["titles", "results", "suggestions"])
        .iter()
        .map(|item| {
            let title = match item {
                Value::String(_) => value_as_text(item),
                _ => item.text(&["title", "text"]),
            };
            TitleEntry {
                length: title.as_deref().map_or(0, |t| t.chars().count()),
                title: title.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                keywords: joined_text(item.get("keywords"), ", "),
                score: item.number(&["score", "seoScore"]),
            }
        })
        .collect()
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Títulos SEO generados")];

    if let Some(topic) = payload.text(&["topic", "keyword", "query"]) {
        blocks.push(LayoutBlock::paragraph(format!("Tema: {topic}")));
    }

    let all = titles(payload);
    let measured: Vec<usize> = all.iter().filter(|t| t.length > 0).map(|t| t.length).collect();
    let average_length = (!measured.is_empty())
        .then(|| measured.iter().sum::<usize>() as f64 / measured.len() as f64);
    let optimal = measured.iter().filter(|len| OPTIMAL_LENGTH.contains(*len)).count();

    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen".to_string()),
        rows: vec![
            ("Títulos generados".to_string(), all.len().to_string()),
            ("Longitud media".to_string(), format_optional(average_length, 1)),
            ("En rango óptimo (50-60 caracteres)".to_string(), optimal.to_string()),
        ],
    });

    if all.is_empty() {
        blocks.push(LayoutBlock::paragraph("No se generaron títulos."));
        return blocks;
    }

    let mut headers = vec!["#".to_string(), "Título".to_string(), "Longitud".to_string()];
    if limits.include_advanced_fields {
        headers.push("Palabras clave".to_string());
        headers.push("Puntuación".to_string());
    }

    let (shown, remaining) = truncate_list(all, limits.max_list_items);
    let rows = shown
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut row = vec![(i + 1).to_string(), entry.title, entry.length.to_string()];
            if limits.include_advanced_fields {
                row.push(entry.keywords.unwrap_or_else(|| NOT_AVAILABLE.to_string()));
                row.push(format_optional(entry.score, 0));
            }
            row
        })
        .collect();

    blocks.push(LayoutBlock::subheading("Títulos"));
    blocks.push(LayoutBlock::Table { headers, rows });
    push_upgrade_notice(&mut blocks, remaining);
    blocks
}
