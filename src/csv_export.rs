//! CSV adapter.
//!
//! Each tool has a fixed column schema. The header row is written verbatim.
//! Text columns are always quoted, even when the text looks like a number, so
//! free text survives any compliant parser. Rows obey the tier's list limit,
//! with no notice row.

use crate::blocks::truncate_list;
use crate::error::{ExportError, Result};
use crate::payload::{format_optional, NOT_AVAILABLE};
use crate::request::ToolType;
use crate::sections::{
    content_optimizer, core_vitals, duplicate_detector, keyword_research, seo_audit,
    title_generator,
};
use crate::service::ExportContext;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;
use tracing::debug;

/// How a column's cells are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Free text: always quoted.
    Text,
    /// Bare when the cell is a number, quoted otherwise (e.g. `N/A`).
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: CellKind,
}

const fn text(name: &'static str) -> Column {
    Column { name, kind: CellKind::Text }
}

const fn number(name: &'static str) -> Column {
    Column { name, kind: CellKind::Number }
}

/// Columns per tool, in output order.
pub fn schema(tool: ToolType) -> &'static [Column] {
    match tool {
        ToolType::TitleGenerator => const { &[
            number("Número"),
            text("Título SEO"),
            number("Longitud"),
            text("Palabras Clave"),
        ] },
        ToolType::KeywordResearch => const { &[
            text("Palabra Clave"),
            number("Volumen"),
            number("Dificultad"),
            number("CPC"),
            text("Competencia"),
            text("Intención"),
        ] },
        ToolType::SeoAudit => const { &[
            text("Prioridad"),
            text("Categoría"),
            text("Problema"),
            text("Descripción"),
            text("Recomendación"),
        ] },
        ToolType::CoreVitals => const { &[
            text("Métrica"),
            number("Valor"),
            text("Unidad"),
            text("Estado"),
        ] },
        ToolType::ContentOptimizer => const { &[text("Tipo"), text("Sugerencia"), text("Prioridad")] },
        ToolType::DuplicateDetector => const { &[
            text("Fragmento"),
            number("Similitud (%)"),
            text("Fuente"),
        ] },
    }
}

/// Data rows for `tool`, already cut to `max_items`.
pub fn rows(tool: ToolType, payload: &Value, max_items: usize) -> Vec<Vec<String>> {
    match tool {
        ToolType::TitleGenerator => {
            let (shown, _) = truncate_list(title_generator::titles(payload), max_items);
            shown
                .into_iter()
                .enumerate()
                .map(|(i, t)| {
                    vec![
                        (i + 1).to_string(),
                        t.title,
                        t.length.to_string(),
                        t.keywords.unwrap_or_default(),
                    ]
                })
                .collect()
        }
        ToolType::KeywordResearch => {
            let (shown, _) = truncate_list(keyword_research::keywords(payload), max_items);
            shown
                .into_iter()
                .map(|k| {
                    vec![
                        k.keyword,
                        format_optional(k.volume, 0),
                        format_optional(k.difficulty, 1),
                        format_optional(k.cpc, 2),
                        or_na(k.competition),
                        or_na(k.intent),
                    ]
                })
                .collect()
        }
        ToolType::SeoAudit => {
            let (shown, _) = truncate_list(seo_audit::issues(payload), max_items);
            shown
                .into_iter()
                .map(|issue| {
                    vec![
                        issue.priority.label().to_string(),
                        or_na(issue.category),
                        issue.title,
                        or_na(issue.description),
                        or_na(issue.recommendation),
                    ]
                })
                .collect()
        }
        // Metrics are a fixed set of at most six and are never cut, same as the PDF table.
        ToolType::CoreVitals => core_vitals::metrics(payload)
            .into_iter()
            .map(|m| {
                vec![
                    m.name,
                    format_optional(m.value, 3),
                    m.unit,
                    m.status.label().to_string(),
                ]
            })
            .collect(),
        ToolType::ContentOptimizer => {
            let (shown, _) = truncate_list(content_optimizer::suggestions(payload), max_items);
            shown
                .into_iter()
                .map(|s| vec![s.kind, s.message, s.priority.label().to_string()])
                .collect()
        }
        ToolType::DuplicateDetector => {
            let (shown, _) = truncate_list(duplicate_detector::fragments(payload), max_items);
            shown
                .into_iter()
                .map(|f| vec![f.text, format_optional(f.similarity, 1), f.source])
                .collect()
        }
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn render(ctx: &ExportContext<'_>) -> Result<Vec<u8>> {
    let rows = rows(ctx.tool, &ctx.request.result_payload, ctx.limits.max_list_items);
    debug!(tool = %ctx.tool, rows = rows.len(), "Rendered CSV rows");
    write_csv(schema(ctx.tool), &rows)
}

/// Writes the column names unquoted where possible, then `rows` with every
/// text cell quoted and its embedded quotes doubled.
pub fn write_csv(columns: &[Column], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|c| c.name))
        .map_err(encoding)?;
    let buffer = writer
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.to_string()))?;

    // Cells arrive already quoted, so the writer must not add its own.
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for row in rows {
        let cells = row
            .iter()
            .enumerate()
            .map(|(i, cell)| match columns.get(i).map(|c| c.kind) {
                Some(CellKind::Number) if cell.parse::<f64>().is_ok() => cell.clone(),
                _ => quoted(cell),
            });
        writer.write_record(cells).map_err(encoding)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.to_string()))
}

fn quoted(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn encoding(err: csv::Error) -> ExportError {
    ExportError::Encoding(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExportRequest;
    use crate::service::ExportService;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn export(tool: &str, payload: Value, tier: &str) -> String {
        let request = ExportRequest::new(tool, "Export", payload, tier, "csv");
        let artifact = ExportService::new().generate_export(&request).unwrap();
        String::from_utf8(artifact.bytes).unwrap()
    }

    #[test]
    fn test_header_row_is_written_verbatim() {
        let cases = [
            ("title-generator", "Número,Título SEO,Longitud,Palabras Clave"),
            (
                "keyword-research",
                "Palabra Clave,Volumen,Dificultad,CPC,Competencia,Intención",
            ),
            (
                "seo-audit",
                "Prioridad,Categoría,Problema,Descripción,Recomendación",
            ),
            ("core-vitals", "Métrica,Valor,Unidad,Estado"),
            ("content-optimizer", "Tipo,Sugerencia,Prioridad"),
            ("duplicate-detector", "Fragmento,Similitud (%),Fuente"),
        ];
        for (tool, header) in cases {
            let out = export(tool, json!({}), "premium");
            assert_eq!(out, format!("{header}\n"), "{tool}");
        }
    }

    #[test]
    fn test_numeric_looking_text_is_quoted() {
        let payload = json!({ "titles": [{ "title": "2024", "keywords": "404" }] });
        let out = export("title-generator", payload, "premium");
        assert_eq!(out.lines().nth(1), Some(r#"1,"2024",4,"404""#));

        let payload = json!({ "keywords": [{ "keyword": "365", "volume": 90, "competition": "0.5" }] });
        let out = export("keyword-research", payload, "premium");
        assert_eq!(out.lines().nth(1), Some(r#""365",90,"N/A","N/A","0.5","N/A""#));
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let payload = json!({ "titles": [{ "title": "Guía SEO", "keywords": "He said \"hello\"" }] });
        let out = export("title-generator", payload, "premium");
        let line = out.lines().nth(1).unwrap();
        assert_eq!(line, r#"1,"Guía SEO",8,"He said ""hello""""#);
    }

    #[test]
    fn test_free_tier_truncates_rows_without_notice() {
        let keywords: Vec<Value> = (1..=6)
            .map(|i| json!({ "keyword": format!("kw {i}"), "volume": i * 100 }))
            .collect();
        let out = export("keyword-research", json!({ "keywords": keywords }), "free");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Palabra Clave,Volumen,Dificultad,CPC,Competencia,Intención");
        assert!(lines[5].starts_with("\"kw 5\",500,"));
    }

    #[test]
    fn test_output_parses_back_with_csv_reader() {
        let payload = json!({
            "issues": [
                { "title": "Falta meta, descripción", "priority": "high", "category": "On-page",
                  "description": "Línea uno\nlínea dos", "recommendation": "Añade \"meta\"" },
                { "title": "Imágenes sin alt" }
            ]
        });
        let out = export("seo-audit", payload, "premium");
        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 5);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Alta");
        assert_eq!(&records[0][2], "Falta meta, descripción");
        assert_eq!(&records[0][3], "Línea uno\nlínea dos");
        assert_eq!(&records[0][4], "Añade \"meta\"");
        assert_eq!(&records[1][0], "Baja");
        assert_eq!(&records[1][1], "N/A");
    }

    #[test]
    fn test_core_vitals_rows_are_not_capped() {
        let payload = json!({ "metrics": { "lcp": 2.1, "fid": 80, "cls": 0.3, "fcp": 1.2, "ttfb": 0.5 } });
        let out = export("core-vitals", payload, "free");
        assert_eq!(out.lines().count(), 6);
        let cls = out.lines().find(|l| l.contains("CLS")).unwrap();
        assert!(cls.starts_with("\"CLS (Cumulative Layout Shift)\",0.3,"));
        assert!(cls.ends_with("\"Deficiente\""));
    }

    #[test]
    fn test_every_tool_has_a_schema() {
        for tool in ToolType::ALL {
            assert!(!schema(tool).is_empty());
            assert!(rows(tool, &Value::Null, 3).is_empty());
        }
    }
}
