use crate::blocks::{push_upgrade_notice, truncate_list, LayoutBlock, ListItem};
use crate::payload::{format_optional, value_as_number, value_as_text, PayloadExt, NOT_AVAILABLE};
use crate::tier::TierLimits;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalStatus {
    Good,
    NeedsImprovement,
    Poor,
    Unknown,
}

impl VitalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VitalStatus::Good => "Bueno",
            VitalStatus::NeedsImprovement => "Necesita mejorar",
            VitalStatus::Poor => "Deficiente",
            VitalStatus::Unknown => NOT_AVAILABLE,
        }
    }
}

struct MetricSpec {
    key: &'static str,
    name: &'static str,
    unit: &'static str,
    good: f64,
    poor: f64,
}

/// Second-based metrics above this are taken to be in milliseconds.
const MILLIS_CUTOFF: f64 = 20.0;

/// Web Vitals thresholds: at or below `good` is good, above `poor` is poor.
const METRICS: [MetricSpec; 6] = [
    MetricSpec { key: "lcp", name: "LCP (Largest Contentful Paint)", unit: "s", good: 2.5, poor: 4.0 },
    MetricSpec { key: "fid", name: "FID (First Input Delay)", unit: "ms", good: 100.0, poor: 300.0 },
    MetricSpec { key: "inp", name: "INP (Interaction to Next Paint)", unit: "ms", good: 200.0, poor: 500.0 },
    MetricSpec { key: "cls", name: "CLS (Cumulative Layout Shift)", unit: "", good: 0.1, poor: 0.25 },
    MetricSpec { key: "fcp", name: "FCP (First Contentful Paint)", unit: "s", good: 1.8, poor: 3.0 },
    MetricSpec { key: "ttfb", name: "TTFB (Time to First Byte)", unit: "s", good: 0.8, poor: 1.8 },
];

#[derive(Debug, Clone, PartialEq)]
pub struct VitalMetric {
    pub name: String,
    pub value: Option<f64>,
    pub unit: String,
    pub status: VitalStatus,
}

impl VitalMetric {
    fn assess(spec: &MetricSpec, raw: Option<f64>) -> Self {
        // Second-based metrics sometimes arrive in milliseconds.
        let value = raw.map(|v| if spec.unit == "s" && v > MILLIS_CUTOFF { v / 1000.0 } else { v });
        let status = match value {
            Some(v) if v <= spec.good => VitalStatus::Good,
            Some(v) if v <= spec.poor => VitalStatus::NeedsImprovement,
            Some(_) => VitalStatus::Poor,
            None => VitalStatus::Unknown,
        };
        Self {
            name: spec.name.to_string(),
            value,
            unit: spec.unit.to_string(),
            status,
        }
    }
}

fn metric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Object(_) => value.number(&["value", "p75", "percentile"]),
        other => value_as_number(other),
    }
}

/// Metrics in a fixed order. Accepts `{lcp: 2.1}`, `{lcp: {value: 2.1}}` or `[{name, value}]`.
pub fn metrics(payload: &Value) -> Vec<VitalMetric> {
    let source = payload.get("metrics").unwrap_or(payload);
    match source {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let name = item.text(&["name", "metric"]);
                let value = item.number(&["value"]);
                let spec = name.as_deref().and_then(|n| {
                    let n = n.to_lowercase();
                    METRICS.iter().find(|s| s.key == n || s.name.to_lowercase().starts_with(&n))
                });
                match spec {
                    Some(spec) => VitalMetric::assess(spec, value),
                    None => VitalMetric {
                        name: name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                        value,
                        unit: item.text(&["unit"]).unwrap_or_default(),
                        status: VitalStatus::Unknown,
                    },
                }
            })
            .collect(),
        Value::Object(map) => METRICS
            .iter()
            .filter_map(|spec| {
                let raw = map
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(spec.key))
                    .map(|(_, v)| v)?;
                Some(VitalMetric::assess(spec, metric_value(raw)))
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn recommendations(payload: &Value) -> Vec<ListItem> {
    payload
        .list(&["recommendations", "opportunities"])
        .iter()
        .map(|item| match item {
            Value::Object(_) => ListItem::new(item.text_or_na(&["title", "message"]))
                .with_detail(item.text(&["description", "impact"]).unwrap_or_default()),
            other => ListItem::new(value_as_text(other).unwrap_or_else(|| NOT_AVAILABLE.to_string())),
        })
        .collect()
}

pub fn render(payload: &Value, limits: &TierLimits) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::heading("Core Web Vitals")];

    let url = payload.text_or_na(&["url"]);
    let device = payload.text_or_na(&["device", "strategy"]);
    blocks.push(LayoutBlock::paragraph(format!("URL: {url} · Dispositivo: {device}")));

    blocks.push(LayoutBlock::ScoreGauge {
        label: "Rendimiento".to_string(),
        score: payload.number(&["performanceScore", "score"]),
    });

    let measured = metrics(payload);
    let good = measured.iter().filter(|m| m.status == VitalStatus::Good).count();
    blocks.push(LayoutBlock::KeyValueTable {
        title: Some("Resumen".to_string()),
        rows: vec![
            ("Métricas evaluadas".to_string(), measured.len().to_string()),
            ("Métricas en estado bueno".to_string(), good.to_string()),
        ],
    });

    if measured.is_empty() {
        blocks.push(LayoutBlock::paragraph("No hay métricas disponibles."));
    } else {
        let mut headers = vec!["Métrica".to_string(), "Valor".to_string(), "Estado".to_string()];
        if limits.include_advanced_fields {
            headers.push("Umbral bueno".to_string());
        }
        let rows = measured
            .iter()
            .map(|m| {
                let mut row = vec![
                    m.name.clone(),
                    with_unit(m.value, &m.unit),
                    m.status.label().to_string(),
                ];
                if limits.include_advanced_fields {
                    let threshold = METRICS
                        .iter()
                        .find(|s| s.name == m.name)
                        .map(|s| format!("<= {}", with_unit(Some(s.good), s.unit)))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                    row.push(threshold);
                }
                row
            })
            .collect();
        blocks.push(LayoutBlock::subheading("Métricas"));
        blocks.push(LayoutBlock::Table { headers, rows });
    }

    let all = recommendations(payload);
    if !all.is_empty() {
        let (items, remaining) = truncate_list(all, limits.max_list_items);
        blocks.push(LayoutBlock::subheading("Recomendaciones"));
        blocks.push(LayoutBlock::ItemizedList { items });
        push_upgrade_notice(&mut blocks, remaining);
    }
    blocks
}

pub fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(_) if unit.is_empty() => format_optional(value, 3),
        Some(_) => format!("{} {unit}", format_optional(value, 2)),
        None => NOT_AVAILABLE.to_string(),
    }
}
