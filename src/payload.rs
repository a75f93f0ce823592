//! Lenient accessors over tool result payloads.
//!
//! Payloads come from the tools as loosely-typed JSON. Every accessor here
//! degrades to a placeholder instead of failing so renderers never abort an
//! export on a missing or mistyped field.

use serde_json::Value;

pub const NOT_AVAILABLE: &str = "N/A";

pub trait PayloadExt {
    /// First present key among `keys`, as trimmed text. Numbers and booleans are stringified.
    fn text(&self, keys: &[&str]) -> Option<String>;

    /// Like [`PayloadExt::text`] but falls back to `"N/A"`.
    fn text_or_na(&self, keys: &[&str]) -> String {
        self.text(keys).unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// First present key among `keys` as a finite number. Numeric strings are accepted.
    fn number(&self, keys: &[&str]) -> Option<f64>;

    /// First key holding an array; empty slice otherwise.
    fn list(&self, keys: &[&str]) -> &[Value];
}

impl PayloadExt for Value {
    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get(*key).and_then(value_as_text))
    }

    fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| self.get(*key).and_then(value_as_number))
    }

    fn list(&self, keys: &[&str]) -> &[Value] {
        keys.iter()
            .find_map(|key| self.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Joins an array of strings, or passes a single string through.
pub fn joined_text(value: Option<&Value>, separator: &str) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_as_text).collect();
            (!parts.is_empty()).then(|| parts.join(separator))
        }
        other => value_as_text(other),
    }
}

/// Formats a number without a trailing `.0` and with at most `decimals` places.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{value:.decimals$}");
        if formatted.contains('.') {
            formatted.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            formatted
        }
    }
}

pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format_number(v, decimals))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Mean of the present values, `None` when there are none.
pub fn average(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
