//! JSON adapter.
//!
//! Returns the tool payload with an `exportInfo` stamp. On the free tier every
//! array longer than the tool's limit is cut, at any depth, and the object
//! holding it gains a `note` explaining how many items were left out.

use crate::error::{ExportError, Result};
use crate::request::SubscriptionTier;
use crate::service::ExportContext;
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use tracing::debug;

const NOTE_KEY: &str = "note";
const FALLBACK_NOTE_KEY: &str = "exportNote";

pub fn render(ctx: &ExportContext<'_>) -> Result<Vec<u8>> {
    let mut document = match ctx.request.result_payload.clone() {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };

    if ctx.tier == SubscriptionTier::Free {
        let truncated = truncate_object(&mut document, ctx.limits.max_list_items);
        debug!(tool = %ctx.tool, arrays = truncated, "Truncated JSON arrays for free tier");
    }

    document.insert(
        "exportInfo".to_string(),
        json!({
            "format": ctx.format.as_str(),
            "exportedAt": ctx.request.requested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "userPlan": ctx.tier.as_str(),
        }),
    );

    serde_json::to_vec_pretty(&Value::Object(document))
        .map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Cuts arrays in `map` and below to `limit`; returns how many arrays were cut.
fn truncate_object(map: &mut Map<String, Value>, limit: usize) -> usize {
    let mut notes = Vec::new();
    let mut count = 0;

    for (key, child) in map.iter_mut() {
        if let Value::Array(items) = &mut *child {
            if items.len() > limit {
                notes.push(note_text(limit, items.len(), key));
                items.truncate(limit);
                count += 1;
            }
        }
        count += truncate_value(child, limit);
    }

    if !notes.is_empty() {
        let key = if map.contains_key(NOTE_KEY) {
            FALLBACK_NOTE_KEY
        } else {
            NOTE_KEY
        };
        map.insert(key.to_string(), Value::String(notes.join(" ")));
    }
    count
}

fn truncate_value(value: &mut Value, limit: usize) -> usize {
    match value {
        Value::Object(map) => truncate_object(map, limit),
        Value::Array(items) => items.iter_mut().map(|item| truncate_value(item, limit)).sum(),
        _ => 0,
    }
}

fn note_text(shown: usize, total: usize, key: &str) -> String {
    format!("Mostrando {shown} de {total} elementos en '{key}'. Actualiza tu plan para ver todos.")
}
