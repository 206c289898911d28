//! Lenient decoding of upstream payloads whose shape varies between
//! deployments.

use quest_model::{ProviderError, ProviderResult};
use serde_json::Value;

/// Decode a preferences payload.
///
/// Accepted shapes:
/// - a bare array: `["art", "history"]`
/// - a wrapper object: `{"preferences": [...]}`
///
/// Elements are strings, objects with a `preferenza` string, or anything
/// else (kept as its JSON text). Any other top-level shape is reported as
/// an upstream error carrying the raw body.
pub fn parse_preferences(service: &'static str, raw: &str) -> ProviderResult<Vec<String>> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| ProviderError::unavailable(service, format!("malformed response: {}", e)))?;

    let items = match &root {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("preferences") {
            Some(Value::Array(items)) => items,
            _ => return Err(unexpected_shape(service, raw)),
        },
        _ => return Err(unexpected_shape(service, raw)),
    };

    Ok(items
        .iter()
        .map(|item| match item {
            Value::String(tag) => tag.clone(),
            Value::Object(map) => match map.get("preferenza") {
                Some(Value::String(tag)) => tag.clone(),
                _ => item.to_string(),
            },
            other => other.to_string(),
        })
        .collect())
}

fn unexpected_shape(service: &'static str, raw: &str) -> ProviderError {
    ProviderError::UpstreamHttp {
        service,
        status: 500,
        body: raw.to_string(),
    }
}

/// Decode the first row of a distance table (`{"distances": [[..]]}`).
///
/// `null` entries become NaN so callers can treat them as unreachable.
pub fn parse_distance_row(service: &'static str, raw: &str) -> ProviderResult<Vec<f64>> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| ProviderError::unavailable(service, format!("malformed response: {}", e)))?;

    let row = root
        .get("distances")
        .and_then(|rows| rows.get(0))
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::unavailable(service, "response has no distance row"))?;

    Ok(row
        .iter()
        .map(|cell| cell.as_f64().unwrap_or(f64::NAN))
        .collect())
}

/// Decode a crowd count (`{"count": n}`).
///
/// Returns `None` when the count is missing, null, negative or not a number.
/// Numeric strings are accepted.
pub fn parse_crowd_count(raw: &str) -> Option<u32> {
    let root: Value = serde_json::from_str(raw).ok()?;
    match root.get("count")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Extract generated text from a chat reply.
///
/// Proxies answer with plain text; a raw Ollama server answers with
/// `{"response": "..."}`.
pub fn parse_chat_reply(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => match map.get("response") {
            Some(Value::String(text)) => text.clone(),
            _ => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}
