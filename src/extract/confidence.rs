use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heuristic trust level of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

const HIGH_THRESHOLD: f64 = 0.8;
const MEDIUM_THRESHOLD: f64 = 0.5;

/// Scores extracted data by the share of populated top-level fields
///
/// A field counts as populated unless it is null, a blank string, or an
/// empty array/object. Non-objects and empty objects score low.
pub fn score_confidence(data: &Value) -> Confidence {
    let fields = match data.as_object() {
        Some(fields) if !fields.is_empty() => fields,
        _ => return Confidence::Low,
    };

    let populated = fields.values().filter(|v| is_populated(v)).count();
    let ratio = populated as f64 / fields.len() as f64;

    if ratio >= HIGH_THRESHOLD {
        Confidence::High
    } else if ratio >= MEDIUM_THRESHOLD {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
