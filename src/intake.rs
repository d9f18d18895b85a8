//! Intake normalization and evidence assembly.
//!
//! The raw intake arrives as arbitrarily nested JSON. Sanitization is a total
//! recursive pass over that shape: every leaf that is null, blank, or an empty
//! list is replaced by the missing-value marker so downstream stages never see
//! an empty string. The sanitized intake is built once per run and never
//! mutated afterwards.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Field name → sanitized value, produced once from the raw input.
pub type Intake = Map<String, Value>;

/// One supporting evidence item, order-preserving.
///
/// Uploaded artifacts arrive as `{type: "file", value: <stored path>}`;
/// caller-supplied notes carry their own type and value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Recursively sanitize one value.
///
/// Null becomes the marker; strings are trimmed (blank → marker); lists are
/// sanitized element-wise with an empty list replaced by `[marker]`; mappings
/// are sanitized value-wise with keys untouched; any other scalar passes
/// through unchanged.
pub fn sanitize_value(value: Value, missing: &str) -> Value {
    match value {
        Value::Null => Value::String(missing.to_string()),
        Value::String(text) => {
            let cleaned = text.trim();
            if cleaned.is_empty() {
                Value::String(missing.to_string())
            } else {
                Value::String(cleaned.to_string())
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                Value::Array(vec![Value::String(missing.to_string())])
            } else {
                Value::Array(
                    items
                        .into_iter()
                        .map(|item| sanitize_value(item, missing))
                        .collect(),
                )
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, sanitize_value(item, missing)))
                .collect(),
        ),
        other => other,
    }
}

/// Sanitize a raw intake record field by field.
pub fn prepare_intake(raw: Map<String, Value>, missing: &str) -> Intake {
    raw.into_iter()
        .map(|(key, value)| (key, sanitize_value(value, missing)))
        .collect()
}

/// Assemble the run's evidence list: uploaded files first, then any
/// `manual_sources` entries from the raw intake, in input order.
pub fn collect_evidence(raw: &Map<String, Value>, files: &[PathBuf]) -> Vec<EvidenceItem> {
    let mut evidence: Vec<EvidenceItem> = files
        .iter()
        .map(|path| EvidenceItem {
            kind: "file".to_string(),
            value: path.display().to_string(),
        })
        .collect();

    if let Some(Value::Array(sources)) = raw.get("manual_sources") {
        for source in sources {
            let kind = source.get("type").and_then(Value::as_str).unwrap_or("note");
            let value = source.get("value").and_then(Value::as_str).unwrap_or("");
            evidence.push(EvidenceItem {
                kind: kind.to_string(),
                value: value.to_string(),
            });
        }
    }

    evidence
}
