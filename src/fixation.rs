//! Canonical fact snapshot and terminal-stage validation.
//!
//! After the numbered stages complete, the run's canonical facts are frozen
//! into one fixation block. Stage "5" embeds the block verbatim; stage "6"
//! validates it and copies it into the final report, never recomputing it.
//! The validation is the last line of defense against a block built
//! incorrectly, so it is not elided even though the builder always produces
//! every field.
use crate::decision::Decision;
use crate::intake::Intake;
use crate::stage::{self, StageId, StageRecord};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Metadata key under which stage "5" embeds the block.
pub const FIXATION_KEY: &str = "(10) БЛОК ФИКСАЦИИ";

/// Every field the terminal stage requires, in canonical order.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "run_id",
    "evia_cost_45_days",
    "evia_decision",
    "project_name",
    "company_name",
    "goals",
    "problem_statement",
];

/// Immutable snapshot of the run's canonical facts.
#[derive(Debug, Clone, Serialize)]
pub struct FixationBlock {
    pub run_id: String,
    pub evia_cost_45_days: String,
    pub evia_decision: String,
    pub project_name: String,
    pub company_name: String,
    pub goals: String,
    pub problem_statement: String,
}

/// Build the block from the run id, the configured cost, the decision, and
/// four fields copied out of the sanitized intake.
pub fn build(
    run_id: &str,
    cost_45_days: &str,
    decision: Decision,
    intake: &Intake,
    missing_marker: &str,
) -> FixationBlock {
    FixationBlock {
        run_id: run_id.to_string(),
        evia_cost_45_days: cost_45_days.to_string(),
        evia_decision: decision.as_str().to_string(),
        project_name: intake_field(intake, "project_name", missing_marker),
        company_name: intake_field(intake, "company_name", missing_marker),
        goals: intake_field(intake, "goals", missing_marker),
        problem_statement: intake_field(intake, "problem_statement", missing_marker),
    }
}

fn intake_field(intake: &Intake, key: &str, missing_marker: &str) -> String {
    match intake.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => missing_marker.to_string(),
    }
}

/// The block as a JSON object, field order preserved.
pub fn to_map(block: &FixationBlock) -> Result<Map<String, Value>> {
    match serde_json::to_value(block).context("serialize fixation block")? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("fixation block did not serialize to an object")),
    }
}

/// Human-readable `key: value` listing appended to the stage "5" document.
pub fn listing(block: &Map<String, Value>) -> String {
    block
        .iter()
        .map(|(key, value)| format!("{key}: {}", field_text(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Required fields absent from a serialized block. Empty means valid.
pub fn missing_fields(block: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !block.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}

/// Build the terminal stage record from a serialized fixation block.
///
/// All seven required fields present: the terminal text is a fixed-format
/// report reproducing the block byte for byte. Any field missing: the text is
/// exactly `OUTPUT INVALID` and the metadata names the absent fields. Either
/// way the record is built and the run carries on to packaging.
pub fn terminal_record(
    run_id: &str,
    block: &Map<String, Value>,
    prompt_text: &str,
) -> Result<StageRecord> {
    let missing = missing_fields(block);

    let (text, data) = if missing.is_empty() {
        let copied: Map<String, Value> = REQUIRED_FIELDS
            .iter()
            .map(|field| {
                (
                    field.to_string(),
                    block.get(*field).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        let text = terminal_report(&copied, "OK");

        let mut data = Map::new();
        data.insert("stage".to_string(), Value::String("6".to_string()));
        data.insert("run_id".to_string(), Value::String(run_id.to_string()));
        data.insert("status".to_string(), Value::String("OK".to_string()));
        data.insert(
            "evia_cost_45_days".to_string(),
            copied.get("evia_cost_45_days").cloned().unwrap_or(Value::Null),
        );
        data.insert(
            "evia_decision".to_string(),
            copied.get("evia_decision").cloned().unwrap_or(Value::Null),
        );
        data.insert("copied_from_fixation".to_string(), Value::Object(copied));
        data.insert("llm_output".to_string(), Value::String(text.clone()));
        (text, data)
    } else {
        let text = "OUTPUT INVALID".to_string();

        let mut data = Map::new();
        data.insert("stage".to_string(), Value::String("6".to_string()));
        data.insert("run_id".to_string(), Value::String(run_id.to_string()));
        data.insert(
            "status".to_string(),
            Value::String("OUTPUT INVALID".to_string()),
        );
        data.insert(
            "missing_fixation_fields".to_string(),
            Value::Array(missing.into_iter().map(Value::String).collect()),
        );
        data.insert("llm_output".to_string(), Value::String(text.clone()));
        (text, data)
    };

    let markdown = stage::render_markdown(StageId::S6, prompt_text, &text, &data)?;
    Ok(StageRecord {
        stage: StageId::S6,
        markdown,
        data,
    })
}

/// Fixed-format final report, copied, not recomputed, from the block.
fn terminal_report(copied: &Map<String, Value>, status: &str) -> String {
    let field = |key: &str| {
        copied
            .get(key)
            .map(field_text)
            .unwrap_or_default()
    };
    format!(
        "Финальный результат EVIA R&D\n\n\
         status: {status}\n\
         run_id: {}\n\
         project_name: {}\n\
         company_name: {}\n\
         goals: {}\n\
         problem_statement: {}\n\
         evia_decision: {}\n\
         evia_cost_45_days: {}",
        field("run_id"),
        field("project_name"),
        field("company_name"),
        field("goals"),
        field("problem_statement"),
        field("evia_decision"),
        field("evia_cost_45_days"),
    )
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
