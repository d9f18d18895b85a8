//! Stage "0" readiness gate.
//!
//! Checks the sanitized intake for the required fields and produces one
//! clarification question per missing field. Pure and deterministic; the
//! orchestrator decides what to do with the outcome.
use crate::intake::Intake;
use serde_json::Value;

/// Fields the pipeline cannot proceed without.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "project_name",
    "company_name",
    "goals",
    "problem_statement",
];

const MAX_QUESTIONS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Ready,
    NotReady,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Ready => "ГОТОВО",
            GateStatus::NotReady => "НЕ ГОТОВО",
        }
    }
}

/// Gate verdict plus the clarification questions to send back when not ready.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub status: GateStatus,
    pub questions: Vec<String>,
}

/// Evaluate readiness: a required field is missing when it is absent from the
/// intake or was replaced by the missing-value marker during sanitization.
pub fn evaluate(intake: &Intake, missing_marker: &str) -> GateOutcome {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| match intake.get(*field) {
            None => true,
            Some(Value::String(text)) => text == missing_marker,
            Some(_) => false,
        })
        .collect();

    if missing.is_empty() {
        return GateOutcome {
            status: GateStatus::Ready,
            questions: Vec::new(),
        };
    }

    let questions = missing
        .iter()
        .take(MAX_QUESTIONS)
        .map(|field| format!("Уточните поле '{field}' для продолжения."))
        .collect();

    GateOutcome {
        status: GateStatus::NotReady,
        questions,
    }
}
