//! Accept/reject decision derived from the fixed cost configuration.
//!
//! The interesting contract is not the comparison itself but propagation:
//! every downstream consumer (stage context, fixation block, terminal
//! report) must carry this decision verbatim and never recompute it.
use crate::config::EXPECTED_COST;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Accept => "БЕРЁМ",
            Decision::Reject => "НЕ БЕРЁМ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub failure_reason: Option<String>,
}

/// Compare the configured cost against the expected literal.
///
/// TODO: compare against a per-run negotiated cost once intake carries one.
/// Today both sides come from the same configuration constant, so the reject
/// branch is unreachable in the shipped setup; it is kept because the
/// propagation contract downstream depends on it.
pub fn evaluate(cost_45_days: &str) -> DecisionOutcome {
    if cost_45_days == EXPECTED_COST {
        DecisionOutcome {
            decision: Decision::Accept,
            failure_reason: None,
        }
    } else {
        DecisionOutcome {
            decision: Decision::Reject,
            failure_reason: Some("EVIA_COST mismatch".to_string()),
        }
    }
}
