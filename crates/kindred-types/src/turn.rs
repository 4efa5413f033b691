//! Turn request/response types: the engine's host-facing contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::coherence::{InvariantReport, Severity};
use crate::memory::TokenUsage;

/// One user message to answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub user_input: String,
    pub timestamp: DateTime<Utc>,
}

impl TurnRequest {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        user_input: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            user_input: user_input.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Stages of the turn pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    LoadState,
    Budget,
    RetrieveMemory,
    AssemblePrompt,
    Generate,
    CheckContradictions,
    Regenerate,
    CheckInvariantsAndDrift,
    Persist,
    EmitMetrics,
    Done,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnStage::LoadState => "load_state",
            TurnStage::Budget => "budget",
            TurnStage::RetrieveMemory => "retrieve_memory",
            TurnStage::AssemblePrompt => "assemble_prompt",
            TurnStage::Generate => "generate",
            TurnStage::CheckContradictions => "check_contradictions",
            TurnStage::Regenerate => "regenerate",
            TurnStage::CheckInvariantsAndDrift => "check_invariants_and_drift",
            TurnStage::Persist => "persist",
            TurnStage::EmitMetrics => "emit_metrics",
            TurnStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Snapshot of a token budget ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub used: u32,
    pub available: u32,
    /// `used / available`, or 1.0 when nothing is available.
    pub utilization: f64,
    pub sections: BTreeMap<String, u32>,
}

/// Structured facts about how a turn was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub drift_detected: bool,
    pub drift_reason: String,
    pub mood_drift: f64,
    pub identity_drift: f64,
    pub token_usage: TokenUsage,
    pub budget: BudgetReport,
    pub invariants: InvariantReport,
    pub contradiction_severity: Severity,
    pub contradiction_count: u32,
    pub regenerated: bool,
    /// Sections replaced by an omission placeholder.
    pub degraded_sections: Vec<String>,
    /// Non-degradable sections included past the budget.
    pub forced_sections: Vec<String>,
    pub identity_version: u32,
    pub model_used: String,
    pub stages: Vec<TurnStage>,
}

/// The validated answer to a [`TurnRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub text: String,
    pub turn_id: Uuid,
    pub metadata: TurnMetadata,
}

/// Per-turn record handed to the observability sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetrics {
    pub turn_id: Uuid,
    pub latency_ms: u64,
    pub tokens_used: u32,
    pub contradiction_count: u32,
    pub model_used: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_request_new_sets_fields() {
        let req = TurnRequest::new("u1", "s1", "hello");
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.session_id, "s1");
        assert_eq!(req.user_input, "hello");
    }

    #[test]
    fn test_stage_display_matches_serde() {
        let json = serde_json::to_string(&TurnStage::CheckInvariantsAndDrift).unwrap();
        assert_eq!(json, format!("\"{}\"", TurnStage::CheckInvariantsAndDrift));
    }

    #[test]
    fn test_budget_report_sections_sorted() {
        let mut report = BudgetReport::default();
        report.sections.insert("system".to_string(), 10);
        report.sections.insert("identity".to_string(), 5);
        let keys: Vec<_> = report.sections.keys().cloned().collect();
        assert_eq!(keys, vec!["identity".to_string(), "system".to_string()]);
    }
}
