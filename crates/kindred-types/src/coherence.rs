//! Coherence, drift and contradiction types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::identity::IdentitySnapshot;
use crate::mood::PadState;

/// State of the conversation right after a turn completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnStateSnapshot {
    pub turn_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub identity: IdentitySnapshot,
    pub mood: PadState,
    /// Factual assertions the agent made about itself this turn.
    pub claims: Vec<String>,
    pub episodic_count: u64,
    pub semantic_count: u64,
}

/// Outcome of comparing the latest snapshot against older history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_detected: bool,
    pub reason: String,
    pub mood_drift: f64,
    pub identity_drift: f64,
}

impl DriftReport {
    pub const INSUFFICIENT_HISTORY: &'static str = "insufficient_history";

    pub fn insufficient_history() -> Self {
        Self {
            drift_detected: false,
            reason: Self::INSUFFICIENT_HISTORY.to_string(),
            mood_drift: 0.0,
            identity_drift: 0.0,
        }
    }
}

/// Ordered severity. `Error` forces a regeneration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "none"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A rule breach found in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub id: String,
    pub message: String,
    pub severity: Severity,
}

/// Result of checking a response against invariant rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl InvariantReport {
    pub fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    /// Fold another report into this one.
    pub fn merge(mut self, other: InvariantReport) -> Self {
        self.violations.extend(other.violations);
        self.passed = self.violations.is_empty();
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Category of a contradiction finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    /// The response contradicts itself.
    IntraTurn,
    /// The response contradicts an earlier turn.
    CrossTurn,
    /// The response contradicts a stored semantic fact.
    Semantic,
    /// The response contradicts the agent's identity.
    Identity,
}

impl fmt::Display for ContradictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContradictionKind::IntraTurn => write!(f, "intra_turn"),
            ContradictionKind::CrossTurn => write!(f, "cross_turn"),
            ContradictionKind::Semantic => write!(f, "semantic"),
            ContradictionKind::Identity => write!(f, "identity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub kind: ContradictionKind,
    pub severity: Severity,
    pub reason: String,
    pub evidence: Vec<String>,
}

/// All contradiction findings for one response.
///
/// The report severity is the highest severity among its findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContradictionReport {
    pub findings: Vec<Contradiction>,
}

impl ContradictionReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or(Severity::None)
    }

    pub fn requires_regeneration(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn of_kind(&self, kind: ContradictionKind) -> impl Iterator<Item = &Contradiction> {
        self.findings.iter().filter(move |c| c.kind == kind)
    }
}
