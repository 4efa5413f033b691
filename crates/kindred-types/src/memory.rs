//! Memory types for Kindred.
//!
//! Two tiers: an append-only episodic log (one record per turn) and a
//! semantic store of subject-predicate-object facts distilled from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::identity::IdentitySnapshot;
use crate::mood::PadState;

/// Token accounting for one model exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Raw record of one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicMemory {
    pub turn_id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub response: String,
    pub identity: IdentitySnapshot,
    pub mood: PadState,
    pub token_usage: TokenUsage,
    pub salience_score: f64,
    pub emotional_valence: f64,
    pub concept_tags: Vec<String>,
    pub contradiction_flags: Vec<String>,
    /// Embedding of the exchange text, if one was computed at persist time.
    pub embedding: Option<Vec<f32>>,
    pub consolidated: bool,
}

impl EpisodicMemory {
    pub const DEFAULT_SALIENCE: f64 = 0.5;

    /// Text used for lexical matching and embedding.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.user_input, self.response)
    }
}

/// A distilled subject-predicate-object claim.
///
/// The triple is the identity of a fact; repeated observations reinforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// In [0, 1].
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    /// In [0.1, 1]. Grows on reinforcement, shrinks with age.
    pub decay_age: f64,
    /// Episodes a consolidated fact was derived from.
    #[serde(default)]
    pub source_turn_ids: Vec<Uuid>,
}

impl SemanticFact {
    pub const MIN_DECAY_AGE: f64 = 0.1;
    pub const MAX_DECAY_AGE: f64 = 1.0;

    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
            decay_age: Self::MAX_DECAY_AGE,
            source_turn_ids: Vec::new(),
        }
    }

    /// Retrieval weight: confidence scaled by freshness.
    pub fn weight(&self) -> f64 {
        self.confidence * self.decay_age
    }
}

/// Lifecycle of a consolidation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("invalid job status: '{other}'")),
        }
    }
}

/// One run of the episodic-to-semantic consolidation pass for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationJob {
    pub job_id: Uuid,
    pub user_id: String,
    pub status: JobStatus,
    pub episodes_processed: u32,
    pub facts_written: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ConsolidationJob {
    /// A fresh job in the `running` state.
    pub fn start(user_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            user_id: user_id.into(),
            status: JobStatus::Running,
            episodes_processed: 0,
            facts_written: 0,
            started_at,
            finished_at: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_fact_new_defaults() {
        let fact = SemanticFact::new("alice", "likes", "tea", 1.4, Utc::now());
        assert_eq!(fact.confidence, 1.0);
        assert_eq!(fact.decay_age, 1.0);
        assert!(fact.source_turn_ids.is_empty());
    }

    #[test]
    fn test_fact_weight() {
        let mut fact = SemanticFact::new("alice", "likes", "tea", 0.8, Utc::now());
        fact.decay_age = 0.5;
        assert!((fact.weight() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_job_status_roundtrip() {
        for status in [JobStatus::Running, JobStatus::Completed, JobStatus::Failed] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_job_start_is_running() {
        let job = ConsolidationJob::start("alice", Utc::now());
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.episodes_processed, 0);
        assert!(job.finished_at.is_none());
    }
}
