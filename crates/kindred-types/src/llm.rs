//! Model dispatch types for Kindred.
//!
//! The language model is an opaque collaborator: the engine hands it a fully
//! assembled prompt plus sampling hints and gets text back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of jobs the engine asks a model to do.
///
/// Each task can be routed to a different model via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    PrimaryReasoning,
    FactExtraction,
    IdentityVerification,
    MoodModulation,
    FeedbackEvaluation,
    ContradictionDetection,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::PrimaryReasoning,
        TaskType::FactExtraction,
        TaskType::IdentityVerification,
        TaskType::MoodModulation,
        TaskType::FeedbackEvaluation,
        TaskType::ContradictionDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::PrimaryReasoning => "primary_reasoning",
            TaskType::FactExtraction => "fact_extraction",
            TaskType::IdentityVerification => "identity_verification",
            TaskType::MoodModulation => "mood_modulation",
            TaskType::FeedbackEvaluation => "feedback_evaluation",
            TaskType::ContradictionDetection => "contradiction_detection",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("invalid task type: '{s}'"))
    }
}

/// Sampling parameters for a single model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: None,
            top_p: None,
        }
    }
}

/// Text returned by a model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    /// Name of the model that actually served the call.
    pub model: String,
}

/// Errors from model calls.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("empty response from model '{0}'")]
    EmptyResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
