use thiserror::Error;

use crate::llm::ModelError;

/// Errors from repository operations (used by trait definitions in kindred-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Startup configuration problems. These are fatal: the engine refuses to run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reasons a conversational turn failed.
///
/// A failed turn never produces a partial response and never leaves a
/// partial durable record behind.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("store failure: {0}")]
    Store(#[from] RepositoryError),

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid turn request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownModel("gpt-9".to_string());
        assert_eq!(err.to_string(), "unknown model 'gpt-9'");
    }

    #[test]
    fn test_turn_error_wraps_store_failure() {
        let err: TurnError = RepositoryError::Connection.into();
        assert!(matches!(err, TurnError::Store(RepositoryError::Connection)));
        assert_eq!(err.to_string(), "store failure: database connection error");
    }

    #[test]
    fn test_turn_error_wraps_model_failure() {
        let err: TurnError = ModelError::Provider {
            message: "timeout".to_string(),
        }
        .into();
        assert!(err.to_string().contains("timeout"));
    }
}
