//! Turn endpoints.
//!
//! Endpoints:
//! - POST /api/v1/turns         - Run one conversational turn
//! - POST /api/v1/system-prompt - Wrap a host system prompt with identity and mood

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use kindred_types::turn::{TurnRequest, TurnResponse};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for POST /api/v1/turns.
#[derive(Debug, Deserialize)]
pub struct CreateTurnRequest {
    pub user_id: String,
    pub session_id: String,
    pub user_input: String,
}

/// POST /api/v1/turns - Run one turn.
///
/// Model failures map to 502, store failures to 500. A failed turn
/// never returns partial text.
pub async fn create_turn(
    State(state): State<AppState>,
    Json(body): Json<CreateTurnRequest>,
) -> Result<Json<ApiResponse<TurnResponse>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if body.user_input.trim().is_empty() {
        return Err(AppError::Validation("user_input must not be empty".to_string()));
    }

    let request = TurnRequest::new(body.user_id, body.session_id, body.user_input);
    let response = state.orchestrator.orchestrate(request).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(response, request_id, elapsed)))
}

/// Request body for POST /api/v1/system-prompt.
#[derive(Debug, Deserialize)]
pub struct SystemPromptRequest {
    pub user_id: String,
    /// The host application's own system prompt.
    #[serde(default)]
    pub base: String,
}

#[derive(Debug, Serialize)]
pub struct SystemPromptResponse {
    pub system_prompt: String,
}

/// POST /api/v1/system-prompt - Apply the system-prompt hook.
pub async fn system_prompt(
    State(state): State<AppState>,
    Json(body): Json<SystemPromptRequest>,
) -> Result<Json<ApiResponse<SystemPromptResponse>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if body.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }

    let system_prompt = state
        .orchestrator
        .modify_system_prompt(&body.base, &body.user_id)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        SystemPromptResponse { system_prompt },
        request_id,
        elapsed,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_base_defaults_to_empty() {
        let body: SystemPromptRequest = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(body.base, "");
    }

    #[test]
    fn turn_body_requires_all_fields() {
        assert!(serde_json::from_str::<CreateTurnRequest>(r#"{"user_id":"u1"}"#).is_err());
        let body: CreateTurnRequest = serde_json::from_str(
            r#"{"user_id":"u1","session_id":"s1","user_input":"hi"}"#,
        )
        .unwrap();
        assert_eq!(body.session_id, "s1");
    }
}
