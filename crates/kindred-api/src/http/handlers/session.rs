//! Session endpoints.
//!
//! DELETE /api/v1/sessions/{id} - Drop a session's coherence history and model overrides.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    state.orchestrator.end_session(&session_id);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "session_id": session_id, "ended": true }),
        request_id,
        elapsed,
    )))
}
