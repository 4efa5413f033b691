//! Turn metrics endpoint.
//!
//! GET /api/v1/metrics - Summary of turns served by this process.

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use kindred_core::metrics::MetricsSummary;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn get_metrics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MetricsSummary>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let summary = state.metrics.summary();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(summary, request_id, elapsed)))
}
