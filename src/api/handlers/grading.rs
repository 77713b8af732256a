use axum::{extract::State, http::HeaderMap, Json};
use std::time::Duration;

use crate::api::{
    auth::{actor_from_headers, ensure_admin},
    error::ApiError,
    state::AppState,
    types::GradingRunBody,
};
use crate::grading::GradingReport;

/// POST /api/grading/run (admin only)
pub async fn run_grading(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GradingRunBody>,
) -> std::result::Result<Json<GradingReport>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    ensure_admin(&actor)?;

    if body.timeout_secs == Some(0) {
        return Err(ApiError::bad_request("timeout_secs must be positive"));
    }

    let report = state
        .engine
        .run_grading(body.scope, body.timeout_secs.map(Duration::from_secs))
        .await?;
    Ok(Json(report))
}
