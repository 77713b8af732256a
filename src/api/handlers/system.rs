use axum::{extract::State, http::StatusCode, Json};

use crate::api::{state::AppState, types::HealthResponse};

/// GET /health -- lightweight liveness/readiness probe
pub async fn health_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let db_status = match &state.db {
        Some(db) => match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(db.pool())
            .await
        {
            Ok(_) => "connected",
            Err(_) => "disconnected",
        },
        None => "memory",
    };

    let ok = db_status != "disconnected";
    let resp = HealthResponse {
        status: if ok { "ok" } else { "degraded" }.to_string(),
        db: db_status.to_string(),
        uptime_secs: state.uptime_seconds(),
    };

    if ok {
        Ok(Json(resp))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(resp)))
    }
}
