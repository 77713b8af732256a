use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState, types::TransparencyQuery};
use crate::domain::{CreatorStats, TransparencyScore};

/// GET /api/creators/:id/stats
pub async fn get_creator_stats(
    State(state): State<AppState>,
    Path(creator_id): Path<Uuid>,
) -> std::result::Result<Json<CreatorStats>, ApiError> {
    Ok(Json(state.engine.get_creator_stats(creator_id).await?))
}

/// GET /api/creators/:id/transparency?force=true
pub async fn get_transparency_score(
    State(state): State<AppState>,
    Path(creator_id): Path<Uuid>,
    Query(query): Query<TransparencyQuery>,
) -> std::result::Result<Json<TransparencyScore>, ApiError> {
    let score = state
        .engine
        .get_transparency_score(creator_id, query.force)
        .await?;
    Ok(Json(score))
}
