use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::api::{
    auth::{actor_from_headers, ensure_admin},
    error::ApiError,
    state::AppState,
    types::*,
};
use crate::domain::{LedgerProof, Pick};

/// POST /api/picks
pub async fn create_pick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePickBody>,
) -> std::result::Result<(StatusCode, Json<Pick>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let pick = state
        .engine
        .create_pick(actor.id, body.storefront_id, body.pick)
        .await?;
    Ok((StatusCode::CREATED, Json(pick)))
}

/// GET /api/picks/:id
pub async fn get_pick(
    State(state): State<AppState>,
    Path(pick_id): Path<Uuid>,
) -> std::result::Result<Json<Pick>, ApiError> {
    Ok(Json(state.engine.get_pick(pick_id).await?))
}

/// PATCH /api/picks/:id
pub async fn update_pick(
    State(state): State<AppState>,
    Path(pick_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdatePickBody>,
) -> std::result::Result<Json<Pick>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let pick = state
        .engine
        .update_pick(pick_id, actor, body.changes, body.reason)
        .await?;
    Ok(Json(pick))
}

/// DELETE /api/picks/:id
pub async fn delete_pick(
    State(state): State<AppState>,
    Path(pick_id): Path<Uuid>,
    headers: HeaderMap,
) -> std::result::Result<StatusCode, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state.engine.delete_pick(pick_id, actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/picks/:id/dispute (admin only)
pub async fn dispute_pick(
    State(state): State<AppState>,
    Path(pick_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<DisputeBody>,
) -> std::result::Result<Json<Pick>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    ensure_admin(&actor)?;
    let pick = state
        .engine
        .dispute_pick(pick_id, actor, &body.reason)
        .await?;
    Ok(Json(pick))
}

/// GET /api/picks/:id/ledger
pub async fn get_ledger_proof(
    State(state): State<AppState>,
    Path(pick_id): Path<Uuid>,
) -> std::result::Result<Json<LedgerProof>, ApiError> {
    Ok(Json(state.engine.get_ledger_proof(pick_id).await?))
}
