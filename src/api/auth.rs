use axum::http::HeaderMap;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::domain::Actor;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Identity forwarded by the upstream gateway.
///
/// Sessions live outside this service; the gateway authenticates the caller and
/// passes the user id and role along.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let raw_id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;

    let id = Uuid::parse_str(raw_id)
        .map_err(|_| ApiError::unauthorized(format!("{ACTOR_ID_HEADER} is not a UUID")))?;

    let is_admin = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|role| role.trim().eq_ignore_ascii_case("admin"))
        .unwrap_or(false);

    Ok(Actor { id, is_admin })
}

pub fn ensure_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ApiError::new(
            axum::http::StatusCode::FORBIDDEN,
            "access_denied",
            "admin role required",
        ))
    }
}
