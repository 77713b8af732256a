use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::api::types::ErrorBody;
use crate::error::PickguardError;

/// Error returned by every handler: a status plus a `{error, message}` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }
}

pub fn status_for(err: &PickguardError) -> StatusCode {
    match err {
        PickguardError::Validation(_)
        | PickguardError::InvalidOdds(_)
        | PickguardError::InvalidParlay(_)
        | PickguardError::MissingUnitValue { .. }
        | PickguardError::ReasonRequired { .. } => StatusCode::BAD_REQUEST,
        PickguardError::AccessDenied { .. } => StatusCode::FORBIDDEN,
        PickguardError::NotFound(_) => StatusCode::NOT_FOUND,
        PickguardError::InvalidStateTransition { .. } | PickguardError::SequenceConflict { .. } => {
            StatusCode::CONFLICT
        }
        PickguardError::Locked { .. } => StatusCode::LOCKED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PickguardError> for ApiError {
    fn from(err: PickguardError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(error = %err, kind = err.kind(), "Request failed");
        }
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
