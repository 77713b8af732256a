use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the integrity engine
#[derive(Error, Debug)]
pub enum PickguardError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Input errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid parlay: {0}")]
    InvalidParlay(String),

    #[error(
        "No unit value available for creator {creator_id}: \
         supply unit_value or set a default in account settings"
    )]
    MissingUnitValue { creator_id: Uuid },

    // Lock / authorization errors
    #[error(
        "Pick {pick_id} locked at game start {game_start_time}; \
         fields {fields:?} can no longer be edited"
    )]
    Locked {
        pick_id: Uuid,
        game_start_time: DateTime<Utc>,
        fields: Vec<String>,
    },

    #[error("Pick {pick_id} is locked; admin edits require a non-empty reason")]
    ReasonRequired { pick_id: Uuid },

    #[error("Actor {actor_id} may not modify pick {pick_id}")]
    AccessDenied { actor_id: Uuid, pick_id: Uuid },

    #[error("Not found: {0}")]
    NotFound(String),

    // Ledger errors
    #[error("Ledger chain invalid for {resource_id} at sequence {sequence}: {reason}")]
    ChainInvalid {
        resource_id: Uuid,
        sequence: i64,
        reason: String,
    },

    #[error("Ledger sequence {sequence} already taken for {resource_id}")]
    SequenceConflict { resource_id: Uuid, sequence: i64 },

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PickguardError {
    /// Short machine-readable tag used by the HTTP layer and grading reports
    pub fn kind(&self) -> &'static str {
        match self {
            PickguardError::Config(_) => "config",
            PickguardError::Database(_) | PickguardError::Migration(_) => "database",
            PickguardError::Http(_) => "http",
            PickguardError::Json(_) => "json",
            PickguardError::Validation(_) => "validation_error",
            PickguardError::InvalidOdds(_) => "invalid_odds",
            PickguardError::InvalidParlay(_) => "invalid_parlay",
            PickguardError::MissingUnitValue { .. } => "missing_unit_value",
            PickguardError::Locked { .. } => "locked",
            PickguardError::ReasonRequired { .. } => "reason_required",
            PickguardError::AccessDenied { .. } => "access_denied",
            PickguardError::NotFound(_) => "not_found",
            PickguardError::ChainInvalid { .. } => "chain_invalid",
            PickguardError::SequenceConflict { .. } => "sequence_conflict",
            PickguardError::InvalidStateTransition { .. } => "invalid_state_transition",
            PickguardError::Io(_) => "io",
            PickguardError::Internal(_) | PickguardError::Other(_) => "internal",
        }
    }

    /// Caller-correctable input or authorization failures (never retried)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PickguardError::Validation(_)
                | PickguardError::InvalidOdds(_)
                | PickguardError::InvalidParlay(_)
                | PickguardError::MissingUnitValue { .. }
                | PickguardError::Locked { .. }
                | PickguardError::ReasonRequired { .. }
                | PickguardError::AccessDenied { .. }
                | PickguardError::NotFound(_)
                | PickguardError::InvalidStateTransition { .. }
        )
    }
}

/// Result type alias for PickguardError
pub type Result<T> = std::result::Result<T, PickguardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_message_names_fields() {
        let err = PickguardError::Locked {
            pick_id: Uuid::nil(),
            game_start_time: Utc::now(),
            fields: vec!["odds_american".to_string()],
        };
        assert!(err.to_string().contains("odds_american"));
        assert_eq!(err.kind(), "locked");
        assert!(err.is_client_error());
    }

    #[test]
    fn chain_invalid_is_not_client_error() {
        let err = PickguardError::ChainInvalid {
            resource_id: Uuid::nil(),
            sequence: 3,
            reason: "hash mismatch".into(),
        };
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("sequence 3"));
    }
}
