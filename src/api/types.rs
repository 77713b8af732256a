use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CreatePickRequest, GradingScope, PickChanges};

// ============================================================================
// Pick Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePickBody {
    pub storefront_id: Uuid,
    #[serde(flatten)]
    pub pick: CreatePickRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePickBody {
    #[serde(flatten)]
    pub changes: PickChanges,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisputeBody {
    pub reason: String,
}

// ============================================================================
// Creator Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransparencyQuery {
    #[serde(default)]
    pub force: bool,
}

// ============================================================================
// Grading Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GradingRunBody {
    pub scope: GradingScope,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// System Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
