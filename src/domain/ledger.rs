use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{PickguardError, Result};

/// Mutation that produced a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Create,
    Edit,
    Grade,
    Dispute,
    Delete,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::Create => "create",
            LedgerAction::Edit => "edit",
            LedgerAction::Grade => "grade",
            LedgerAction::Dispute => "dispute",
            LedgerAction::Delete => "delete",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LedgerAction {
    type Err = PickguardError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "create" => Ok(LedgerAction::Create),
            "edit" => Ok(LedgerAction::Edit),
            "grade" => Ok(LedgerAction::Grade),
            "dispute" => Ok(LedgerAction::Dispute),
            "delete" => Ok(LedgerAction::Delete),
            other => Err(PickguardError::Validation(format!(
                "unknown ledger action '{other}'"
            ))),
        }
    }
}

/// One immutable, hash-linked snapshot of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub resource_id: Uuid,
    pub sequence: i64,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub snapshot: serde_json::Value,
    pub action: LedgerAction,
    pub created_at: DateTime<Utc>,
}

/// Outcome of walking a chain. Tampering is reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub entries: usize,
    pub first_invalid_sequence: Option<i64>,
    pub reason: Option<String>,
}

impl ChainVerification {
    pub fn valid(entries: usize) -> Self {
        Self {
            valid: true,
            entries,
            first_invalid_sequence: None,
            reason: None,
        }
    }

    pub fn invalid(entries: usize, sequence: i64, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            entries,
            first_invalid_sequence: Some(sequence),
            reason: Some(reason.into()),
        }
    }
}

/// Ledger contents for a pick plus the verification verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerProof {
    pub resource_id: Uuid,
    pub entries: Vec<LedgerEntry>,
    pub chain_valid: bool,
    pub verification: ChainVerification,
}
