use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Finding severity, weighted 1/2/3 in the fraud score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierFinding {
    pub is_outlier: bool,
    pub z_score: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingFinding {
    pub is_suspicious: bool,
    /// Seconds between posting and game start
    pub lead_seconds: i64,
    /// Late posts among the creator's recent picks
    pub recent_late_posts: usize,
    pub is_pattern: bool,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsMismatchFinding {
    pub is_mismatch: bool,
    pub posted_decimal: Decimal,
    pub market_decimal: Option<Decimal>,
    /// |posted - market| / market
    pub deviation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditAfterLockFinding {
    pub detected: bool,
    pub post_lock_edits: usize,
}

/// Combined heuristic result attached to a pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub outlier_units: OutlierFinding,
    pub timing: TimingFinding,
    pub odds_mismatch: OddsMismatchFinding,
    pub edit_after_lock: EditAfterLockFinding,
    pub score: u32,
    pub flags: Vec<String>,
    pub should_flag: bool,
    pub should_exclude_from_leaderboards: bool,
    pub assessed_at: DateTime<Utc>,
}
