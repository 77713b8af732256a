//! Fraud heuristics over posting behaviour
//!
//! Each detector is a pure function returning a structured finding. The
//! combined score only ever informs: it never blocks creating or grading a pick.

pub mod edit_lock;
pub mod odds_mismatch;
pub mod outlier;
pub mod timing;

pub use edit_lock::detect_edit_after_lock;
pub use odds_mismatch::detect_odds_mismatch;
pub use outlier::detect_outlier;
pub use timing::{detect_timing, is_late_post};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::config::FraudConfig;
use crate::domain::{FraudAssessment, Pick, UnitsBaseline};

/// Runs every detector with one injected policy
#[derive(Debug, Clone, Default)]
pub struct FraudHeuristics {
    config: FraudConfig,
}

impl FraudHeuristics {
    pub fn new(config: FraudConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    /// Score `pick` against the creator's history.
    ///
    /// `baseline` excludes the pick's own stake; `recent` is the creator's latest
    /// picks, newest first.
    pub fn assess(
        &self,
        pick: &Pick,
        baseline: &UnitsBaseline,
        recent: &[Pick],
        now: DateTime<Utc>,
    ) -> FraudAssessment {
        let config = &self.config;
        let units = pick.units_risked.to_f64().unwrap_or_default();

        let outlier_units = detect_outlier(units, baseline, config);
        let timing = detect_timing(pick, recent, config);
        let odds_mismatch =
            detect_odds_mismatch(pick.odds_decimal, pick.market_odds_american, config);
        let edit_after_lock = detect_edit_after_lock(pick);

        let mut score = 0;
        let mut flags = Vec::new();

        if let Some(severity) = outlier_units.severity.filter(|_| outlier_units.is_outlier) {
            score += severity.weight();
            flags.push(format!("outlier_units:{}", severity.as_str()));
        }
        if let Some(severity) = timing.severity.filter(|_| timing.is_suspicious) {
            score += severity.weight();
            if timing.is_pattern {
                flags.push(format!("timing_pattern:{}", severity.as_str()));
            } else {
                flags.push(format!("suspicious_timing:{}", severity.as_str()));
            }
        }
        if odds_mismatch.is_mismatch {
            score += config.odds_mismatch_weight;
            flags.push("odds_mismatch".to_string());
        }
        if edit_after_lock.detected {
            score += config.edit_after_lock_weight;
            flags.push("edit_after_lock".to_string());
        }

        let assessment = FraudAssessment {
            outlier_units,
            timing,
            odds_mismatch,
            edit_after_lock,
            score,
            should_flag: score >= config.flag_threshold,
            should_exclude_from_leaderboards: score >= config.exclude_threshold,
            flags,
            assessed_at: now,
        };

        debug!(
            pick_id = %pick.id,
            score = assessment.score,
            flags = ?assessment.flags,
            "Fraud assessment computed"
        );
        assessment
    }
}
