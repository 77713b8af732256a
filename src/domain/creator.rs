use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Running mean/variance of a creator's `units_risked` (Welford).
///
/// Updated on every create, units edit and delete so the outlier detector never
/// has to rescan a creator's full history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitsBaseline {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

impl UnitsBaseline {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut baseline = Self::default();
        for value in values {
            baseline.add(value);
        }
        baseline
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Inverse of `add`; used when a pick is deleted or its stake edited
    pub fn remove(&mut self, value: f64) {
        match self.count {
            0 => {}
            1 => *self = Self::default(),
            _ => {
                let remaining = (self.count - 1) as f64;
                let delta = value - self.mean;
                let new_mean = self.mean - delta / remaining;
                self.m2 -= delta * (value - new_mean);
                if self.m2 < 0.0 {
                    self.m2 = 0.0;
                }
                self.mean = new_mean;
                self.count -= 1;
            }
        }
    }

    /// Baseline with one observation taken out, leaving `self` untouched
    pub fn without(&self, value: f64) -> Self {
        let mut copy = *self;
        copy.remove(value);
        copy
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).sqrt())
    }
}

/// Aggregate performance numbers for a creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorStats {
    pub creator_id: Uuid,
    pub total_picks: u64,
    pub verified_picks: u64,
    pub graded_picks: u64,
    pub wins: u64,
    pub losses: u64,
    pub pushes: u64,
    pub units_risked: Decimal,
    pub units_won: Decimal,
    pub win_rate: f64,
    pub roi: f64,
}

/// One weighted input to the transparency score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// Component value in 0..=1
    pub value: f64,
    pub weight: f64,
    /// `value * weight`
    pub weighted: f64,
}

impl ScoreComponent {
    pub fn new(value: f64, weight: f64) -> Self {
        let value = value.clamp(0.0, 1.0);
        Self {
            value,
            weight,
            weighted: value * weight,
        }
    }

    pub fn zero(weight: f64) -> Self {
        Self {
            value: 0.0,
            weight,
            weighted: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransparencyBreakdown {
    pub verified_rate: ScoreComponent,
    pub win_consistency: ScoreComponent,
    pub clv: ScoreComponent,
    pub edit_penalty: ScoreComponent,
    pub complaint_score: ScoreComponent,
}

impl TransparencyBreakdown {
    pub fn weighted_sum(&self) -> f64 {
        self.verified_rate.weighted
            + self.win_consistency.weighted
            + self.clv.weighted
            + self.edit_penalty.weighted
            + self.complaint_score.weighted
    }
}

/// Cached 0..=100 reputation score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyScore {
    pub creator_id: Uuid,
    pub score: u32,
    pub breakdown: TransparencyBreakdown,
    pub computed_at: DateTime<Utc>,
    /// Set when a grading run touched the creator after `computed_at`
    #[serde(default)]
    pub stale: bool,
}
