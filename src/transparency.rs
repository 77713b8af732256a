//! Creator transparency score.
//!
//! A weighted 0-100 composite of verification rate, win consistency, closing
//! line value, post-lock edits and complaints. Scores are cached and reused
//! until they age past the freshness window or a grading run marks them stale.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::adapters::CreatorDirectory;
use crate::clock::Clock;
use crate::config::TransparencyConfig;
use crate::domain::{
    Pick, PickResult, ScoreComponent, TransparencyBreakdown, TransparencyScore,
};
use crate::error::Result;
use crate::odds::MAX_CLV;
use crate::persistence::PickStore;

pub struct TransparencyService {
    store: Arc<dyn PickStore>,
    directory: Arc<dyn CreatorDirectory>,
    clock: Arc<dyn Clock>,
    config: TransparencyConfig,
}

impl TransparencyService {
    pub fn new(
        store: Arc<dyn PickStore>,
        directory: Arc<dyn CreatorDirectory>,
        clock: Arc<dyn Clock>,
        config: TransparencyConfig,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            config,
        }
    }

    /// Cached score when fresh, otherwise a recomputation that refreshes the cache
    #[instrument(skip(self))]
    pub async fn get(&self, creator_id: Uuid, force_recalc: bool) -> Result<TransparencyScore> {
        let now = self.clock.now();

        if !force_recalc {
            if let Some(cached) = self.store.cached_score(creator_id).await? {
                if self.is_fresh(&cached, now) {
                    debug!(%creator_id, score = cached.score, "Using cached transparency score");
                    return Ok(cached);
                }
            }
        }

        let score = self.compute(creator_id, now).await?;
        self.store.save_score(&score).await?;
        info!(%creator_id, score = score.score, "Transparency score recomputed");
        Ok(score)
    }

    /// Invalidate the cached score; the next read recomputes
    pub async fn mark_stale(&self, creator_id: Uuid) -> Result<()> {
        self.store.mark_score_stale(creator_id).await
    }

    fn is_fresh(&self, cached: &TransparencyScore, now: DateTime<Utc>) -> bool {
        !cached.stale && now - cached.computed_at < Duration::hours(self.config.freshness_hours)
    }

    async fn compute(&self, creator_id: Uuid, now: DateTime<Utc>) -> Result<TransparencyScore> {
        let picks = self.store.creator_picks(creator_id).await?;
        let subscriptions = self.directory.subscription_count(creator_id).await?;
        let complaints = self.directory.complaint_count(creator_id).await?;

        let breakdown = score_breakdown(&picks, subscriptions, complaints, &self.config);
        Ok(TransparencyScore {
            creator_id,
            score: final_score(&breakdown),
            breakdown,
            computed_at: now,
            stale: false,
        })
    }
}

/// Component values for a creator's picks
pub fn score_breakdown(
    picks: &[Pick],
    subscriptions: u64,
    complaints: u64,
    config: &TransparencyConfig,
) -> TransparencyBreakdown {
    if picks.is_empty() {
        return TransparencyBreakdown {
            verified_rate: ScoreComponent::zero(config.verified_weight),
            win_consistency: ScoreComponent::zero(config.win_consistency_weight),
            clv: ScoreComponent::zero(config.clv_weight),
            edit_penalty: ScoreComponent::zero(config.edit_penalty_weight),
            complaint_score: ScoreComponent::zero(config.complaint_weight),
        };
    }

    let total = picks.len() as f64;
    let verified = picks.iter().filter(|p| p.is_verified).count() as f64;

    let (wins, losses) = picks
        .iter()
        .filter(|p| p.is_graded())
        .fold((0u64, 0u64), |(w, l), p| match p.result {
            PickResult::Win => (w + 1, l),
            PickResult::Loss => (w, l + 1),
            _ => (w, l),
        });
    let win_consistency = if wins + losses > 0 {
        wins as f64 / (wins + losses) as f64
    } else {
        0.0
    };

    let clvs: Vec<f64> = picks.iter().filter_map(|p| p.clv).collect();
    let clv = if clvs.is_empty() {
        0.0
    } else {
        let mean = clvs.iter().sum::<f64>() / clvs.len() as f64;
        mean.clamp(-MAX_CLV, MAX_CLV) + MAX_CLV
    };

    let edited_after_lock = picks
        .iter()
        .filter(|p| p.has_post_lock_non_admin_edit())
        .count() as f64;

    let complaint_score = if subscriptions == 0 {
        if complaints == 0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - (complaints as f64 / subscriptions as f64).min(1.0)
    };

    TransparencyBreakdown {
        verified_rate: ScoreComponent::new(verified / total, config.verified_weight),
        win_consistency: ScoreComponent::new(win_consistency, config.win_consistency_weight),
        clv: ScoreComponent::new(clv, config.clv_weight),
        edit_penalty: ScoreComponent::new(
            1.0 - edited_after_lock / total,
            config.edit_penalty_weight,
        ),
        complaint_score: ScoreComponent::new(complaint_score, config.complaint_weight),
    }
}

/// `round(sum * 100)` clamped to 0..=100
pub fn final_score(breakdown: &TransparencyBreakdown) -> u32 {
    (breakdown.weighted_sum() * 100.0).round().clamp(0.0, 100.0) as u32
}
