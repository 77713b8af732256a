//! Batch grading of pending picks.
//!
//! Resolves finished games through the sports-data provider, grades each pick,
//! re-runs fraud heuristics and invalidates the creator's transparency score.
//! One failing pick never aborts the batch.

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::SportsDataProvider;
use crate::clock::Clock;
use crate::config::GradingConfig;
use crate::domain::{GradingScope, Pick, PickResult};
use crate::error::Result;
use crate::lifecycle::{GradeOutcome, PickLifecycle};
use crate::persistence::PickStore;
use crate::transparency::TransparencyService;

pub const SKIP_NOT_FINAL: &str = "game not finished";
pub const SKIP_ALREADY_GRADED: &str = "already graded";
pub const SKIP_DEADLINE: &str = "deadline reached";

/// What happened to one pick in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PickGradeStatus {
    Graded {
        result: PickResult,
        fraud_score: Option<u32>,
    },
    Skipped {
        reason: String,
    },
    Errored {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickGradeOutcome {
    pub pick_id: Uuid,
    pub creator_id: Uuid,
    #[serde(flatten)]
    pub status: PickGradeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    pub scope: GradingScope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub graded: usize,
    pub skipped: usize,
    pub errored: usize,
    pub outcomes: Vec<PickGradeOutcome>,
}

impl GradingReport {
    fn tally(
        scope: GradingScope,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcomes: Vec<PickGradeOutcome>,
    ) -> Self {
        let mut report = Self {
            scope,
            started_at,
            finished_at,
            graded: 0,
            skipped: 0,
            errored: 0,
            outcomes,
        };
        for outcome in &report.outcomes {
            match outcome.status {
                PickGradeStatus::Graded { .. } => report.graded += 1,
                PickGradeStatus::Skipped { .. } => report.skipped += 1,
                PickGradeStatus::Errored { .. } => report.errored += 1,
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

pub struct GradingJob {
    store: Arc<dyn PickStore>,
    lifecycle: Arc<PickLifecycle>,
    transparency: Arc<TransparencyService>,
    provider: Arc<dyn SportsDataProvider>,
    clock: Arc<dyn Clock>,
    config: GradingConfig,
}

impl GradingJob {
    pub fn new(
        store: Arc<dyn PickStore>,
        lifecycle: Arc<PickLifecycle>,
        transparency: Arc<TransparencyService>,
        provider: Arc<dyn SportsDataProvider>,
        clock: Arc<dyn Clock>,
        config: GradingConfig,
    ) -> Self {
        Self {
            store,
            lifecycle,
            transparency,
            provider,
            clock,
            config,
        }
    }

    /// Grade every pending pick in `scope` whose game has started.
    ///
    /// Once `timeout` elapses no new pick is started; picks still waiting are
    /// reported as skipped while in-flight ones finish.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        scope: GradingScope,
        timeout: Option<Duration>,
    ) -> Result<GradingReport> {
        let started_at = self.clock.now();
        let timeout = timeout.or(self.config.timeout_secs.map(Duration::from_secs));
        let deadline = timeout.map(|t| Instant::now() + t);

        let pending = self.store.pending_picks(&scope, started_at).await?;
        info!(picks = pending.len(), "Grading run started");

        let concurrency = self.config.max_concurrency.max(1);
        let outcomes: Vec<PickGradeOutcome> = stream::iter(pending)
            .map(|pick| async move {
                if deadline.map_or(false, |d| Instant::now() >= d) {
                    return outcome(&pick, skipped(SKIP_DEADLINE));
                }
                let status = self.grade_one(&pick).await;
                outcome(&pick, status)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let creators: BTreeSet<Uuid> = outcomes
            .iter()
            .filter(|o| matches!(o.status, PickGradeStatus::Graded { .. }))
            .map(|o| o.creator_id)
            .collect();
        for creator_id in creators {
            if let Err(e) = self.transparency.mark_stale(creator_id).await {
                warn!(%creator_id, error = %e, "Failed to mark transparency score stale");
            }
        }

        let report = GradingReport::tally(scope, started_at, self.clock.now(), outcomes);
        info!(
            graded = report.graded,
            skipped = report.skipped,
            errored = report.errored,
            "Grading run finished"
        );
        Ok(report)
    }

    async fn grade_one(&self, pick: &Pick) -> PickGradeStatus {
        let resolved = match self.provider.resolve_pick(pick).await {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                debug!(pick_id = %pick.id, "Game not final yet");
                return skipped(SKIP_NOT_FINAL);
            }
            Err(e) => {
                warn!(pick_id = %pick.id, error = %e, "Outcome lookup failed");
                return errored(format!("outcome lookup failed: {e}"));
            }
        };

        let graded = match self
            .lifecycle
            .grade(
                pick.id,
                resolved.result,
                resolved.score_info,
                resolved.closing_odds_american,
            )
            .await
        {
            Ok(GradeOutcome::Graded(graded)) => graded,
            Ok(GradeOutcome::AlreadyGraded(_)) => return skipped(SKIP_ALREADY_GRADED),
            Err(e) => {
                warn!(pick_id = %pick.id, error = %e, "Grading failed");
                return errored(e.to_string());
            }
        };

        let fraud_score = match self.lifecycle.reassess_fraud(&graded).await {
            Ok(assessment) => Some(assessment.score),
            Err(e) => {
                warn!(pick_id = %pick.id, error = %e, "Fraud assessment failed after grading");
                None
            }
        };

        PickGradeStatus::Graded {
            result: graded.result,
            fraud_score,
        }
    }
}

fn outcome(pick: &Pick, status: PickGradeStatus) -> PickGradeOutcome {
    PickGradeOutcome {
        pick_id: pick.id,
        creator_id: pick.creator_id,
        status,
    }
}

fn skipped(reason: &str) -> PickGradeStatus {
    PickGradeStatus::Skipped {
        reason: reason.to_string(),
    }
}

fn errored(reason: String) -> PickGradeStatus {
    PickGradeStatus::Errored { reason }
}
