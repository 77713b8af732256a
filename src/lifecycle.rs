//! Pick lifecycle: creation, edits, deletion, grading and disputes.
//!
//! Status moves `pending -> graded | disputed`; `locked` is derived from the
//! clock and never stored. Every applied mutation appends exactly one ledger
//! entry, and all mutations of one pick run under that pick's lock.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{CreatorDirectory, SportsDataProvider};
use crate::clock::Clock;
use crate::config::{FraudConfig, LifecycleConfig};
use crate::domain::{
    Actor, BetType, CreatePickRequest, CreatorStats, EditRecord, FieldChange, FlagRecord,
    FraudAssessment, GameRef, LedgerAction, LedgerEntry, ParlayLeg, ParlayLegInput, Pick,
    PickChanges, PickResult, PickStatus, ScoreInfo, VerificationSource,
};
use crate::error::{PickguardError, Result};
use crate::fraud::FraudHeuristics;
use crate::ledger::{Ledger, ResourceLocks};
use crate::odds::{
    american_to_decimal, closing_line_value, combine_parlay_odds, validate_american_odds,
};
use crate::persistence::{PickStore, PickWrite};
use crate::validation::{
    optional_text, require_text, validate_amount, validate_future_start, validate_game,
    validate_leg, validate_units,
};

/// Fields compared when diffing an update
const TRACKED_FIELDS: [&str; 12] = [
    "sport",
    "league",
    "game",
    "bet_type",
    "selection",
    "odds_american",
    "odds_decimal",
    "units_risked",
    "amount_risked",
    "game_start_time",
    "publish_at",
    "legs",
];

/// Result of a grade call
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    /// Result assigned and a grade entry appended
    Graded(Pick),
    /// Pick was graded before; nothing written
    AlreadyGraded(Pick),
}

impl GradeOutcome {
    pub fn pick(&self) -> &Pick {
        match self {
            GradeOutcome::Graded(pick) | GradeOutcome::AlreadyGraded(pick) => pick,
        }
    }

    pub fn into_pick(self) -> Pick {
        match self {
            GradeOutcome::Graded(pick) | GradeOutcome::AlreadyGraded(pick) => pick,
        }
    }

    pub fn was_graded(&self) -> bool {
        matches!(self, GradeOutcome::Graded(_))
    }
}

/// Result of one update attempt
enum EditOutcome {
    Unchanged(Pick),
    Applied { before: Pick, after: Pick },
}

/// Odds and start time derived from legs or straight-bet input
struct PricedWager {
    odds_american: i64,
    odds_decimal: Decimal,
    game_start_time: DateTime<Utc>,
    legs: Vec<ParlayLeg>,
}

pub struct PickLifecycle {
    store: Arc<dyn PickStore>,
    directory: Arc<dyn CreatorDirectory>,
    sports_data: Option<Arc<dyn SportsDataProvider>>,
    ledger: Ledger,
    locks: Arc<ResourceLocks>,
    clock: Arc<dyn Clock>,
    fraud: FraudHeuristics,
    config: LifecycleConfig,
}

impl PickLifecycle {
    pub fn new(
        store: Arc<dyn PickStore>,
        directory: Arc<dyn CreatorDirectory>,
        ledger: Ledger,
        clock: Arc<dyn Clock>,
        fraud: FraudConfig,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            directory,
            sports_data: None,
            ledger,
            locks: Arc::new(ResourceLocks::new()),
            clock,
            fraud: FraudHeuristics::new(fraud),
            config,
        }
    }

    /// Look up market odds at post time when the request does not carry them
    pub fn with_sports_data(mut self, provider: Arc<dyn SportsDataProvider>) -> Self {
        self.sports_data = Some(provider);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn fraud(&self) -> &FraudHeuristics {
        &self.fraud
    }

    // ==================== Create ====================

    #[instrument(skip(self, request), fields(pick_id))]
    pub async fn create(
        &self,
        creator_id: Uuid,
        storefront_id: Uuid,
        request: CreatePickRequest,
    ) -> Result<Pick> {
        let now = self.clock.now();

        let sport = require_text(request.sport.as_deref(), "sport")?;
        let bet_type = request
            .bet_type
            .ok_or_else(|| PickguardError::Validation("bet_type is required".into()))?;
        let league = optional_text(request.league.as_deref());

        let priced = if bet_type == BetType::Parlay {
            price_parlay(&request.legs)?
        } else {
            if !request.legs.is_empty() {
                return Err(PickguardError::Validation(format!(
                    "legs are only accepted on parlay picks, not {}",
                    bet_type
                )));
            }
            let odds_american = request
                .odds_american
                .ok_or_else(|| PickguardError::Validation("odds_american is required".into()))?;
            validate_american_odds(odds_american)?;
            let game_start_time = request.game_start_time.ok_or_else(|| {
                PickguardError::Validation("game_start_time is required".into())
            })?;
            PricedWager {
                odds_american,
                odds_decimal: american_to_decimal(odds_american)?,
                game_start_time,
                legs: Vec::new(),
            }
        };

        let selection = match bet_type {
            BetType::Parlay => optional_text(request.selection.as_deref())
                .unwrap_or_else(|| format!("{}-leg parlay", priced.legs.len())),
            _ => require_text(request.selection.as_deref(), "selection")?,
        };
        let game = match bet_type {
            BetType::Parlay if request.game.is_empty() => GameRef::default(),
            _ => validate_game(&request.game, "game")?,
        };

        validate_future_start(priced.game_start_time, now, "game_start_time")?;

        let units_risked = request
            .units_risked
            .ok_or_else(|| PickguardError::Validation("units_risked is required".into()))?;
        validate_units(units_risked)?;

        let (amount_risked, unit_value_at_post) = self
            .resolve_stake(creator_id, units_risked, request.amount_risked, request.unit_value)
            .await?;

        let market_odds_american = match request.market_odds_american {
            Some(odds) => {
                validate_american_odds(odds)?;
                Some(odds)
            }
            None => None,
        };

        let id = Uuid::new_v4();
        tracing::Span::current().record("pick_id", tracing::field::display(id));

        let mut pick = Pick {
            id,
            creator_id,
            storefront_id,
            sport,
            league,
            game,
            bet_type,
            selection,
            odds_american: priced.odds_american,
            odds_decimal: priced.odds_decimal,
            units_risked,
            amount_risked,
            unit_value_at_post,
            legs: priced.legs,
            game_start_time: priced.game_start_time,
            created_at: now,
            updated_at: now,
            publish_at: request.publish_at,
            is_verified: now < priced.game_start_time,
            verification_source: VerificationSource::System,
            status: PickStatus::Pending,
            result: PickResult::Pending,
            profit_units: None,
            profit_amount: None,
            score_info: None,
            graded_at: None,
            clv: None,
            market_odds_american,
            edits: Vec::new(),
            flags: Vec::new(),
            fraud: None,
        };

        if pick.market_odds_american.is_none() {
            pick.market_odds_american = self.lookup_market_odds(&pick).await;
        }

        // Informational only; never blocks the create
        let units = units_as_f64(units_risked);
        let baseline = self.store.units_baseline(creator_id).await?;
        let recent = self
            .store
            .recent_creator_picks(creator_id, self.fraud.config().timing_recent_window)
            .await?;
        let assessment = self.fraud.assess(&pick, &baseline, &recent, now);
        if assessment.should_flag {
            warn!(
                %creator_id,
                score = assessment.score,
                flags = ?assessment.flags,
                "New pick raised fraud flags"
            );
        }
        pick.fraud = Some(assessment);

        {
            let _guard = self.locks.acquire(pick.id).await;
            let snapshot = pick.ledger_snapshot()?;
            self.ledger
                .append_after(
                    None,
                    pick.id,
                    snapshot,
                    LedgerAction::Create,
                    PickWrite::Upsert(&pick),
                )
                .await?;
        }

        self.adjust_baseline(creator_id, None, Some(units)).await;

        info!(
            pick_id = %pick.id,
            %creator_id,
            bet_type = %pick.bet_type,
            odds = pick.odds_american,
            "Pick created"
        );
        Ok(pick)
    }

    async fn resolve_stake(
        &self,
        creator_id: Uuid,
        units: Decimal,
        amount: Option<Decimal>,
        unit_value: Option<Decimal>,
    ) -> Result<(Decimal, Decimal)> {
        if let Some(value) = unit_value {
            validate_amount(value, "unit_value")?;
        }
        if let Some(amount) = amount {
            validate_amount(amount, "amount_risked")?;
        }

        let unit_value = match unit_value {
            Some(value) => Some(value),
            None => self.directory.default_unit_value(creator_id).await?,
        };

        match (amount, unit_value) {
            (Some(amount), Some(value)) => Ok((amount, value)),
            (Some(amount), None) => Ok((amount, amount / units)),
            (None, Some(value)) => Ok((units * value, value)),
            (None, None) => Err(PickguardError::MissingUnitValue { creator_id }),
        }
    }

    async fn lookup_market_odds(&self, pick: &Pick) -> Option<i64> {
        let provider = self.sports_data.as_ref()?;
        match provider.market_odds(pick).await {
            Ok(odds) => odds.filter(|o| validate_american_odds(*o).is_ok()),
            Err(e) => {
                warn!(pick_id = %pick.id, error = %e, "Market odds lookup failed");
                None
            }
        }
    }

    // ==================== Update ====================

    #[instrument(
        skip(self, changes, reason),
        fields(actor_id = %actor.id, is_admin = actor.is_admin)
    )]
    pub async fn update(
        &self,
        pick_id: Uuid,
        actor: Actor,
        changes: PickChanges,
        reason: Option<String>,
    ) -> Result<Pick> {
        let _guard = self.locks.acquire(pick_id).await;
        let reason = optional_text(reason.as_deref());

        let outcome = self
            .ledger
            .retry_on_conflict(pick_id, move |tail| {
                self.update_attempt(pick_id, actor, changes.clone(), reason.clone(), tail)
            })
            .await?;

        match outcome {
            EditOutcome::Unchanged(pick) => Ok(pick),
            EditOutcome::Applied { before, after } => {
                if before.units_risked != after.units_risked {
                    self.adjust_baseline(
                        after.creator_id,
                        Some(units_as_f64(before.units_risked)),
                        Some(units_as_f64(after.units_risked)),
                    )
                    .await;
                }
                info!(%pick_id, edits = after.edits.len(), "Pick updated");
                Ok(after)
            }
        }
    }

    async fn update_attempt(
        &self,
        pick_id: Uuid,
        actor: Actor,
        changes: PickChanges,
        reason: Option<String>,
        tail: Option<LedgerEntry>,
    ) -> Result<EditOutcome> {
        let original = self.load(pick_id).await?;
        let now = self.clock.now();

        let is_owner = original.creator_id == actor.id;
        if !is_owner && !actor.is_admin {
            return Err(PickguardError::AccessDenied {
                actor_id: actor.id,
                pick_id,
            });
        }

        let touched = changes.touched_fields();
        if touched.is_empty() {
            return Ok(EditOutcome::Unchanged(original));
        }

        let locked = original.is_locked(now);
        if locked {
            if !actor.is_admin {
                return Err(PickguardError::Locked {
                    pick_id,
                    game_start_time: original.game_start_time,
                    fields: touched,
                });
            }
            if reason.is_none() {
                return Err(PickguardError::ReasonRequired { pick_id });
            }
        }

        let mut updated = original.clone();
        apply_changes(&mut updated, &changes, locked, now)?;

        let diff = diff_fields(&original, &updated)?;
        if diff.is_empty() {
            debug!(%pick_id, "Update carried no effective change");
            return Ok(EditOutcome::Unchanged(original));
        }

        updated.updated_at = now;
        updated.edits.push(EditRecord {
            editor_id: actor.id,
            edited_at: now,
            changes: diff,
            reason: reason.clone(),
            is_admin_edit: actor.is_admin,
        });

        if locked {
            updated.is_verified = false;
            updated.verification_source = VerificationSource::Manual;
            updated.flags.push(FlagRecord {
                reason: format!(
                    "admin edit after lock: {}",
                    reason.as_deref().unwrap_or_default()
                ),
                flagged_by: Some(actor.id),
                flagged_at: now,
            });
            warn!(%pick_id, admin_id = %actor.id, "Locked pick edited by admin");
        }

        let snapshot = updated.ledger_snapshot()?;
        self.ledger
            .append_after(
                tail.as_ref(),
                pick_id,
                snapshot,
                LedgerAction::Edit,
                PickWrite::Upsert(&updated),
            )
            .await?;

        Ok(EditOutcome::Applied {
            before: original,
            after: updated,
        })
    }

    // ==================== Delete ====================

    #[instrument(skip(self))]
    pub async fn delete(&self, pick_id: Uuid, actor_id: Uuid) -> Result<()> {
        let pick = {
            let _guard = self.locks.acquire(pick_id).await;
            self.ledger
                .retry_on_conflict(pick_id, move |tail| {
                    self.delete_attempt(pick_id, actor_id, tail)
                })
                .await?
        };

        self.adjust_baseline(pick.creator_id, Some(units_as_f64(pick.units_risked)), None)
            .await;

        info!(%pick_id, creator_id = %pick.creator_id, "Pick deleted");
        Ok(())
    }

    async fn delete_attempt(
        &self,
        pick_id: Uuid,
        actor_id: Uuid,
        tail: Option<LedgerEntry>,
    ) -> Result<Pick> {
        let pick = self.load(pick_id).await?;
        let now = self.clock.now();

        if pick.creator_id != actor_id {
            return Err(PickguardError::AccessDenied { actor_id, pick_id });
        }
        if self.config.block_delete_after_lock && pick.is_locked(now) {
            return Err(PickguardError::Locked {
                pick_id,
                game_start_time: pick.game_start_time,
                fields: vec!["pick".to_string()],
            });
        }

        let mut tombstone = pick.ledger_snapshot()?;
        if let Some(object) = tombstone.as_object_mut() {
            object.insert("deleted_at".into(), serde_json::to_value(now)?);
            object.insert("deleted_by".into(), Value::String(actor_id.to_string()));
        }

        self.ledger
            .append_after(
                tail.as_ref(),
                pick_id,
                tombstone,
                LedgerAction::Delete,
                PickWrite::Delete(pick_id),
            )
            .await?;
        Ok(pick)
    }

    // ==================== Grade ====================

    /// Assign a final result. Idempotent: a graded pick is returned unchanged.
    ///
    /// The graded check is repeated on every attempt, so a writer that lost the
    /// append race sees the winner's result instead of grading twice.
    #[instrument(skip(self, score_info))]
    pub async fn grade(
        &self,
        pick_id: Uuid,
        result: PickResult,
        score_info: Option<ScoreInfo>,
        closing_odds_american: Option<i64>,
    ) -> Result<GradeOutcome> {
        if result == PickResult::Pending {
            return Err(PickguardError::Validation(
                "pending is not a gradable result".into(),
            ));
        }

        let _guard = self.locks.acquire(pick_id).await;
        self.ledger
            .retry_on_conflict(pick_id, move |tail| {
                self.grade_attempt(
                    pick_id,
                    result,
                    score_info.clone(),
                    closing_odds_american,
                    tail,
                )
            })
            .await
    }

    async fn grade_attempt(
        &self,
        pick_id: Uuid,
        result: PickResult,
        score_info: Option<ScoreInfo>,
        closing_odds_american: Option<i64>,
        tail: Option<LedgerEntry>,
    ) -> Result<GradeOutcome> {
        let mut pick = self.load(pick_id).await?;
        let now = self.clock.now();

        match pick.status {
            PickStatus::Graded => {
                debug!(%pick_id, result = %pick.result, "Pick already graded");
                return Ok(GradeOutcome::AlreadyGraded(pick));
            }
            PickStatus::Disputed => {
                return Err(PickguardError::InvalidStateTransition {
                    from: PickStatus::Disputed.to_string(),
                    to: PickStatus::Graded.to_string(),
                })
            }
            PickStatus::Pending | PickStatus::Locked => {}
        }

        if !pick.is_locked(now) {
            return Err(PickguardError::InvalidStateTransition {
                from: PickStatus::Pending.to_string(),
                to: PickStatus::Graded.to_string(),
            });
        }

        let profit_units = profit_units(result, pick.units_risked, pick.odds_decimal);
        let profit_amount = (profit_units * pick.unit_value_at_post)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        pick.clv = match closing_odds_american {
            Some(closing) => match closing_line_value(pick.odds_decimal, closing) {
                Ok(clv) => Some(clv),
                Err(e) => {
                    warn!(%pick_id, closing, error = %e, "Ignoring unusable closing odds");
                    None
                }
            },
            None => None,
        };
        pick.status = PickStatus::Graded;
        pick.result = result;
        pick.profit_units = Some(profit_units);
        pick.profit_amount = Some(profit_amount);
        pick.score_info = score_info;
        pick.graded_at = Some(now);
        pick.updated_at = now;

        let snapshot = pick.ledger_snapshot()?;
        self.ledger
            .append_after(
                tail.as_ref(),
                pick_id,
                snapshot,
                LedgerAction::Grade,
                PickWrite::Upsert(&pick),
            )
            .await?;

        info!(%pick_id, result = %result, profit_units = %profit_units, "Pick graded");
        Ok(GradeOutcome::Graded(pick))
    }

    // ==================== Dispute ====================

    /// Move a pending or graded pick to `disputed` on behalf of the dispute desk
    #[instrument(skip(self, reason), fields(actor_id = %actor.id))]
    pub async fn dispute(&self, pick_id: Uuid, actor: Actor, reason: &str) -> Result<Pick> {
        if !actor.is_admin {
            return Err(PickguardError::AccessDenied {
                actor_id: actor.id,
                pick_id,
            });
        }
        let reason = require_text(Some(reason), "reason")?;

        let _guard = self.locks.acquire(pick_id).await;
        let pick = self
            .ledger
            .retry_on_conflict(pick_id, move |tail| {
                self.dispute_attempt(pick_id, actor, reason.clone(), tail)
            })
            .await?;

        info!(%pick_id, "Pick disputed");
        Ok(pick)
    }

    async fn dispute_attempt(
        &self,
        pick_id: Uuid,
        actor: Actor,
        reason: String,
        tail: Option<LedgerEntry>,
    ) -> Result<Pick> {
        let mut pick = self.load(pick_id).await?;
        let now = self.clock.now();

        if pick.status == PickStatus::Disputed {
            return Err(PickguardError::InvalidStateTransition {
                from: PickStatus::Disputed.to_string(),
                to: PickStatus::Disputed.to_string(),
            });
        }

        pick.status = PickStatus::Disputed;
        pick.updated_at = now;
        pick.flags.push(FlagRecord {
            reason: format!("disputed: {reason}"),
            flagged_by: Some(actor.id),
            flagged_at: now,
        });

        let snapshot = pick.ledger_snapshot()?;
        self.ledger
            .append_after(
                tail.as_ref(),
                pick_id,
                snapshot,
                LedgerAction::Dispute,
                PickWrite::Upsert(&pick),
            )
            .await?;
        Ok(pick)
    }

    // ==================== Reads ====================

    pub async fn get_pick(&self, pick_id: Uuid) -> Result<Pick> {
        self.load(pick_id).await
    }

    pub async fn creator_stats(&self, creator_id: Uuid) -> Result<CreatorStats> {
        let picks = self.store.creator_picks(creator_id).await?;
        Ok(compute_stats(creator_id, &picks))
    }

    /// Re-run the heuristics for a stored pick and persist the assessment
    pub async fn reassess_fraud(&self, pick: &Pick) -> Result<FraudAssessment> {
        let baseline = self
            .store
            .units_baseline(pick.creator_id)
            .await?
            .without(units_as_f64(pick.units_risked));
        let recent = self
            .store
            .recent_creator_picks(pick.creator_id, self.fraud.config().timing_recent_window + 1)
            .await?;

        let assessment = self.fraud.assess(pick, &baseline, &recent, self.clock.now());
        self.store.save_fraud(pick.id, &assessment).await?;
        Ok(assessment)
    }

    async fn load(&self, pick_id: Uuid) -> Result<Pick> {
        self.store
            .get_pick(pick_id)
            .await?
            .ok_or_else(|| PickguardError::NotFound(format!("pick {pick_id}")))
    }

    /// Fold a units change into the creator's outlier baseline.
    ///
    /// Runs after the mutation committed, so a failure is logged rather than
    /// reported as a failed mutation.
    async fn adjust_baseline(&self, creator_id: Uuid, remove: Option<f64>, add: Option<f64>) {
        if let Err(e) = self.write_baseline(creator_id, remove, add).await {
            warn!(%creator_id, error = %e, "Units baseline update failed");
        }
    }

    async fn write_baseline(
        &self,
        creator_id: Uuid,
        remove: Option<f64>,
        add: Option<f64>,
    ) -> Result<()> {
        let _guard = self.locks.acquire(creator_id).await;
        let mut baseline = self.store.units_baseline(creator_id).await?;
        if let Some(value) = remove {
            baseline.remove(value);
        }
        if let Some(value) = add {
            baseline.add(value);
        }
        self.store.save_units_baseline(creator_id, &baseline).await
    }
}

fn units_as_f64(units: Decimal) -> f64 {
    units.to_f64().unwrap_or_default()
}

/// Win pays `units * (decimal - 1)`, loss costs the stake, push and void pay nothing
pub fn profit_units(result: PickResult, units: Decimal, odds_decimal: Decimal) -> Decimal {
    let raw = match result {
        PickResult::Win => units * (odds_decimal - Decimal::ONE),
        PickResult::Loss => -units,
        PickResult::Push | PickResult::Void | PickResult::Pending => Decimal::ZERO,
    };
    raw.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

fn price_parlay(inputs: &[ParlayLegInput]) -> Result<PricedWager> {
    if inputs.len() < 2 {
        return Err(PickguardError::InvalidParlay(format!(
            "a parlay needs at least 2 legs, got {}",
            inputs.len()
        )));
    }

    let mut legs = Vec::with_capacity(inputs.len());
    for (idx, input) in inputs.iter().enumerate() {
        validate_leg(input, idx + 1)?;
        legs.push(ParlayLeg {
            sport: input.sport.trim().to_string(),
            league: optional_text(input.league.as_deref()),
            game: validate_game(&input.game, &format!("legs[{}].game", idx + 1))?,
            bet_type: input.bet_type,
            selection: input.selection.trim().to_string(),
            odds_american: input.odds_american,
            odds_decimal: american_to_decimal(input.odds_american)?,
            game_start_time: input.game_start_time,
        });
    }

    let prices: Vec<i64> = legs.iter().map(|leg| leg.odds_american).collect();
    let combined = combine_parlay_odds(&prices)?;
    let game_start_time = legs
        .iter()
        .map(|leg| leg.game_start_time)
        .min()
        .ok_or_else(|| PickguardError::InvalidParlay("parlay has no legs".into()))?;

    Ok(PricedWager {
        odds_american: combined.american,
        odds_decimal: combined.decimal,
        game_start_time,
        legs,
    })
}

/// Apply field changes to `pick`; derived fields (decimal odds, amount, parlay
/// price) are recomputed.
fn apply_changes(
    pick: &mut Pick,
    changes: &PickChanges,
    locked: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(sport) = &changes.sport {
        pick.sport = require_text(Some(sport), "sport")?;
    }
    if let Some(league) = &changes.league {
        pick.league = optional_text(Some(league));
    }
    if let Some(game) = &changes.game {
        pick.game = validate_game(game, "game")?;
    }
    if let Some(selection) = &changes.selection {
        pick.selection = require_text(Some(selection), "selection")?;
    }
    if let Some(bet_type) = changes.bet_type {
        pick.bet_type = bet_type;
    }

    if pick.is_parlay() {
        if changes.odds_american.is_some() || changes.game_start_time.is_some() {
            return Err(PickguardError::InvalidParlay(
                "parlay odds and start time derive from their legs; edit the legs instead".into(),
            ));
        }
        if let Some(inputs) = &changes.legs {
            let priced = price_parlay(inputs)?;
            pick.odds_american = priced.odds_american;
            pick.odds_decimal = priced.odds_decimal;
            pick.game_start_time = priced.game_start_time;
            pick.legs = priced.legs;
        } else if pick.legs.len() < 2 {
            return Err(PickguardError::InvalidParlay(
                "a parlay needs at least 2 legs".into(),
            ));
        }
    } else {
        if changes.legs.as_ref().map_or(false, |legs| !legs.is_empty()) {
            return Err(PickguardError::Validation(format!(
                "legs are only accepted on parlay picks, not {}",
                pick.bet_type
            )));
        }
        pick.legs.clear();
        if let Some(odds) = changes.odds_american {
            validate_american_odds(odds)?;
            pick.odds_american = odds;
            pick.odds_decimal = american_to_decimal(odds)?;
        }
        if let Some(start) = changes.game_start_time {
            pick.game_start_time = start;
        }
    }

    if let Some(units) = changes.units_risked {
        validate_units(units)?;
        pick.units_risked = units;
        if changes.amount_risked.is_none() {
            pick.amount_risked = units * pick.unit_value_at_post;
        }
    }
    if let Some(amount) = changes.amount_risked {
        validate_amount(amount, "amount_risked")?;
        pick.amount_risked = amount;
    }
    if let Some(publish_at) = changes.publish_at {
        pick.publish_at = Some(publish_at);
    }

    if changes.game_start_time.is_some() || changes.legs.is_some() {
        if !locked {
            validate_future_start(pick.game_start_time, now, "game_start_time")?;
        } else if pick.game_start_time > now {
            return Err(PickguardError::Validation(format!(
                "game_start_time {} would reopen a locked pick; it must stay at or before {}",
                pick.game_start_time, now
            )));
        }
    }

    Ok(())
}

/// Old/new values of every tracked field that differs
fn diff_fields(before: &Pick, after: &Pick) -> Result<BTreeMap<String, FieldChange>> {
    let old = serde_json::to_value(before)?;
    let new = serde_json::to_value(after)?;

    let mut diff = BTreeMap::new();
    for field in TRACKED_FIELDS {
        let old_value = old.get(field).cloned().unwrap_or(Value::Null);
        let new_value = new.get(field).cloned().unwrap_or(Value::Null);
        if old_value != new_value {
            diff.insert(
                field.to_string(),
                FieldChange {
                    old: old_value,
                    new: new_value,
                },
            );
        }
    }
    Ok(diff)
}

pub fn compute_stats(creator_id: Uuid, picks: &[Pick]) -> CreatorStats {
    let mut stats = CreatorStats {
        creator_id,
        total_picks: picks.len() as u64,
        verified_picks: 0,
        graded_picks: 0,
        wins: 0,
        losses: 0,
        pushes: 0,
        units_risked: Decimal::ZERO,
        units_won: Decimal::ZERO,
        win_rate: 0.0,
        roi: 0.0,
    };
    let mut graded_units = Decimal::ZERO;

    for pick in picks {
        stats.units_risked += pick.units_risked;
        if pick.is_verified {
            stats.verified_picks += 1;
        }
        if !pick.is_graded() {
            continue;
        }
        stats.graded_picks += 1;
        graded_units += pick.units_risked;
        stats.units_won += pick.profit_units.unwrap_or_default();
        match pick.result {
            PickResult::Win => stats.wins += 1,
            PickResult::Loss => stats.losses += 1,
            PickResult::Push => stats.pushes += 1,
            PickResult::Void | PickResult::Pending => {}
        }
    }

    let decided = stats.wins + stats.losses;
    if decided > 0 {
        stats.win_rate = stats.wins as f64 / decided as f64;
    }
    if graded_units > Decimal::ZERO {
        stats.roi = (stats.units_won / graded_units).to_f64().unwrap_or_default();
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticCreatorDirectory;
    use crate::clock::ManualClock;
    use crate::persistence::MemoryStore;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    struct Harness {
        lifecycle: PickLifecycle,
        store: Arc<MemoryStore>,
        directory: Arc<StaticCreatorDirectory>,
        clock: Arc<ManualClock>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 12, 0, 0).unwrap()
    }

    fn harness_with(config: LifecycleConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(StaticCreatorDirectory::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let ledger = Ledger::new(store.clone(), clock.clone(), 5);
        let lifecycle = PickLifecycle::new(
            store.clone(),
            directory.clone(),
            ledger,
            clock.clone(),
            FraudConfig::default(),
            config,
        );
        Harness {
            lifecycle,
            store,
            directory,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(LifecycleConfig::default())
    }

    fn straight(odds: i64, units: Decimal) -> CreatePickRequest {
        CreatePickRequest {
            sport: Some("NBA".into()),
            game: GameRef {
                id: Some("nba-lal-bos".into()),
                description: Some("Lakers @ Celtics".into()),
            },
            bet_type: Some(BetType::Moneyline),
            selection: Some("Lakers".into()),
            odds_american: Some(odds),
            units_risked: Some(units),
            unit_value: Some(dec!(20)),
            game_start_time: Some(t0() + Duration::hours(2)),
            ..Default::default()
        }
    }

    fn leg(odds: i64, hours: i64) -> ParlayLegInput {
        ParlayLegInput {
            sport: "NFL".into(),
            league: None,
            game: GameRef {
                id: Some(format!("nfl-{hours}")),
                description: None,
            },
            bet_type: BetType::Spread,
            selection: "Home -3".into(),
            odds_american: odds,
            game_start_time: t0() + Duration::hours(hours),
        }
    }

    #[tokio::test]
    async fn create_computes_odds_and_stake() {
        let h = harness();
        let creator = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::new_v4(), straight(150, dec!(2)))
            .await
            .unwrap();

        assert_eq!(pick.odds_decimal, dec!(2.5));
        assert_eq!(pick.amount_risked, dec!(40));
        assert_eq!(pick.unit_value_at_post, dec!(20));
        assert!(pick.is_verified);
        assert_eq!(pick.status, PickStatus::Pending);
        assert!(pick.fraud.is_some());

        let entries = h.store.ledger_entries(pick.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, LedgerAction::Create);
        assert!(entries[0].snapshot.get("fraud").is_none());
    }

    #[tokio::test]
    async fn create_falls_back_to_directory_unit_value() {
        let h = harness();
        let creator = Uuid::new_v4();
        h.directory.set_unit_value(creator, dec!(50)).await;

        let mut request = straight(-110, dec!(1.5));
        request.unit_value = None;
        let pick = h
            .lifecycle
            .create(creator, Uuid::new_v4(), request)
            .await
            .unwrap();
        assert_eq!(pick.amount_risked, dec!(75));
    }

    #[tokio::test]
    async fn create_without_unit_value_fails() {
        let h = harness();
        let mut request = straight(-110, dec!(1));
        request.unit_value = None;
        let err = h
            .lifecycle
            .create(Uuid::new_v4(), Uuid::new_v4(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, PickguardError::MissingUnitValue { .. }));
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let h = harness();
        let creator = Uuid::new_v4();

        let mut past = straight(-110, dec!(1));
        past.game_start_time = Some(t0() - Duration::minutes(1));
        assert!(matches!(
            h.lifecycle.create(creator, Uuid::nil(), past).await,
            Err(PickguardError::Validation(_))
        ));

        assert!(matches!(
            h.lifecycle
                .create(creator, Uuid::nil(), straight(-50, dec!(1)))
                .await,
            Err(PickguardError::InvalidOdds(_))
        ));

        assert!(matches!(
            h.lifecycle
                .create(creator, Uuid::nil(), straight(-110, dec!(0)))
                .await,
            Err(PickguardError::Validation(_))
        ));

        let mut no_selection = straight(-110, dec!(1));
        no_selection.selection = Some("  ".into());
        assert!(h
            .lifecycle
            .create(creator, Uuid::nil(), no_selection)
            .await
            .is_err());

        assert_eq!(h.store.pick_count().await, 0);
    }

    #[tokio::test]
    async fn parlay_uses_combined_odds_and_earliest_start() {
        let h = harness();
        let request = CreatePickRequest {
            sport: Some("NFL".into()),
            bet_type: Some(BetType::Parlay),
            units_risked: Some(dec!(1)),
            unit_value: Some(dec!(10)),
            legs: vec![leg(-110, 5), leg(-110, 3)],
            ..Default::default()
        };
        let pick = h
            .lifecycle
            .create(Uuid::new_v4(), Uuid::nil(), request)
            .await
            .unwrap();

        assert_eq!(pick.odds_american, 264);
        assert_eq!(pick.game_start_time, t0() + Duration::hours(3));
        assert_eq!(pick.legs.len(), 2);
        assert_eq!(pick.selection, "2-leg parlay");
    }

    #[tokio::test]
    async fn parlay_with_one_leg_is_rejected() {
        let h = harness();
        let request = CreatePickRequest {
            sport: Some("NFL".into()),
            bet_type: Some(BetType::Parlay),
            units_risked: Some(dec!(1)),
            unit_value: Some(dec!(10)),
            legs: vec![leg(-110, 5)],
            ..Default::default()
        };
        assert!(matches!(
            h.lifecycle.create(Uuid::new_v4(), Uuid::nil(), request).await,
            Err(PickguardError::InvalidParlay(_))
        ));
    }

    #[tokio::test]
    async fn creator_edit_before_lock_records_diff() {
        let h = harness();
        let creator = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        let updated = h
            .lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    odds_american: Some(120),
                    units_risked: Some(dec!(2)),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.odds_decimal, dec!(2.2));
        assert_eq!(updated.amount_risked, dec!(40));
        assert!(updated.is_verified);
        assert_eq!(updated.edits.len(), 1);
        let changes = &updated.edits[0].changes;
        assert!(changes.contains_key("odds_american"));
        assert!(changes.contains_key("odds_decimal"));
        assert!(changes.contains_key("amount_risked"));
        assert!(updated.flags.is_empty());

        let entries = h.store.ledger_entries(pick.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, LedgerAction::Edit);
    }

    #[tokio::test]
    async fn no_op_update_writes_nothing() {
        let h = harness();
        let creator = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        let same = h
            .lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    odds_american: Some(-110),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(same.edits.is_empty());
        assert_eq!(h.store.ledger_entries(pick.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lock_boundary_rules() {
        let h = harness();
        let creator = Uuid::new_v4();
        let admin = Actor::admin(Uuid::new_v4());
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        h.clock.set(pick.game_start_time);

        let err = h
            .lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    odds_american: Some(200),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        match err {
            PickguardError::Locked { fields, .. } => assert_eq!(fields, vec!["odds_american"]),
            other => panic!("expected Locked, got {other:?}"),
        }

        let err = h
            .lifecycle
            .update(
                pick.id,
                admin,
                PickChanges {
                    selection: Some("Celtics".into()),
                    ..Default::default()
                },
                Some("   ".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PickguardError::ReasonRequired { .. }));

        let updated = h
            .lifecycle
            .update(
                pick.id,
                admin,
                PickChanges {
                    selection: Some("Celtics".into()),
                    ..Default::default()
                },
                Some("creator typo confirmed by support".into()),
            )
            .await
            .unwrap();
        assert!(!updated.is_verified);
        assert_eq!(updated.flags.len(), 1);
        assert_eq!(updated.edits.len(), 1);
        assert!(updated.edits[0].is_admin_edit);
        assert_eq!(h.store.ledger_entries(pick.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn strangers_cannot_edit_or_delete() {
        let h = harness();
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        assert!(matches!(
            h.lifecycle
                .update(
                    pick.id,
                    Actor::creator(stranger),
                    PickChanges {
                        selection: Some("Celtics".into()),
                        ..Default::default()
                    },
                    None
                )
                .await,
            Err(PickguardError::AccessDenied { .. })
        ));
        assert!(matches!(
            h.lifecycle.delete(pick.id, stranger).await,
            Err(PickguardError::AccessDenied { .. })
        ));
        assert!(matches!(
            h.lifecycle.delete(Uuid::new_v4(), creator).await,
            Err(PickguardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_writes_tombstone_and_updates_baseline() {
        let h = harness();
        let creator = Uuid::new_v4();
        let keep = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();
        let gone = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(3)))
            .await
            .unwrap();
        assert_eq!(h.store.units_baseline(creator).await.unwrap().count, 2);

        h.clock.set(gone.game_start_time + Duration::hours(1));
        h.lifecycle.delete(gone.id, creator).await.unwrap();

        assert!(h.store.get_pick(gone.id).await.unwrap().is_none());
        assert!(h.store.get_pick(keep.id).await.unwrap().is_some());
        let entries = h.store.ledger_entries(gone.id).await.unwrap();
        assert_eq!(entries.last().unwrap().action, LedgerAction::Delete);
        assert!(h.lifecycle.ledger().verify_chain(gone.id).await.unwrap().valid);

        let baseline = h.store.units_baseline(creator).await.unwrap();
        assert_eq!(baseline.count, 1);
        assert!((baseline.mean - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn delete_after_lock_can_be_blocked() {
        let h = harness_with(LifecycleConfig {
            block_delete_after_lock: true,
        });
        let creator = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();
        h.clock.set(pick.game_start_time);

        assert!(matches!(
            h.lifecycle.delete(pick.id, creator).await,
            Err(PickguardError::Locked { .. })
        ));
    }

    #[tokio::test]
    async fn grade_is_idempotent() {
        let h = harness();
        let pick = h
            .lifecycle
            .create(Uuid::new_v4(), Uuid::nil(), straight(150, dec!(2)))
            .await
            .unwrap();
        h.clock.set(pick.game_start_time + Duration::hours(3));

        let first = h
            .lifecycle
            .grade(pick.id, PickResult::Win, None, None)
            .await
            .unwrap();
        assert!(first.was_graded());
        assert_eq!(first.pick().profit_units, Some(dec!(3)));
        assert_eq!(first.pick().profit_amount, Some(dec!(60)));

        let second = h
            .lifecycle
            .grade(pick.id, PickResult::Loss, None, None)
            .await
            .unwrap();
        assert!(!second.was_graded());
        assert_eq!(second.pick().result, PickResult::Win);
        assert_eq!(second.pick().profit_units, Some(dec!(3)));

        let grades = h
            .store
            .ledger_entries(pick.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == LedgerAction::Grade)
            .count();
        assert_eq!(grades, 1);
    }

    #[tokio::test]
    async fn grade_rejects_pending_result_and_early_or_disputed_picks() {
        let h = harness();
        let admin = Actor::admin(Uuid::new_v4());
        let pick = h
            .lifecycle
            .create(Uuid::new_v4(), Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        assert!(matches!(
            h.lifecycle.grade(pick.id, PickResult::Win, None, None).await,
            Err(PickguardError::InvalidStateTransition { .. })
        ));

        h.clock.set(pick.game_start_time + Duration::hours(3));
        assert!(matches!(
            h.lifecycle
                .grade(pick.id, PickResult::Pending, None, None)
                .await,
            Err(PickguardError::Validation(_))
        ));

        h.lifecycle
            .dispute(pick.id, admin, "score feed disagreement")
            .await
            .unwrap();
        assert!(matches!(
            h.lifecycle.grade(pick.id, PickResult::Win, None, None).await,
            Err(PickguardError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn loss_and_push_profit() {
        assert_eq!(profit_units(PickResult::Loss, dec!(2), dec!(2.5)), dec!(-2));
        assert_eq!(profit_units(PickResult::Push, dec!(2), dec!(2.5)), Decimal::ZERO);
        assert_eq!(profit_units(PickResult::Void, dec!(2), dec!(2.5)), Decimal::ZERO);
        assert_eq!(
            profit_units(PickResult::Win, dec!(1), american_to_decimal(-110).unwrap()),
            dec!(0.9091)
        );
    }

    #[tokio::test]
    async fn stats_aggregate_graded_picks() {
        let h = harness();
        let creator = Uuid::new_v4();
        let win = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(100, dec!(1)))
            .await
            .unwrap();
        let loss = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(100, dec!(1)))
            .await
            .unwrap();
        h.lifecycle
            .create(creator, Uuid::nil(), straight(100, dec!(4)))
            .await
            .unwrap();

        h.clock.advance(Duration::hours(3));
        h.lifecycle
            .grade(win.id, PickResult::Win, None, None)
            .await
            .unwrap();
        h.lifecycle
            .grade(loss.id, PickResult::Loss, None, None)
            .await
            .unwrap();

        let stats = h.lifecycle.creator_stats(creator).await.unwrap();
        assert_eq!(stats.total_picks, 3);
        assert_eq!(stats.verified_picks, 3);
        assert_eq!(stats.graded_picks, 2);
        assert_eq!(stats.units_risked, dec!(6));
        assert_eq!(stats.units_won, Decimal::ZERO);
        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.roi, 0.0);
    }

    #[tokio::test]
    async fn locked_start_time_cannot_move_back_into_the_future() {
        let h = harness();
        let creator = Uuid::new_v4();
        let admin = Actor::admin(Uuid::new_v4());
        let mut request = straight(-110, dec!(1));
        request.game_start_time = Some(t0() + Duration::hours(1));
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), request)
            .await
            .unwrap();

        h.clock.set(t0() + Duration::hours(2));
        let err = h
            .lifecycle
            .update(
                pick.id,
                admin,
                PickChanges {
                    game_start_time: Some(t0() + Duration::days(3)),
                    ..Default::default()
                },
                Some("game rescheduled".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PickguardError::Validation(_)));

        let err = h
            .lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    odds_american: Some(200),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PickguardError::Locked { .. }));

        let stored = h.store.get_pick(pick.id).await.unwrap().unwrap();
        assert_eq!(stored.game_start_time, t0() + Duration::hours(1));
        assert_eq!(h.store.ledger_entries(pick.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_may_move_locked_start_time_earlier() {
        let h = harness();
        let admin = Actor::admin(Uuid::new_v4());
        let pick = h
            .lifecycle
            .create(Uuid::new_v4(), Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        h.clock.set(pick.game_start_time + Duration::hours(1));
        let earlier = pick.game_start_time - Duration::minutes(30);
        let updated = h
            .lifecycle
            .update(
                pick.id,
                admin,
                PickChanges {
                    game_start_time: Some(earlier),
                    ..Default::default()
                },
                Some("official start corrected".into()),
            )
            .await
            .unwrap();
        assert_eq!(updated.game_start_time, earlier);
        assert!(updated.is_locked(h.clock.now()));
    }

    #[tokio::test]
    async fn pick_locks_are_released_after_each_mutation() {
        let h = harness();
        let creator = Uuid::new_v4();
        let pick = h
            .lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();
        assert!(h.lifecycle.locks.is_empty());

        h.lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    units_risked: Some(dec!(2)),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        h.lifecycle.delete(pick.id, creator).await.unwrap();
        assert_eq!(h.lifecycle.locks.len(), 0);
    }

    /// Store that yields after reading a pick and can refuse baseline writes
    struct ContendedStore {
        inner: MemoryStore,
        yield_on_read: bool,
        fail_baseline: bool,
    }

    impl ContendedStore {
        fn new(yield_on_read: bool, fail_baseline: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                yield_on_read,
                fail_baseline,
            }
        }
    }

    #[async_trait::async_trait]
    impl PickStore for ContendedStore {
        async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>> {
            let pick = self.inner.get_pick(id).await;
            if self.yield_on_read {
                tokio::task::yield_now().await;
            }
            pick
        }

        async fn creator_picks(&self, creator_id: Uuid) -> Result<Vec<Pick>> {
            self.inner.creator_picks(creator_id).await
        }

        async fn recent_creator_picks(&self, creator_id: Uuid, limit: usize) -> Result<Vec<Pick>> {
            self.inner.recent_creator_picks(creator_id, limit).await
        }

        async fn pending_picks(
            &self,
            scope: &crate::domain::GradingScope,
            now: DateTime<Utc>,
        ) -> Result<Vec<Pick>> {
            self.inner.pending_picks(scope, now).await
        }

        async fn append_ledger(&self, entry: &LedgerEntry, write: PickWrite<'_>) -> Result<()> {
            self.inner.append_ledger(entry, write).await
        }

        async fn latest_entry(&self, resource_id: Uuid) -> Result<Option<LedgerEntry>> {
            self.inner.latest_entry(resource_id).await
        }

        async fn ledger_entries(&self, resource_id: Uuid) -> Result<Vec<LedgerEntry>> {
            self.inner.ledger_entries(resource_id).await
        }

        async fn save_fraud(&self, pick_id: Uuid, assessment: &FraudAssessment) -> Result<()> {
            self.inner.save_fraud(pick_id, assessment).await
        }

        async fn units_baseline(
            &self,
            creator_id: Uuid,
        ) -> Result<crate::domain::UnitsBaseline> {
            self.inner.units_baseline(creator_id).await
        }

        async fn save_units_baseline(
            &self,
            creator_id: Uuid,
            baseline: &crate::domain::UnitsBaseline,
        ) -> Result<()> {
            if self.fail_baseline {
                return Err(PickguardError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.save_units_baseline(creator_id, baseline).await
        }

        async fn cached_score(
            &self,
            creator_id: Uuid,
        ) -> Result<Option<crate::domain::TransparencyScore>> {
            self.inner.cached_score(creator_id).await
        }

        async fn save_score(&self, score: &crate::domain::TransparencyScore) -> Result<()> {
            self.inner.save_score(score).await
        }

        async fn mark_score_stale(&self, creator_id: Uuid) -> Result<()> {
            self.inner.mark_score_stale(creator_id).await
        }
    }

    fn lifecycle_over(store: Arc<ContendedStore>, clock: Arc<ManualClock>) -> PickLifecycle {
        PickLifecycle::new(
            store.clone(),
            Arc::new(StaticCreatorDirectory::new()),
            Ledger::new(store, clock.clone(), 5),
            clock,
            FraudConfig::default(),
            LifecycleConfig::default(),
        )
    }

    #[tokio::test]
    async fn racing_graders_on_separate_instances_grade_once() {
        let store = Arc::new(ContendedStore::new(true, false));
        let clock = Arc::new(ManualClock::new(t0()));
        let first = lifecycle_over(store.clone(), clock.clone());
        let second = lifecycle_over(store.clone(), clock.clone());

        let pick = first
            .create(Uuid::new_v4(), Uuid::nil(), straight(150, dec!(2)))
            .await
            .unwrap();
        clock.set(pick.game_start_time + Duration::hours(3));

        let (win, loss) = tokio::join!(
            first.grade(pick.id, PickResult::Win, None, None),
            second.grade(pick.id, PickResult::Loss, None, None),
        );
        let (win, loss) = (win.unwrap(), loss.unwrap());
        assert_eq!(
            [win.was_graded(), loss.was_graded()]
                .iter()
                .filter(|graded| **graded)
                .count(),
            1
        );

        let entries = store.ledger_entries(pick.id).await.unwrap();
        let grades: Vec<_> = entries
            .iter()
            .filter(|e| e.action == LedgerAction::Grade)
            .collect();
        assert_eq!(grades.len(), 1);
        assert_eq!(entries.len(), 2);

        let stored = store.get_pick(pick.id).await.unwrap().unwrap();
        assert_eq!(win.pick().result, stored.result);
        assert_eq!(loss.pick().result, stored.result);
        assert_eq!(grades[0].snapshot["result"], serde_json::to_value(stored.result).unwrap());
    }

    #[tokio::test]
    async fn racing_editors_on_separate_instances_both_land() {
        let store = Arc::new(ContendedStore::new(true, false));
        let clock = Arc::new(ManualClock::new(t0()));
        let first = lifecycle_over(store.clone(), clock.clone());
        let second = lifecycle_over(store.clone(), clock.clone());
        let creator = Uuid::new_v4();

        let pick = first
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            first.update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    selection: Some("Celtics".into()),
                    ..Default::default()
                },
                None,
            ),
            second.update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    units_risked: Some(dec!(3)),
                    ..Default::default()
                },
                None,
            ),
        );
        a.unwrap();
        b.unwrap();

        let stored = store.get_pick(pick.id).await.unwrap().unwrap();
        assert_eq!(stored.selection, "Celtics");
        assert_eq!(stored.units_risked, dec!(3));
        assert_eq!(stored.edits.len(), 2);
        assert_eq!(store.ledger_entries(pick.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn baseline_write_failure_does_not_fail_committed_mutations() {
        let store = Arc::new(ContendedStore::new(false, true));
        let clock = Arc::new(ManualClock::new(t0()));
        let lifecycle = lifecycle_over(store.clone(), clock);
        let creator = Uuid::new_v4();

        let pick = lifecycle
            .create(creator, Uuid::nil(), straight(-110, dec!(1)))
            .await
            .unwrap();
        assert_eq!(store.ledger_entries(pick.id).await.unwrap().len(), 1);

        let updated = lifecycle
            .update(
                pick.id,
                Actor::creator(creator),
                PickChanges {
                    units_risked: Some(dec!(2)),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.units_risked, dec!(2));

        lifecycle.delete(pick.id, creator).await.unwrap();
        assert!(store.get_pick(pick.id).await.unwrap().is_none());
        assert_eq!(store.ledger_entries(pick.id).await.unwrap().len(), 3);
        assert!(store.units_baseline(creator).await.unwrap().mean().is_none());
    }
}
