use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::fraud::FraudAssessment;
use crate::error::{PickguardError, Result};

/// Wager category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Moneyline,
    Spread,
    Total,
    Prop,
    Future,
    Parlay,
    Other,
}

impl BetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Moneyline => "moneyline",
            BetType::Spread => "spread",
            BetType::Total => "total",
            BetType::Prop => "prop",
            BetType::Future => "future",
            BetType::Parlay => "parlay",
            BetType::Other => "other",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BetType {
    type Err = PickguardError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "moneyline" | "ml" => Ok(BetType::Moneyline),
            "spread" => Ok(BetType::Spread),
            "total" | "over_under" => Ok(BetType::Total),
            "prop" => Ok(BetType::Prop),
            "future" => Ok(BetType::Future),
            "parlay" => Ok(BetType::Parlay),
            "other" => Ok(BetType::Other),
            other => Err(PickguardError::Validation(format!(
                "unknown bet_type '{other}'"
            ))),
        }
    }
}

/// Stored lifecycle status. `Locked` is never persisted; it is derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStatus {
    Pending,
    Locked,
    Graded,
    Disputed,
}

impl PickStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickStatus::Pending => "pending",
            PickStatus::Locked => "locked",
            PickStatus::Graded => "graded",
            PickStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for PickStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PickStatus {
    type Err = PickguardError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(PickStatus::Pending),
            "locked" => Ok(PickStatus::Locked),
            "graded" => Ok(PickStatus::Graded),
            "disputed" => Ok(PickStatus::Disputed),
            other => Err(PickguardError::Validation(format!("unknown status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickResult {
    Pending,
    Win,
    Loss,
    Push,
    Void,
}

impl PickResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickResult::Pending => "pending",
            PickResult::Win => "win",
            PickResult::Loss => "loss",
            PickResult::Push => "push",
            PickResult::Void => "void",
        }
    }
}

impl fmt::Display for PickResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PickResult {
    type Err = PickguardError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PickResult::Pending),
            "win" => Ok(PickResult::Win),
            "loss" => Ok(PickResult::Loss),
            "push" => Ok(PickResult::Push),
            "void" => Ok(PickResult::Void),
            other => Err(PickguardError::Validation(format!("unknown result '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    System,
    Manual,
}

impl VerificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationSource::System => "system",
            VerificationSource::Manual => "manual",
        }
    }
}

/// Game the wager is on: a provider id, a free-text description, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GameRef {
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.id) && blank(&self.description)
    }
}

impl fmt::Display for GameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.id, &self.description) {
            (Some(id), _) => write!(f, "{id}"),
            (None, Some(desc)) => write!(f, "{desc}"),
            (None, None) => write!(f, "-"),
        }
    }
}

/// One leg of a parlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayLeg {
    pub sport: String,
    pub league: Option<String>,
    pub game: GameRef,
    pub bet_type: BetType,
    pub selection: String,
    pub odds_american: i64,
    pub odds_decimal: Decimal,
    pub game_start_time: DateTime<Utc>,
}

/// Final score details reported by the sports-data provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInfo {
    #[serde(default)]
    pub home_score: Option<i32>,
    #[serde(default)]
    pub away_score: Option<i32>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Old/new value of a single edited field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub editor_id: Uuid,
    pub edited_at: DateTime<Utc>,
    pub changes: BTreeMap<String, FieldChange>,
    pub reason: Option<String>,
    pub is_admin_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub reason: String,
    /// `None` when raised by the system
    pub flagged_by: Option<Uuid>,
    pub flagged_at: DateTime<Utc>,
}

/// A posted prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub storefront_id: Uuid,

    // Wager facts
    pub sport: String,
    pub league: Option<String>,
    pub game: GameRef,
    pub bet_type: BetType,
    pub selection: String,
    pub odds_american: i64,
    pub odds_decimal: Decimal,
    pub units_risked: Decimal,
    pub amount_risked: Decimal,
    pub unit_value_at_post: Decimal,
    #[serde(default)]
    pub legs: Vec<ParlayLeg>,

    // Timing
    pub game_start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub publish_at: Option<DateTime<Utc>>,

    // Verification
    pub is_verified: bool,
    pub verification_source: VerificationSource,

    // Lifecycle
    pub status: PickStatus,
    pub result: PickResult,
    pub profit_units: Option<Decimal>,
    pub profit_amount: Option<Decimal>,
    pub score_info: Option<ScoreInfo>,
    pub graded_at: Option<DateTime<Utc>>,
    /// Closing-line value captured at grading
    pub clv: Option<f64>,

    /// Market price for the same selection when the pick was posted
    pub market_odds_american: Option<i64>,

    // Audit
    #[serde(default)]
    pub edits: Vec<EditRecord>,
    #[serde(default)]
    pub flags: Vec<FlagRecord>,
    pub fraud: Option<FraudAssessment>,
}

impl Pick {
    /// Wager facts freeze once the game has started
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        now >= self.game_start_time
    }

    /// Status as seen by callers at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> PickStatus {
        match self.status {
            PickStatus::Pending if self.is_locked(now) => PickStatus::Locked,
            status => status,
        }
    }

    pub fn is_parlay(&self) -> bool {
        self.bet_type == BetType::Parlay
    }

    pub fn is_graded(&self) -> bool {
        self.status == PickStatus::Graded
    }

    /// A non-admin edit stamped at or after game start
    pub fn has_post_lock_non_admin_edit(&self) -> bool {
        self.edits
            .iter()
            .any(|edit| !edit.is_admin_edit && edit.edited_at >= self.game_start_time)
    }

    /// State recorded in the ledger. Fraud metadata is derived data and stays out.
    pub fn ledger_snapshot(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("fraud");
        }
        Ok(value)
    }

    /// Straight -110 moneyline pick risking one unit of 10
    #[cfg(test)]
    pub(crate) fn fixture(
        creator_id: Uuid,
        created_at: DateTime<Utc>,
        game_start_time: DateTime<Utc>,
    ) -> Self {
        use rust_decimal_macros::dec;
        Self {
            id: Uuid::new_v4(),
            creator_id,
            storefront_id: Uuid::nil(),
            sport: "NBA".into(),
            league: None,
            game: GameRef {
                id: Some("nba-2026-lal-bos".into()),
                description: None,
            },
            bet_type: BetType::Moneyline,
            selection: "Lakers".into(),
            odds_american: -110,
            odds_decimal: dec!(1.9090909090909090909090909091),
            units_risked: dec!(1),
            amount_risked: dec!(10),
            unit_value_at_post: dec!(10),
            legs: Vec::new(),
            game_start_time,
            created_at,
            updated_at: created_at,
            publish_at: None,
            is_verified: created_at < game_start_time,
            verification_source: VerificationSource::System,
            status: PickStatus::Pending,
            result: PickResult::Pending,
            profit_units: None,
            profit_amount: None,
            score_info: None,
            graded_at: None,
            clv: None,
            market_odds_american: None,
            edits: Vec::new(),
            flags: Vec::new(),
            fraud: None,
        }
    }
}

/// Leg as submitted by a creator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayLegInput {
    pub sport: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub game: GameRef,
    pub bet_type: BetType,
    pub selection: String,
    pub odds_american: i64,
    pub game_start_time: DateTime<Utc>,
}

/// Create request. Optional fields are checked by the lifecycle so missing
/// values come back as field-level validation errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePickRequest {
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub game: GameRef,
    #[serde(default)]
    pub bet_type: Option<BetType>,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub odds_american: Option<i64>,
    #[serde(default)]
    pub units_risked: Option<Decimal>,
    #[serde(default)]
    pub amount_risked: Option<Decimal>,
    #[serde(default)]
    pub unit_value: Option<Decimal>,
    #[serde(default)]
    pub game_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub legs: Vec<ParlayLegInput>,
    #[serde(default)]
    pub market_odds_american: Option<i64>,
}

/// Field-level changes for an update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickChanges {
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub game: Option<GameRef>,
    #[serde(default)]
    pub bet_type: Option<BetType>,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub odds_american: Option<i64>,
    #[serde(default)]
    pub units_risked: Option<Decimal>,
    #[serde(default)]
    pub amount_risked: Option<Decimal>,
    #[serde(default)]
    pub game_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub legs: Option<Vec<ParlayLegInput>>,
}

impl PickChanges {
    /// Names of the fields this change set touches
    pub fn touched_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        let mut push = |touched: bool, name: &str| {
            if touched {
                fields.push(name.to_string());
            }
        };
        push(self.sport.is_some(), "sport");
        push(self.league.is_some(), "league");
        push(self.game.is_some(), "game");
        push(self.bet_type.is_some(), "bet_type");
        push(self.selection.is_some(), "selection");
        push(self.odds_american.is_some(), "odds_american");
        push(self.units_risked.is_some(), "units_risked");
        push(self.amount_risked.is_some(), "amount_risked");
        push(self.game_start_time.is_some(), "game_start_time");
        push(self.publish_at.is_some(), "publish_at");
        push(self.legs.is_some(), "legs");
        fields
    }
}

/// Identity context supplied by the auth collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn creator(id: Uuid) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, is_admin: true }
    }
}

/// Which pending picks a grading run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingScope {
    /// Picks whose game starts inside `[from, to]`
    DateRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Picks on one provider game (straight picks or any parlay leg)
    Game { game_id: String },
}

impl GradingScope {
    pub fn matches(&self, pick: &Pick) -> bool {
        match self {
            GradingScope::DateRange { from, to } => {
                pick.game_start_time >= *from && pick.game_start_time <= *to
            }
            GradingScope::Game { game_id } => {
                pick.game.id.as_deref() == Some(game_id.as_str())
                    || pick
                        .legs
                        .iter()
                        .any(|leg| leg.game.id.as_deref() == Some(game_id.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bet_type_parses_aliases() {
        assert_eq!("ML".parse::<BetType>().unwrap(), BetType::Moneyline);
        assert_eq!("parlay".parse::<BetType>().unwrap(), BetType::Parlay);
        assert!("teaser".parse::<BetType>().is_err());
    }

    #[test]
    fn game_ref_blank_detection() {
        assert!(GameRef::default().is_empty());
        assert!(GameRef {
            id: Some("  ".into()),
            description: None
        }
        .is_empty());
        assert!(!GameRef {
            id: None,
            description: Some("Lakers @ Celtics".into())
        }
        .is_empty());
    }

    #[test]
    fn touched_fields_lists_only_present_changes() {
        let changes = PickChanges {
            odds_american: Some(-120),
            units_risked: Some(Decimal::ONE),
            ..Default::default()
        };
        assert_eq!(changes.touched_fields(), vec!["odds_american", "units_risked"]);
    }
}
