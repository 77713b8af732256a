//! Storage seam for picks, ledger entries and creator aggregates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    FraudAssessment, GradingScope, LedgerEntry, Pick, TransparencyScore, UnitsBaseline,
};
use crate::error::Result;

/// Pick mutation committed together with a ledger entry
#[derive(Debug, Clone, Copy)]
pub enum PickWrite<'a> {
    /// Insert or replace the pick row
    Upsert(&'a Pick),
    /// Remove the pick row; the ledger keeps its history
    Delete(Uuid),
    /// Ledger-only append
    None,
}

#[async_trait]
pub trait PickStore: Send + Sync {
    async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>>;

    /// All picks of a creator, oldest first
    async fn creator_picks(&self, creator_id: Uuid) -> Result<Vec<Pick>>;

    /// Latest `limit` picks of a creator, newest first
    async fn recent_creator_picks(&self, creator_id: Uuid, limit: usize) -> Result<Vec<Pick>>;

    /// Ungraded, undisputed picks in scope whose game started at or before `now`
    async fn pending_picks(&self, scope: &GradingScope, now: DateTime<Utc>) -> Result<Vec<Pick>>;

    /// Insert `entry` and apply `write` atomically.
    ///
    /// Fails with `SequenceConflict` when `(resource_id, sequence)` already exists,
    /// in which case nothing is written. Callers read `latest_entry` before the
    /// pick, so any pick newer than their read surfaces as a conflict.
    async fn append_ledger(&self, entry: &LedgerEntry, write: PickWrite<'_>) -> Result<()>;

    async fn latest_entry(&self, resource_id: Uuid) -> Result<Option<LedgerEntry>>;

    /// Entries in sequence order
    async fn ledger_entries(&self, resource_id: Uuid) -> Result<Vec<LedgerEntry>>;

    /// Attach fraud metadata; not a ledgered mutation
    async fn save_fraud(&self, pick_id: Uuid, assessment: &FraudAssessment) -> Result<()>;

    async fn units_baseline(&self, creator_id: Uuid) -> Result<UnitsBaseline>;

    async fn save_units_baseline(&self, creator_id: Uuid, baseline: &UnitsBaseline) -> Result<()>;

    async fn cached_score(&self, creator_id: Uuid) -> Result<Option<TransparencyScore>>;

    async fn save_score(&self, score: &TransparencyScore) -> Result<()>;

    async fn mark_score_stale(&self, creator_id: Uuid) -> Result<()>;
}
