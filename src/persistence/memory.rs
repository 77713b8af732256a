//! In-process store used by tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{PickStore, PickWrite};
use crate::domain::{
    FraudAssessment, GradingScope, LedgerEntry, Pick, PickStatus, TransparencyScore,
    UnitsBaseline,
};
use crate::error::{PickguardError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    picks: HashMap<Uuid, Pick>,
    ledger: HashMap<Uuid, Vec<LedgerEntry>>,
    baselines: HashMap<Uuid, UnitsBaseline>,
    scores: HashMap<Uuid, TransparencyScore>,
}

/// Store backed by a single `RwLock`; ledger append and pick write happen under
/// the same write guard, so they are atomic together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pick_count(&self) -> usize {
        self.state.read().await.picks.len()
    }

    /// Rewrite a stored entry in place, bypassing every ledger rule
    #[cfg(test)]
    pub(crate) async fn tamper_entry<F>(&self, resource_id: Uuid, sequence: i64, edit: F)
    where
        F: FnOnce(&mut LedgerEntry),
    {
        let mut state = self.state.write().await;
        if let Some(entry) = state
            .ledger
            .get_mut(&resource_id)
            .and_then(|entries| entries.iter_mut().find(|e| e.sequence == sequence))
        {
            edit(entry);
        }
    }
}

#[async_trait]
impl PickStore for MemoryStore {
    async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>> {
        Ok(self.state.read().await.picks.get(&id).cloned())
    }

    async fn creator_picks(&self, creator_id: Uuid) -> Result<Vec<Pick>> {
        let state = self.state.read().await;
        let mut picks: Vec<Pick> = state
            .picks
            .values()
            .filter(|p| p.creator_id == creator_id)
            .cloned()
            .collect();
        picks.sort_by_key(|p| p.created_at);
        Ok(picks)
    }

    async fn recent_creator_picks(&self, creator_id: Uuid, limit: usize) -> Result<Vec<Pick>> {
        let mut picks = self.creator_picks(creator_id).await?;
        picks.reverse();
        picks.truncate(limit);
        Ok(picks)
    }

    async fn pending_picks(&self, scope: &GradingScope, now: DateTime<Utc>) -> Result<Vec<Pick>> {
        let state = self.state.read().await;
        let mut picks: Vec<Pick> = state
            .picks
            .values()
            .filter(|p| p.status == PickStatus::Pending)
            .filter(|p| p.game_start_time <= now)
            .filter(|p| scope.matches(p))
            .cloned()
            .collect();
        picks.sort_by_key(|p| p.game_start_time);
        Ok(picks)
    }

    async fn append_ledger(&self, entry: &LedgerEntry, write: PickWrite<'_>) -> Result<()> {
        let mut state = self.state.write().await;

        let chain = state.ledger.entry(entry.resource_id).or_default();
        if chain.iter().any(|e| e.sequence == entry.sequence) {
            return Err(PickguardError::SequenceConflict {
                resource_id: entry.resource_id,
                sequence: entry.sequence,
            });
        }
        chain.push(entry.clone());
        chain.sort_by_key(|e| e.sequence);

        match write {
            PickWrite::Upsert(pick) => {
                state.picks.insert(pick.id, pick.clone());
            }
            PickWrite::Delete(id) => {
                state.picks.remove(&id);
            }
            PickWrite::None => {}
        }
        Ok(())
    }

    async fn latest_entry(&self, resource_id: Uuid) -> Result<Option<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .ledger
            .get(&resource_id)
            .and_then(|entries| entries.last())
            .cloned())
    }

    async fn ledger_entries(&self, resource_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state.ledger.get(&resource_id).cloned().unwrap_or_default())
    }

    async fn save_fraud(&self, pick_id: Uuid, assessment: &FraudAssessment) -> Result<()> {
        let mut state = self.state.write().await;
        let pick = state
            .picks
            .get_mut(&pick_id)
            .ok_or_else(|| PickguardError::NotFound(format!("pick {pick_id}")))?;
        pick.fraud = Some(assessment.clone());
        Ok(())
    }

    async fn units_baseline(&self, creator_id: Uuid) -> Result<UnitsBaseline> {
        let state = self.state.read().await;
        Ok(state.baselines.get(&creator_id).copied().unwrap_or_default())
    }

    async fn save_units_baseline(&self, creator_id: Uuid, baseline: &UnitsBaseline) -> Result<()> {
        self.state
            .write()
            .await
            .baselines
            .insert(creator_id, *baseline);
        Ok(())
    }

    async fn cached_score(&self, creator_id: Uuid) -> Result<Option<TransparencyScore>> {
        Ok(self.state.read().await.scores.get(&creator_id).cloned())
    }

    async fn save_score(&self, score: &TransparencyScore) -> Result<()> {
        self.state
            .write()
            .await
            .scores
            .insert(score.creator_id, score.clone());
        Ok(())
    }

    async fn mark_score_stale(&self, creator_id: Uuid) -> Result<()> {
        if let Some(score) = self.state.write().await.scores.get_mut(&creator_id) {
            score.stale = true;
        }
        Ok(())
    }
}
