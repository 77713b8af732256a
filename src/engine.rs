use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::adapters::{CreatorDirectory, SportsDataProvider};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::domain::{
    Actor, ChainVerification, CreatePickRequest, CreatorStats, GradingScope, LedgerProof, Pick,
    PickChanges, TransparencyScore,
};
use crate::error::{PickguardError, Result};
use crate::grading::{GradingJob, GradingReport};
use crate::ledger::Ledger;
use crate::lifecycle::PickLifecycle;
use crate::persistence::PickStore;
use crate::transparency::TransparencyService;

/// Library facade over the integrity services.
///
/// Picks handed out by read paths carry the derived status (`locked` once the
/// game has started); the stored status is never rewritten.
pub struct IntegrityEngine {
    store: Arc<dyn PickStore>,
    lifecycle: Arc<PickLifecycle>,
    transparency: Arc<TransparencyService>,
    grading: Option<GradingJob>,
    clock: Arc<dyn Clock>,
}

impl IntegrityEngine {
    pub fn new(
        store: Arc<dyn PickStore>,
        directory: Arc<dyn CreatorDirectory>,
        sports_data: Option<Arc<dyn SportsDataProvider>>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let ledger = Ledger::new(store.clone(), clock.clone(), config.ledger.max_append_retries);

        let mut lifecycle = PickLifecycle::new(
            store.clone(),
            directory.clone(),
            ledger,
            clock.clone(),
            config.fraud.clone(),
            config.lifecycle.clone(),
        );
        if let Some(provider) = &sports_data {
            lifecycle = lifecycle.with_sports_data(provider.clone());
        }
        let lifecycle = Arc::new(lifecycle);

        let transparency = Arc::new(TransparencyService::new(
            store.clone(),
            directory,
            clock.clone(),
            config.transparency.clone(),
        ));

        let grading = sports_data.map(|provider| {
            GradingJob::new(
                store.clone(),
                lifecycle.clone(),
                transparency.clone(),
                provider,
                clock.clone(),
                config.grading.clone(),
            )
        });

        info!(grading_enabled = grading.is_some(), "Integrity engine ready");

        Self {
            store,
            lifecycle,
            transparency,
            grading,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn PickStore> {
        &self.store
    }

    pub fn lifecycle(&self) -> &Arc<PickLifecycle> {
        &self.lifecycle
    }

    pub async fn create_pick(
        &self,
        creator_id: Uuid,
        storefront_id: Uuid,
        request: CreatePickRequest,
    ) -> Result<Pick> {
        let pick = self
            .lifecycle
            .create(creator_id, storefront_id, request)
            .await?;
        Ok(self.present(pick))
    }

    pub async fn update_pick(
        &self,
        pick_id: Uuid,
        actor: Actor,
        changes: PickChanges,
        reason: Option<String>,
    ) -> Result<Pick> {
        let pick = self
            .lifecycle
            .update(pick_id, actor, changes, reason)
            .await?;
        Ok(self.present(pick))
    }

    pub async fn delete_pick(&self, pick_id: Uuid, actor_id: Uuid) -> Result<()> {
        self.lifecycle.delete(pick_id, actor_id).await
    }

    pub async fn get_pick(&self, pick_id: Uuid) -> Result<Pick> {
        let pick = self.lifecycle.get_pick(pick_id).await?;
        Ok(self.present(pick))
    }

    pub async fn dispute_pick(&self, pick_id: Uuid, actor: Actor, reason: &str) -> Result<Pick> {
        let pick = self.lifecycle.dispute(pick_id, actor, reason).await?;
        Ok(self.present(pick))
    }

    pub async fn get_creator_stats(&self, creator_id: Uuid) -> Result<CreatorStats> {
        self.lifecycle.creator_stats(creator_id).await
    }

    pub async fn run_grading(
        &self,
        scope: GradingScope,
        timeout: Option<Duration>,
    ) -> Result<GradingReport> {
        let job = self.grading.as_ref().ok_or_else(|| {
            PickguardError::Internal("grading needs a sports data provider".into())
        })?;
        job.run(scope, timeout).await
    }

    pub async fn get_ledger_proof(&self, pick_id: Uuid) -> Result<LedgerProof> {
        self.lifecycle.ledger().proof(pick_id).await
    }

    /// Chain check for operators; an invalid chain is an error here
    pub async fn verify_chain(&self, pick_id: Uuid) -> Result<ChainVerification> {
        self.lifecycle.ledger().ensure_valid(pick_id).await
    }

    pub async fn get_transparency_score(
        &self,
        creator_id: Uuid,
        force_recalc: bool,
    ) -> Result<TransparencyScore> {
        self.transparency.get(creator_id, force_recalc).await
    }

    fn present(&self, mut pick: Pick) -> Pick {
        pick.status = pick.status_at(self.clock.now());
        pick
    }
}
