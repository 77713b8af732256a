//! Account-settings collaborator: unit values, subscriber and complaint counts.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CreatorProfile {
    pub default_unit_value: Option<Decimal>,
    pub subscription_count: u64,
    pub complaint_count: u64,
}

#[async_trait]
pub trait CreatorDirectory: Send + Sync {
    /// Default stake value of one unit, if the creator configured one
    async fn default_unit_value(&self, creator_id: Uuid) -> Result<Option<Decimal>>;

    async fn subscription_count(&self, creator_id: Uuid) -> Result<u64>;

    /// Complaints lodged against the creator; zero until a complaints source exists
    async fn complaint_count(&self, _creator_id: Uuid) -> Result<u64> {
        Ok(0)
    }
}

/// Directory held in memory, seeded by tests or local tooling
#[derive(Debug, Default)]
pub struct StaticCreatorDirectory {
    profiles: RwLock<HashMap<Uuid, CreatorProfile>>,
}

impl StaticCreatorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, creator_id: Uuid, profile: CreatorProfile) {
        self.profiles.write().await.insert(creator_id, profile);
    }

    pub async fn set_unit_value(&self, creator_id: Uuid, value: Decimal) {
        self.profiles
            .write()
            .await
            .entry(creator_id)
            .or_default()
            .default_unit_value = Some(value);
    }

    async fn profile(&self, creator_id: Uuid) -> CreatorProfile {
        self.profiles
            .read()
            .await
            .get(&creator_id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CreatorDirectory for StaticCreatorDirectory {
    async fn default_unit_value(&self, creator_id: Uuid) -> Result<Option<Decimal>> {
        Ok(self.profile(creator_id).await.default_unit_value)
    }

    async fn subscription_count(&self, creator_id: Uuid) -> Result<u64> {
        Ok(self.profile(creator_id).await.subscription_count)
    }

    async fn complaint_count(&self, creator_id: Uuid) -> Result<u64> {
        Ok(self.profile(creator_id).await.complaint_count)
    }
}
