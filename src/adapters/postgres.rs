use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::creator_directory::CreatorDirectory;
use crate::domain::{
    FraudAssessment, GradingScope, LedgerAction, LedgerEntry, Pick, TransparencyBreakdown,
    TransparencyScore, UnitsBaseline,
};
use crate::error::{PickguardError, Result};
use crate::persistence::{PickStore, PickWrite};

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn pick_from_row(row: &PgRow) -> Result<Pick> {
        let Json(pick): Json<Pick> = row.try_get("data")?;
        Ok(pick)
    }

    fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
        let action: String = row.try_get("action")?;
        Ok(LedgerEntry {
            resource_id: row.try_get("resource_id")?,
            sequence: row.try_get("sequence")?,
            hash: row.try_get("hash")?,
            previous_hash: row.try_get("previous_hash")?,
            snapshot: row.try_get("snapshot")?,
            action: action.parse::<LedgerAction>()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
    }
}

#[async_trait]
impl PickStore for PostgresStore {
    async fn get_pick(&self, id: Uuid) -> Result<Option<Pick>> {
        let row = sqlx::query("SELECT data FROM picks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::pick_from_row).transpose()
    }

    async fn creator_picks(&self, creator_id: Uuid) -> Result<Vec<Pick>> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM picks
            WHERE creator_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::pick_from_row).collect()
    }

    async fn recent_creator_picks(&self, creator_id: Uuid, limit: usize) -> Result<Vec<Pick>> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM picks
            WHERE creator_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(creator_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::pick_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn pending_picks(&self, scope: &GradingScope, now: DateTime<Utc>) -> Result<Vec<Pick>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT data FROM picks WHERE status = 'pending' AND game_start_time <= ",
        );
        qb.push_bind(now);

        match scope {
            GradingScope::DateRange { from, to } => {
                qb.push(" AND game_start_time >= ").push_bind(*from);
                qb.push(" AND game_start_time <= ").push_bind(*to);
            }
            GradingScope::Game { game_id } => {
                qb.push(" AND (game_id = ").push_bind(game_id.clone());
                qb.push(" OR data->'legs' @> jsonb_build_array(jsonb_build_object(");
                qb.push("'game', jsonb_build_object('id', ")
                    .push_bind(game_id.clone())
                    .push("::text))))");
            }
        }
        qb.push(" ORDER BY game_start_time ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!("Loaded {} pending picks", rows.len());
        rows.iter().map(Self::pick_from_row).collect()
    }

    #[instrument(
        skip(self, entry, write),
        fields(resource_id = %entry.resource_id, sequence = entry.sequence)
    )]
    async fn append_ledger(&self, entry: &LedgerEntry, write: PickWrite<'_>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (resource_id, sequence, hash, previous_hash, snapshot, action, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.resource_id)
        .bind(entry.sequence)
        .bind(&entry.hash)
        .bind(&entry.previous_hash)
        .bind(&entry.snapshot)
        .bind(entry.action.as_str())
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if Self::is_unique_violation(&err) {
                return Err(PickguardError::SequenceConflict {
                    resource_id: entry.resource_id,
                    sequence: entry.sequence,
                });
            }
            return Err(err.into());
        }

        match write {
            PickWrite::Upsert(pick) => {
                sqlx::query(
                    r#"
                    INSERT INTO picks
                        (id, creator_id, storefront_id, status, game_id, game_start_time,
                         created_at, updated_at, data)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (id) DO UPDATE SET
                        status = EXCLUDED.status,
                        game_id = EXCLUDED.game_id,
                        game_start_time = EXCLUDED.game_start_time,
                        updated_at = EXCLUDED.updated_at,
                        data = EXCLUDED.data
                    "#,
                )
                .bind(pick.id)
                .bind(pick.creator_id)
                .bind(pick.storefront_id)
                .bind(pick.status.as_str())
                .bind(pick.game.id.as_deref())
                .bind(pick.game_start_time)
                .bind(pick.created_at)
                .bind(pick.updated_at)
                .bind(Json(pick))
                .execute(&mut *tx)
                .await?;
            }
            PickWrite::Delete(id) => {
                sqlx::query("DELETE FROM picks WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            PickWrite::None => {}
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest_entry(&self, resource_id: Uuid) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            r#"
            SELECT resource_id, sequence, hash, previous_hash, snapshot, action, created_at
            FROM ledger_entries
            WHERE resource_id = $1
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::entry_from_row).transpose()
    }

    async fn ledger_entries(&self, resource_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT resource_id, sequence, hash, previous_hash, snapshot, action, created_at
            FROM ledger_entries
            WHERE resource_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn save_fraud(&self, pick_id: Uuid, assessment: &FraudAssessment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE picks
            SET data = jsonb_set(data, '{fraud}', $2)
            WHERE id = $1
            "#,
        )
        .bind(pick_id)
        .bind(serde_json::to_value(assessment)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PickguardError::NotFound(format!("pick {pick_id}")));
        }
        Ok(())
    }

    async fn units_baseline(&self, creator_id: Uuid) -> Result<UnitsBaseline> {
        let row = sqlx::query(
            "SELECT count, mean, m2 FROM creator_units_baselines WHERE creator_id = $1",
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let count: i64 = r.try_get("count")?;
                Ok(UnitsBaseline {
                    count: count.max(0) as u64,
                    mean: r.try_get("mean")?,
                    m2: r.try_get("m2")?,
                })
            }
            None => Ok(UnitsBaseline::default()),
        }
    }

    async fn save_units_baseline(&self, creator_id: Uuid, baseline: &UnitsBaseline) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO creator_units_baselines (creator_id, count, mean, m2, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (creator_id) DO UPDATE SET
                count = EXCLUDED.count,
                mean = EXCLUDED.mean,
                m2 = EXCLUDED.m2,
                updated_at = NOW()
            "#,
        )
        .bind(creator_id)
        .bind(baseline.count as i64)
        .bind(baseline.mean)
        .bind(baseline.m2)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cached_score(&self, creator_id: Uuid) -> Result<Option<TransparencyScore>> {
        let row = sqlx::query(
            r#"
            SELECT creator_id, score, breakdown, computed_at, stale
            FROM transparency_scores
            WHERE creator_id = $1
            "#,
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let score: i32 = r.try_get("score")?;
                let Json(breakdown): Json<TransparencyBreakdown> = r.try_get("breakdown")?;
                Ok(Some(TransparencyScore {
                    creator_id: r.try_get("creator_id")?,
                    score: score.clamp(0, 100) as u32,
                    breakdown,
                    computed_at: r.try_get("computed_at")?,
                    stale: r.try_get("stale")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save_score(&self, score: &TransparencyScore) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transparency_scores (creator_id, score, breakdown, computed_at, stale)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (creator_id) DO UPDATE SET
                score = EXCLUDED.score,
                breakdown = EXCLUDED.breakdown,
                computed_at = EXCLUDED.computed_at,
                stale = EXCLUDED.stale
            "#,
        )
        .bind(score.creator_id)
        .bind(score.score as i32)
        .bind(Json(&score.breakdown))
        .bind(score.computed_at)
        .bind(score.stale)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_score_stale(&self, creator_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE transparency_scores SET stale = TRUE WHERE creator_id = $1")
            .bind(creator_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CreatorDirectory for PostgresStore {
    async fn default_unit_value(&self, creator_id: Uuid) -> Result<Option<Decimal>> {
        let value: Option<Option<Decimal>> = sqlx::query_scalar(
            "SELECT default_unit_value FROM creator_profiles WHERE creator_id = $1",
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.flatten().filter(|v| *v > Decimal::ZERO))
    }

    async fn subscription_count(&self, creator_id: Uuid) -> Result<u64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT subscription_count FROM creator_profiles WHERE creator_id = $1",
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.and_then(|c| c.to_u64()).unwrap_or(0))
    }

    async fn complaint_count(&self, creator_id: Uuid) -> Result<u64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT complaint_count FROM creator_profiles WHERE creator_id = $1",
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.and_then(|c| c.to_u64()).unwrap_or(0))
    }
}
