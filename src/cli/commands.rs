use anyhow::{bail, Context};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;
use tokio::signal;
use tracing::{info, warn};
use uuid::Uuid;

use super::output::{self, OutputMode};
use super::Commands;
use crate::adapters::{HttpSportsData, PostgresStore, SportsDataProvider};
use crate::api::{create_router, AppState};
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::domain::{GradingScope, LedgerProof, ScoreComponent};
use crate::engine::IntegrityEngine;
use crate::grading::{GradingReport, PickGradeStatus};

#[derive(Debug, Serialize, Tabled)]
pub struct GradeRow {
    pub pick_id: Uuid,
    pub creator_id: Uuid,
    pub status: String,
    pub detail: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct LedgerRow {
    pub sequence: i64,
    pub action: String,
    pub hash: String,
    pub previous_hash: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ComponentRow {
    pub component: &'static str,
    pub value: String,
    pub weight: String,
    pub weighted: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct FieldRow {
    pub field: &'static str,
    pub value: String,
}

/// Dispatch a parsed command
pub async fn run(command: Commands, config: &AppConfig, mode: OutputMode) -> anyhow::Result<()> {
    match command {
        Commands::Serve { bind, migrate } => serve(config, bind, migrate).await,
        Commands::Migrate => {
            let store = connect(config).await?;
            store.migrate().await?;
            output::print_success("Migrations applied");
            Ok(())
        }
        Commands::Grade {
            from,
            to,
            game,
            timeout_secs,
        } => {
            let scope = match (from, to, game) {
                (_, _, Some(game_id)) => GradingScope::Game { game_id },
                (Some(from), Some(to), None) => {
                    if from > to {
                        bail!("--from must not be after --to");
                    }
                    GradingScope::DateRange { from, to }
                }
                _ => bail!("pass --from and --to, or --game"),
            };
            let (engine, _) = build_engine(config).await?;
            let report = engine
                .run_grading(scope, timeout_secs.map(Duration::from_secs))
                .await?;
            print_report(&report, mode)
        }
        Commands::Verify { pick_id } => {
            let (engine, _) = build_engine(config).await?;
            let proof = engine.get_ledger_proof(pick_id).await?;
            let verification = &proof.verification;
            if mode == OutputMode::Json {
                println!("{}", serde_json::to_string_pretty(verification)?);
            } else if verification.valid {
                output::print_success(&format!(
                    "Chain valid: {} entries for {}",
                    verification.entries, pick_id
                ));
            } else {
                output::print_error(&format!(
                    "Chain INVALID at sequence {}: {}",
                    verification.first_invalid_sequence.unwrap_or_default(),
                    verification.reason.as_deref().unwrap_or("unknown"),
                ));
            }
            if !verification.valid {
                bail!("ledger chain for {pick_id} failed verification");
            }
            Ok(())
        }
        Commands::Proof { pick_id } => {
            let (engine, _) = build_engine(config).await?;
            let proof = engine.get_ledger_proof(pick_id).await?;
            print_proof(&proof, mode)
        }
        Commands::Score { creator_id, force } => {
            let (engine, _) = build_engine(config).await?;
            let score = engine.get_transparency_score(creator_id, force).await?;
            output::print_kv("Creator", creator_id, mode);
            output::print_kv("Score", score.score, mode);
            output::print_kv("Computed", score.computed_at, mode);
            let b = &score.breakdown;
            let rows = vec![
                component_row("verified_rate", &b.verified_rate),
                component_row("win_consistency", &b.win_consistency),
                component_row("clv", &b.clv),
                component_row("edit_penalty", &b.edit_penalty),
                component_row("complaint_score", &b.complaint_score),
            ];
            output::print_rows(&rows, &score, mode)
        }
        Commands::Stats { creator_id } => {
            let (engine, _) = build_engine(config).await?;
            let stats = engine.get_creator_stats(creator_id).await?;
            let rows = vec![
                FieldRow { field: "total_picks", value: stats.total_picks.to_string() },
                FieldRow { field: "verified_picks", value: stats.verified_picks.to_string() },
                FieldRow { field: "graded_picks", value: stats.graded_picks.to_string() },
                FieldRow {
                    field: "record",
                    value: format!("{}-{}-{}", stats.wins, stats.losses, stats.pushes),
                },
                FieldRow { field: "units_risked", value: stats.units_risked.to_string() },
                FieldRow { field: "units_won", value: stats.units_won.to_string() },
                FieldRow { field: "win_rate", value: format!("{:.1}%", stats.win_rate * 100.0) },
                FieldRow { field: "roi", value: format!("{:.1}%", stats.roi * 100.0) },
            ];
            output::print_rows(&rows, &stats, mode)
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PostgresStore> {
    PostgresStore::new(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to database")
}

/// Postgres-backed engine; grading is enabled when a sports-data endpoint is configured
pub async fn build_engine(
    config: &AppConfig,
) -> anyhow::Result<(Arc<IntegrityEngine>, PostgresStore)> {
    let store = connect(config).await?;

    let sports_data: Option<Arc<dyn SportsDataProvider>> = if config.sports_data.base_url.is_some()
    {
        Some(Arc::new(HttpSportsData::new(&config.sports_data)?))
    } else {
        warn!("sports_data.base_url not set; grading and market odds lookups are disabled");
        None
    };

    let shared = Arc::new(store.clone());
    let engine = IntegrityEngine::new(
        shared.clone(),
        shared,
        sports_data,
        Arc::new(SystemClock),
        config,
    );
    Ok((Arc::new(engine), store))
}

async fn serve(config: &AppConfig, bind: Option<String>, migrate: bool) -> anyhow::Result<()> {
    let (engine, store) = build_engine(config).await?;
    if migrate {
        store.migrate().await?;
    }

    let state = AppState::new(engine, Some(store));
    let app = create_router(state);

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

fn component_row(name: &'static str, c: &ScoreComponent) -> ComponentRow {
    ComponentRow {
        component: name,
        value: format!("{:.3}", c.value),
        weight: format!("{:.2}", c.weight),
        weighted: format!("{:.3}", c.weighted),
    }
}

fn print_report(report: &GradingReport, mode: OutputMode) -> anyhow::Result<()> {
    output::print_kv(
        "Graded / skipped / errored",
        format!("{} / {} / {}", report.graded, report.skipped, report.errored),
        mode,
    );
    let rows: Vec<GradeRow> = report
        .outcomes
        .iter()
        .map(|o| {
            let (status, detail) = match &o.status {
                PickGradeStatus::Graded {
                    result,
                    fraud_score,
                } => (
                    "graded",
                    match fraud_score {
                        Some(score) => format!("{result} (fraud {score})"),
                        None => result.to_string(),
                    },
                ),
                PickGradeStatus::Skipped { reason } => ("skipped", reason.clone()),
                PickGradeStatus::Errored { reason } => ("errored", reason.clone()),
            };
            GradeRow {
                pick_id: o.pick_id,
                creator_id: o.creator_id,
                status: status.to_string(),
                detail,
            }
        })
        .collect();
    output::print_rows(&rows, report, mode)
}

fn print_proof(proof: &LedgerProof, mode: OutputMode) -> anyhow::Result<()> {
    output::print_kv("Chain valid", proof.chain_valid, mode);
    let rows: Vec<LedgerRow> = proof
        .entries
        .iter()
        .map(|e| LedgerRow {
            sequence: e.sequence,
            action: e.action.to_string(),
            hash: short_hash(&e.hash),
            previous_hash: e.previous_hash.as_deref().map(short_hash).unwrap_or_default(),
            created_at: e.created_at.to_rfc3339(),
        })
        .collect();
    output::print_rows(&rows, proof, mode)
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(16).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_truncates() {
        assert_eq!(short_hash(&"a".repeat(64)).len(), 16);
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn component_row_formats_values() {
        let row = component_row("clv", &ScoreComponent::new(0.5, 0.15));
        assert_eq!(row.value, "0.500");
        assert_eq!(row.weight, "0.15");
        assert_eq!(row.weighted, "0.075");
    }
}
