#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use pickguard::adapters::{SportsDataProvider, StaticCreatorDirectory};
use pickguard::clock::ManualClock;
use pickguard::config::AppConfig;
use pickguard::domain::{BetType, CreatePickRequest, GameRef};
use pickguard::persistence::MemoryStore;
use pickguard::IntegrityEngine;
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct TestEnv {
    pub engine: Arc<IntegrityEngine>,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<StaticCreatorDirectory>,
    pub clock: Arc<ManualClock>,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 12, 17, 0, 0).unwrap()
}

pub fn env() -> TestEnv {
    env_with(None)
}

pub fn env_with(provider: Option<Arc<dyn SportsDataProvider>>) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticCreatorDirectory::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let engine = IntegrityEngine::new(
        store.clone(),
        directory.clone(),
        provider,
        clock.clone(),
        &AppConfig::default_config(),
    );
    TestEnv {
        engine: Arc::new(engine),
        store,
        directory,
        clock,
    }
}

/// Straight moneyline starting two hours after `t0`
pub fn moneyline(odds: i64, units: Decimal, unit_value: Decimal) -> CreatePickRequest {
    CreatePickRequest {
        sport: Some("NFL".into()),
        game: GameRef {
            id: Some("nfl-kc-buf".into()),
            description: Some("Chiefs @ Bills".into()),
        },
        bet_type: Some(BetType::Moneyline),
        selection: Some("Chiefs".into()),
        odds_american: Some(odds),
        units_risked: Some(units),
        unit_value: Some(unit_value),
        game_start_time: Some(t0() + Duration::hours(2)),
        market_odds_american: Some(odds),
        ..Default::default()
    }
}
