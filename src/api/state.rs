use crate::adapters::PostgresStore;
use crate::engine::IntegrityEngine;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<IntegrityEngine>,

    /// Database handle for readiness probes (absent with the in-memory store)
    pub db: Option<PostgresStore>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<IntegrityEngine>, db: Option<PostgresStore>) -> Self {
        Self {
            engine,
            db,
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds().max(0)
    }
}
