pub mod adapters;
pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fraud;
pub mod grading;
pub mod ledger;
pub mod lifecycle;
pub mod logging;
pub mod odds;
pub mod persistence;
pub mod transparency;
pub mod validation;

pub use adapters::{
    CreatorDirectory, CreatorProfile, HttpSportsData, PostgresStore, ResolvedOutcome,
    SportsDataProvider, StaticCreatorDirectory,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use engine::IntegrityEngine;
pub use error::{PickguardError, Result};
pub use fraud::FraudHeuristics;
pub use grading::{GradingJob, GradingReport, PickGradeOutcome, PickGradeStatus};
pub use ledger::{hash_snapshot, verify_entries, Ledger};
pub use lifecycle::{GradeOutcome, PickLifecycle};
pub use persistence::{MemoryStore, PickStore};
pub use transparency::TransparencyService;
