use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub transparency: TransparencyConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub sports_data: SportsDataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily rotated log file (disabled when unset)
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LifecycleConfig {
    /// Reject deletions once the game has started
    #[serde(default)]
    pub block_delete_after_lock: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Optimistic retries when another writer takes the next sequence number
    #[serde(default = "default_append_retries")]
    pub max_append_retries: u32,
}

fn default_append_retries() -> u32 {
    5
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_append_retries: default_append_retries(),
        }
    }
}

/// Fraud policy knobs. Passed into every detector call.
#[derive(Debug, Clone, Deserialize)]
pub struct FraudConfig {
    /// z-score above which a stake is an outlier
    #[serde(default = "default_outlier_z")]
    pub outlier_z_threshold: f64,
    #[serde(default = "default_outlier_medium_z")]
    pub outlier_medium_z: f64,
    #[serde(default = "default_outlier_high_z")]
    pub outlier_high_z: f64,
    /// Prior picks needed before the stake baseline is trusted
    #[serde(default = "default_outlier_min_history")]
    pub outlier_min_history: u64,
    /// Posting closer than this to game start is suspicious
    #[serde(default = "default_timing_window_secs")]
    pub timing_window_secs: i64,
    /// How many of the creator's latest picks are inspected for a timing pattern
    #[serde(default = "default_timing_recent_window")]
    pub timing_recent_window: usize,
    /// More than this many late posts in the window is a pattern
    #[serde(default = "default_timing_pattern_count")]
    pub timing_pattern_count: usize,
    /// Relative decimal-odds gap to market that counts as a mismatch (0.10 = 10%)
    #[serde(default = "default_odds_mismatch_threshold")]
    pub odds_mismatch_threshold: f64,
    #[serde(default = "default_odds_mismatch_weight")]
    pub odds_mismatch_weight: u32,
    #[serde(default = "default_edit_after_lock_weight")]
    pub edit_after_lock_weight: u32,
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: u32,
    #[serde(default = "default_exclude_threshold")]
    pub exclude_threshold: u32,
}

fn default_outlier_z() -> f64 {
    4.0
}
fn default_outlier_medium_z() -> f64 {
    5.0
}
fn default_outlier_high_z() -> f64 {
    6.0
}
fn default_outlier_min_history() -> u64 {
    3
}
fn default_timing_window_secs() -> i64 {
    60
}
fn default_timing_recent_window() -> usize {
    20
}
fn default_timing_pattern_count() -> usize {
    3
}
fn default_odds_mismatch_threshold() -> f64 {
    0.10
}
fn default_odds_mismatch_weight() -> u32 {
    2
}
fn default_edit_after_lock_weight() -> u32 {
    5
}
fn default_flag_threshold() -> u32 {
    3
}
fn default_exclude_threshold() -> u32 {
    5
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            outlier_z_threshold: default_outlier_z(),
            outlier_medium_z: default_outlier_medium_z(),
            outlier_high_z: default_outlier_high_z(),
            outlier_min_history: default_outlier_min_history(),
            timing_window_secs: default_timing_window_secs(),
            timing_recent_window: default_timing_recent_window(),
            timing_pattern_count: default_timing_pattern_count(),
            odds_mismatch_threshold: default_odds_mismatch_threshold(),
            odds_mismatch_weight: default_odds_mismatch_weight(),
            edit_after_lock_weight: default_edit_after_lock_weight(),
            flag_threshold: default_flag_threshold(),
            exclude_threshold: default_exclude_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransparencyConfig {
    #[serde(default = "default_verified_weight")]
    pub verified_weight: f64,
    #[serde(default = "default_win_weight")]
    pub win_consistency_weight: f64,
    #[serde(default = "default_clv_weight")]
    pub clv_weight: f64,
    #[serde(default = "default_edit_weight")]
    pub edit_penalty_weight: f64,
    #[serde(default = "default_complaint_weight")]
    pub complaint_weight: f64,
    /// Cached scores younger than this are reused
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,
}

fn default_verified_weight() -> f64 {
    0.40
}
fn default_win_weight() -> f64 {
    0.25
}
fn default_clv_weight() -> f64 {
    0.15
}
fn default_edit_weight() -> f64 {
    0.10
}
fn default_complaint_weight() -> f64 {
    0.10
}
fn default_freshness_hours() -> i64 {
    24
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            verified_weight: default_verified_weight(),
            win_consistency_weight: default_win_weight(),
            clv_weight: default_clv_weight(),
            edit_penalty_weight: default_edit_weight(),
            complaint_weight: default_complaint_weight(),
            freshness_hours: default_freshness_hours(),
        }
    }
}

impl TransparencyConfig {
    pub fn total_weight(&self) -> f64 {
        self.verified_weight
            + self.win_consistency_weight
            + self.clv_weight
            + self.edit_penalty_weight
            + self.complaint_weight
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
    /// Picks graded in parallel within one batch
    #[serde(default = "default_grading_concurrency")]
    pub max_concurrency: usize,
    /// Default batch timeout when the caller does not pass one
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_grading_concurrency() -> usize {
    8
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_grading_concurrency(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SportsDataConfig {
    /// Base URL of the sports-data service
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for SportsDataConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PICKGUARD_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // PICKGUARD_DATABASE__URL, PICKGUARD_FRAUD__FLAG_THRESHOLD, ...
            .add_source(
                Environment::with_prefix("PICKGUARD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for local runs and tests (in-memory store, defaults everywhere)
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/pickguard".to_string(),
                max_connections: default_max_connections(),
            },
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            ledger: LedgerConfig::default(),
            fraud: FraudConfig::default(),
            transparency: TransparencyConfig::default(),
            grading: GradingConfig::default(),
            sports_data: SportsDataConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let fraud = &self.fraud;
        if !(fraud.outlier_z_threshold < fraud.outlier_medium_z
            && fraud.outlier_medium_z < fraud.outlier_high_z)
        {
            errors.push("outlier z thresholds must be strictly increasing".to_string());
        }
        if fraud.odds_mismatch_threshold <= 0.0 {
            errors.push("odds_mismatch_threshold must be positive".to_string());
        }
        if fraud.flag_threshold > fraud.exclude_threshold {
            errors.push("flag_threshold must not exceed exclude_threshold".to_string());
        }
        if fraud.timing_window_secs <= 0 {
            errors.push("timing_window_secs must be positive".to_string());
        }

        let total = self.transparency.total_weight();
        if total > 1.0 + 1e-9 {
            errors.push(format!(
                "transparency weights sum to {total:.3}; they must not exceed 1.0"
            ));
        }
        if self.transparency.freshness_hours < 0 {
            errors.push("freshness_hours cannot be negative".to_string());
        }

        if self.grading.max_concurrency == 0 {
            errors.push("grading.max_concurrency must be at least 1".to_string());
        }
        if self.ledger.max_append_retries == 0 {
            errors.push("ledger.max_append_retries must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
