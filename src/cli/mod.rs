//! Operator command line: serve the API, run migrations, grade picks and
//! inspect ledgers and scores.

pub mod commands;
pub mod output;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pickguard")]
#[command(version)]
#[command(about = "Pick integrity and verification engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "PICKGUARD_CONFIG_DIR")]
    pub config: String,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override server.bind
        #[arg(long)]
        bind: Option<String>,
        /// Apply pending migrations before serving
        #[arg(long)]
        migrate: bool,
    },
    /// Apply database migrations
    Migrate,
    /// Grade pending picks for a date range or a single game
    Grade {
        /// Start of the game-start window (RFC 3339)
        #[arg(long, requires = "to", conflicts_with = "game")]
        from: Option<DateTime<Utc>>,
        /// End of the game-start window (RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
        /// Provider game id
        #[arg(long)]
        game: Option<String>,
        /// Stop scheduling picks after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Verify the ledger chain of a pick
    Verify { pick_id: Uuid },
    /// Print the ledger entries of a pick
    Proof { pick_id: Uuid },
    /// Show a creator's transparency score
    Score {
        creator_id: Uuid,
        /// Recompute even when the cached score is fresh
        #[arg(long)]
        force: bool,
    },
    /// Show a creator's record
    Stats { creator_id: Uuid },
}
