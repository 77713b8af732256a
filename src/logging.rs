use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,pickguard=debug,sqlx=warn";

/// Initialize console logging plus an optional daily-rotated log file.
///
/// `RUST_LOG` wins over the configured level. The file layer is enabled when
/// `PICKGUARD_LOG_DIR` or `logging.dir` names a writable directory. Keep the
/// returned guard alive for the life of the process so buffered lines flush.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.level.is_empty() || config.level == "info" {
            EnvFilter::new(DEFAULT_FILTER)
        } else {
            EnvFilter::new(&config.level)
        }
    });

    let log_dir = std::env::var("PICKGUARD_LOG_DIR")
        .ok()
        .or_else(|| config.dir.clone());

    // `rolling::daily` panics when it cannot create its first file, so check
    // writability up front.
    let (file_layer, guard) = match log_dir.as_deref().filter(|dir| writable_dir(dir)) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "pickguard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => {
            if let Some(dir) = &log_dir {
                eprintln!(
                    "Warning: Could not write to log directory {}, file logging disabled",
                    dir
                );
            }
            (None, None)
        }
    };

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let file_logging_enabled = file_layer.is_some();
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed && file_logging_enabled {
        tracing::info!(dir = ?log_dir, "File logging enabled");
    }
    guard
}

/// Warnings-only console logging for one-shot CLI commands
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

fn writable_dir(dir: &str) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = Path::new(dir).join(".pickguard_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_dir_accepts_temp_and_rejects_files() {
        let dir = std::env::temp_dir().join(format!("pickguard-log-{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();
        assert!(writable_dir(&dir_str));

        let file = dir.join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(!writable_dir(&file.to_string_lossy()));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
