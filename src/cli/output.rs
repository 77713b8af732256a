//! Output formatting for `pickguard` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print rows as a table, or `value` as pretty JSON.
///
/// Table mode renders the flattened rows; JSON mode prints the full value so
/// nested fields survive.
pub fn print_rows<T: Tabled, V: Serialize>(
    rows: &[T],
    value: &V,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if rows.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Print a simple key-value pair (table mode only).
pub fn print_kv(key: &str, value: impl std::fmt::Display, mode: OutputMode) {
    if mode == OutputMode::Table {
        println!("{key}: {value}");
    }
}

pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m{msg}\x1b[0m");
}
