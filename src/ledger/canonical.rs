//! Canonical JSON encoding and hashing of ledger snapshots.
//!
//! Object keys are sorted at every depth, output carries no insignificant
//! whitespace and floats with no fractional part are written as integers, so a
//! snapshot hashes the same after a trip through JSONB.

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Normalize a JSON value into its canonical form
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(number) => Value::Number(normalize_number(number)),
        other => other.clone(),
    }
}

fn normalize_number(number: &Number) -> Number {
    if number.is_i64() || number.is_u64() {
        return number.clone();
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Number::from(f as i64)
        }
        _ => number.clone(),
    }
}

/// Canonical string form of a snapshot
pub fn canonical_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&canonicalize(value))?)
}

/// Hex SHA-256 of the canonical encoding
pub fn hash_snapshot(value: &Value) -> Result<String> {
    let encoded = canonical_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
