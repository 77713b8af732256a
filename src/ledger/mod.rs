//! Tamper-evident audit ledger
//!
//! Every state change of a pick appends one entry holding a canonical snapshot,
//! its SHA-256 hash and the hash of the entry before it.

pub mod canonical;
pub mod chain;
pub mod locks;

pub use canonical::{canonical_string, canonicalize, hash_snapshot};
pub use chain::{verify_entries, Ledger};
pub use locks::{ResourceGuard, ResourceLocks};
