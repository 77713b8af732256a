//! Persistence layer for picks, the audit ledger and creator aggregates
//!
//! - `PickStore` is the storage seam every service talks to
//! - `MemoryStore` backs tests and local runs
//! - the PostgreSQL implementation lives in `adapters::postgres`

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{PickStore, PickWrite};
