use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::canonical::hash_snapshot;
use crate::clock::Clock;
use crate::domain::{ChainVerification, LedgerAction, LedgerEntry, LedgerProof};
use crate::error::{PickguardError, Result};
use crate::persistence::{PickStore, PickWrite};

/// Append-only hash chain over a `PickStore`
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn PickStore>,
    clock: Arc<dyn Clock>,
    max_append_retries: u32,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn PickStore>,
        clock: Arc<dyn Clock>,
        max_append_retries: u32,
    ) -> Self {
        Self {
            store,
            clock,
            max_append_retries: max_append_retries.max(1),
        }
    }

    /// Run a read-modify-append against the current chain tail.
    ///
    /// `attempt` gets the tail, loads whatever state it depends on, and appends
    /// through [`Ledger::append_after`]. When another writer (possibly in
    /// another process) appended first, the whole attempt is run again from a
    /// fresh tail so the mutation is recomputed, never replayed.
    pub async fn retry_on_conflict<T, F, Fut>(
        &self,
        resource_id: Uuid,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut(Option<LedgerEntry>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            let tail = self.store.latest_entry(resource_id).await?;
            match attempt(tail).await {
                Err(PickguardError::SequenceConflict { sequence, .. })
                    if tries < self.max_append_retries =>
                {
                    warn!(
                        %resource_id,
                        sequence,
                        attempt = tries,
                        "Ledger sequence taken, recomputing mutation"
                    );
                }
                other => return other,
            }
        }
    }

    /// Append the entry that directly follows `tail` and apply `write` with it.
    ///
    /// Fails with `SequenceConflict` when `tail` is no longer the latest entry.
    #[instrument(skip(self, tail, snapshot, action, write), fields(action = %action))]
    pub async fn append_after(
        &self,
        tail: Option<&LedgerEntry>,
        resource_id: Uuid,
        snapshot: Value,
        action: LedgerAction,
        write: PickWrite<'_>,
    ) -> Result<LedgerEntry> {
        let hash = hash_snapshot(&snapshot)?;
        let (sequence, previous_hash) = match tail {
            Some(prev) => (prev.sequence + 1, Some(prev.hash.clone())),
            None => (1, None),
        };

        let entry = LedgerEntry {
            resource_id,
            sequence,
            hash,
            previous_hash,
            snapshot,
            action,
            created_at: self.clock.now(),
        };

        self.store.append_ledger(&entry, write).await?;
        debug!(%resource_id, sequence, "Ledger entry appended");
        Ok(entry)
    }

    /// Walk the chain in sequence order. Tampering is reported, never raised.
    pub async fn verify_chain(&self, resource_id: Uuid) -> Result<ChainVerification> {
        let entries = self.store.ledger_entries(resource_id).await?;
        Ok(verify_entries(&entries))
    }

    /// Like `verify_chain` but an invalid chain becomes `ChainInvalid`
    pub async fn ensure_valid(&self, resource_id: Uuid) -> Result<ChainVerification> {
        let verification = self.verify_chain(resource_id).await?;
        if verification.valid {
            return Ok(verification);
        }
        Err(PickguardError::ChainInvalid {
            resource_id,
            sequence: verification.first_invalid_sequence.unwrap_or_default(),
            reason: verification.reason.unwrap_or_default(),
        })
    }

    /// Entries plus verdict for an external auditor
    pub async fn proof(&self, resource_id: Uuid) -> Result<LedgerProof> {
        let entries = self.store.ledger_entries(resource_id).await?;
        if entries.is_empty() {
            return Err(PickguardError::NotFound(format!(
                "ledger for {resource_id}"
            )));
        }
        let verification = verify_entries(&entries);
        if !verification.valid {
            warn!(%resource_id, reason = ?verification.reason, "Ledger chain failed verification");
        } else {
            info!(%resource_id, entries = entries.len(), "Ledger chain verified");
        }
        Ok(LedgerProof {
            resource_id,
            chain_valid: verification.valid,
            entries,
            verification,
        })
    }
}

/// Check hash recomputation, previous-hash linkage and contiguity from 1
pub fn verify_entries(entries: &[LedgerEntry]) -> ChainVerification {
    let total = entries.len();
    let mut previous: Option<&LedgerEntry> = None;

    for (idx, entry) in entries.iter().enumerate() {
        let expected_sequence = idx as i64 + 1;
        if entry.sequence != expected_sequence {
            return ChainVerification::invalid(
                total,
                entry.sequence,
                format!(
                    "sequence gap: expected {expected_sequence}, found {}",
                    entry.sequence
                ),
            );
        }

        match hash_snapshot(&entry.snapshot) {
            Ok(recomputed) if recomputed == entry.hash => {}
            Ok(_) => {
                return ChainVerification::invalid(
                    total,
                    entry.sequence,
                    "snapshot hash mismatch",
                )
            }
            Err(err) => {
                return ChainVerification::invalid(
                    total,
                    entry.sequence,
                    format!("snapshot could not be encoded: {err}"),
                )
            }
        }

        let expected_previous = previous.map(|p| p.hash.as_str());
        if entry.previous_hash.as_deref() != expected_previous {
            return ChainVerification::invalid(
                total,
                entry.sequence,
                "previous_hash does not match prior entry",
            );
        }

        previous = Some(entry);
    }

    ChainVerification::valid(total)
}
