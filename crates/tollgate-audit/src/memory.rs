//! In-memory implementation of `AuditLog`.
//!
//! `InMemoryAuditLog` keeps all entries in a `Vec` behind a `Mutex`, so the
//! gateway can append from any number of sessions. It is the default sink
//! when no audit file is configured, and the one tests use.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use tollgate_contracts::{audit::AuditRecord, error::TollgateResult};
use tollgate_core::traits::AuditLog;

use crate::{
    chain::{head_hash, seal, verify_chain},
    event::AuditEntry,
};

/// An in-memory, append-only audit log backed by a SHA-256 hash chain.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    pub(crate) entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    /// An empty log whose first entry will link to `GENESIS_HASH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every entry, in chain order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the in-memory chain has not been tampered with.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.entries.lock().unwrap_or_else(PoisonError::into_inner)).is_ok()
    }

    /// The `this_hash` of the last entry; a compact commitment to the whole log.
    pub fn terminal_hash(&self) -> String {
        head_hash(&self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> TollgateResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = entries.len() as u64;
        let entry = seal(sequence, record, &head_hash(&entries))?;

        debug!(
            sequence,
            request_id = %record.request_id,
            verdict = %record.verdict,
            reason_code = %record.reason_code,
            "audit record appended"
        );
        entries.push(entry);
        Ok(())
    }

    fn replay(&self) -> TollgateResult<Vec<AuditRecord>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        verify_chain(&entries)?;
        Ok(entries.iter().map(|e| e.record.clone()).collect())
    }
}
