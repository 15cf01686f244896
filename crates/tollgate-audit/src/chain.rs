//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the record (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use tollgate_contracts::{
    audit::AuditRecord,
    error::{TollgateError, TollgateResult},
};

use crate::event::AuditEntry;

/// Compute the SHA-256 hash for one entry.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(sequence: u64, record: &AuditRecord, prev_hash: &str) -> TollgateResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| TollgateError::AuditWriteFailed {
        reason: format!("audit record is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Build the next entry of a chain whose last hash is `prev_hash`.
pub fn seal(sequence: u64, record: &AuditRecord, prev_hash: &str) -> TollgateResult<AuditEntry> {
    let this_hash = hash_entry(sequence, record, prev_hash)?;
    Ok(AuditEntry {
        sequence,
        record: record.clone(),
        prev_hash: prev_hash.to_string(),
        this_hash,
    })
}

/// Verify the integrity of a hash chain.
///
/// Checks, for every entry in order:
///
/// 1. **Position**: `sequence` equals its index.
/// 2. **Linkage**: `prev_hash` equals the previous `this_hash` (or
///    `GENESIS_HASH` for entry 0).
/// 3. **Hash correctness**: `this_hash` matches the value recomputed from
///    the entry's own fields.
///
/// Returns `AuditCorrupt` naming the first entry that fails. An empty chain
/// is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> TollgateResult<()> {
    let mut expected_prev = AuditEntry::GENESIS_HASH.to_string();

    for (index, entry) in entries.iter().enumerate() {
        let corrupt = |reason: &str| TollgateError::AuditCorrupt {
            sequence: entry.sequence,
            reason: reason.to_string(),
        };

        if entry.sequence != index as u64 {
            return Err(corrupt(&format!("expected sequence {index}")));
        }
        if entry.prev_hash != expected_prev {
            return Err(corrupt("prev_hash does not link to the preceding entry"));
        }
        let recomputed = hash_entry(entry.sequence, &entry.record, &entry.prev_hash)?;
        if entry.this_hash != recomputed {
            return Err(corrupt("this_hash does not match entry contents"));
        }

        expected_prev = entry.this_hash.clone();
    }

    Ok(())
}

/// The `this_hash` of the last entry, or `GENESIS_HASH` for an empty chain.
pub fn head_hash(entries: &[AuditEntry]) -> String {
    entries
        .last()
        .map(|e| e.this_hash.clone())
        .unwrap_or_else(|| AuditEntry::GENESIS_HASH.to_string())
}
