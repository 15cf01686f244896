//! Audit entry type.
//!
//! `AuditEntry` is a single link in the hash chain: it wraps an
//! `AuditRecord` with its position and the SHA-256 hashes that make
//! tampering detectable. One entry is one line of a JSON Lines log.

use serde::{Deserialize, Serialize};

use tollgate_contracts::audit::AuditRecord;

/// A single entry in the SHA-256 hash chain.
///
/// Each entry commits to the previous one via `prev_hash`. Modifying any
/// field, including those of the embedded `record`, invalidates `this_hash`
/// and every subsequent `prev_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The gateway decision being recorded.
    pub record: AuditRecord,

    /// Hash (hex) of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash (hex) over (sequence, prev_hash, canonical JSON of record).
    pub this_hash: String,
}

impl AuditEntry {
    /// The `prev_hash` of the first entry in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}
