//! # tollgate-audit
//!
//! Append-only, SHA-256 hash-chained audit log for gateway decisions.
//!
//! ## Overview
//!
//! Every `AuditRecord` the gateway produces is wrapped in an `AuditEntry`
//! that links to the previous entry via its SHA-256 hash. Tampering with any
//! entry, even a single byte, breaks the chain and is reported by
//! `verify_chain` as `AuditCorrupt`.
//!
//! Two sinks implement [`AuditLog`](tollgate_core::traits::AuditLog):
//! [`InMemoryAuditLog`] and the file-backed [`JsonlAuditLog`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollgate_audit::JsonlAuditLog;
//! use tollgate_core::traits::AuditLog;
//!
//! let log = JsonlAuditLog::open("audit.jsonl")?;
//! log.append(&record)?;
//! let records = log.replay()?; // verifies the chain
//! ```

use std::sync::Arc;

use tollgate_contracts::error::TollgateResult;
use tollgate_core::{config::AuditConfig, traits::AuditLog};

pub mod chain;
pub mod event;
pub mod jsonl;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::AuditEntry;
pub use jsonl::{read_entries, replay_entries, JsonlAuditLog};
pub use memory::InMemoryAuditLog;

/// Open the audit sink described by `config`: a JSON Lines file when a path
/// is set, otherwise an in-memory log.
pub fn open_audit_log(config: &AuditConfig) -> TollgateResult<Arc<dyn AuditLog>> {
    match &config.path {
        Some(path) => Ok(Arc::new(JsonlAuditLog::open(path.clone())?)),
        None => Ok(Arc::new(InMemoryAuditLog::new())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
