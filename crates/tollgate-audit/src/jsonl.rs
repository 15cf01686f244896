//! JSON Lines audit log.
//!
//! One `AuditEntry` per line, appended and flushed under a mutex so entries
//! land in the order decisions were made. Opening an existing file verifies
//! its chain and continues it; a corrupt file is refused rather than
//! extended. A failed write is truncated away; if that fails too the log
//! refuses every later append.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info};

use tollgate_contracts::{
    audit::AuditRecord,
    error::{TollgateError, TollgateResult},
};
use tollgate_core::traits::AuditLog;

use crate::{
    chain::{head_hash, seal, verify_chain},
    event::AuditEntry,
};

/// The append side of the log file.
trait LogFile: Write + Send {
    /// Cut the file back to `len` bytes.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct Tail {
    file: Box<dyn LogFile>,
    /// Bytes of complete entries in the file.
    len: u64,
    next_sequence: u64,
    last_hash: String,
    /// Set when a torn write could not be rolled back.
    failed: bool,
}

/// A file-backed audit log in JSON Lines format.
pub struct JsonlAuditLog {
    path: PathBuf,
    tail: Mutex<Tail>,
}

impl std::fmt::Debug for JsonlAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlAuditLog").field("path", &self.path).finish()
    }
}

impl JsonlAuditLog {
    /// Open `path` for appending, creating it and its parent directory if
    /// needed. An existing log must verify before it is extended.
    pub fn open(path: impl Into<PathBuf>) -> TollgateResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TollgateError::AuditWriteFailed {
                reason: format!("cannot create audit directory '{}': {e}", parent.display()),
            })?;
        }

        let existing = if path.exists() { replay_entries(&path)? } else { Vec::new() };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TollgateError::AuditWriteFailed {
                reason: format!("cannot open audit log '{}': {e}", path.display()),
            })?;

        let len = file
            .metadata()
            .map_err(|e| TollgateError::AuditWriteFailed {
                reason: format!("cannot stat audit log '{}': {e}", path.display()),
            })?
            .len();

        info!(
            path = %path.display(),
            existing_entries = existing.len(),
            "audit log opened"
        );

        Ok(Self {
            tail: Mutex::new(Tail {
                file: Box::new(file),
                len,
                next_sequence: existing.len() as u64,
                last_hash: head_hash(&existing),
                failed: false,
            }),
            path,
        })
    }

    /// The file this log appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    fn append(&self, record: &AuditRecord) -> TollgateResult<()> {
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        if tail.failed {
            return Err(TollgateError::AuditWriteFailed {
                reason: format!(
                    "audit log '{}' holds a partial entry from an earlier failed write",
                    self.path.display()
                ),
            });
        }
        let entry = seal(tail.next_sequence, record, &tail.last_hash)?;

        let mut line = serde_json::to_vec(&entry).map_err(|e| TollgateError::AuditWriteFailed {
            reason: format!("cannot serialize audit entry: {e}"),
        })?;
        line.push(b'\n');
        if let Err(e) = tail.file.write_all(&line).and_then(|()| tail.file.flush()) {
            let len = tail.len;
            if let Err(truncate) = tail.file.truncate_to(len) {
                error!(
                    path = %self.path.display(),
                    error = %truncate,
                    "cannot roll back partial audit entry; log disabled"
                );
                tail.failed = true;
            }
            return Err(TollgateError::AuditWriteFailed {
                reason: format!("cannot write audit log '{}': {e}", self.path.display()),
            });
        }

        debug!(
            sequence = entry.sequence,
            request_id = %record.request_id,
            verdict = %record.verdict,
            reason_code = %record.reason_code,
            "audit record appended"
        );
        tail.len += line.len() as u64;
        tail.next_sequence += 1;
        tail.last_hash = entry.this_hash;
        Ok(())
    }

    fn replay(&self) -> TollgateResult<Vec<AuditRecord>> {
        // Hold the lock so no append interleaves with the read.
        let _tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(replay_entries(&self.path)?.into_iter().map(|e| e.record).collect())
    }
}

/// Parse every line of a JSON Lines audit file without verifying the chain.
///
/// Blank lines are skipped. An unparsable line is `AuditCorrupt` with the
/// zero-based line index as its sequence.
pub fn read_entries(path: &Path) -> TollgateResult<Vec<AuditEntry>> {
    let file = File::open(path).map_err(|e| TollgateError::ConfigError {
        reason: format!("cannot open audit log '{}': {e}", path.display()),
    })?;

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| TollgateError::AuditCorrupt {
            sequence: index as u64,
            reason: format!("unreadable line: {e}"),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| TollgateError::AuditCorrupt {
            sequence: index as u64,
            reason: format!("unparsable entry: {e}"),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Read a JSON Lines audit file and verify its hash chain.
pub fn replay_entries(path: &Path) -> TollgateResult<Vec<AuditEntry>> {
    let entries = read_entries(path)?;
    verify_chain(&entries)?;
    Ok(entries)
}
