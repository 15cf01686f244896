//! Core trait definitions for the Tollgate gateway.
//!
//! These traits define the trust boundary around every tool call:
//!
//! - `Tool`: untrusted capability (knows nothing about policy)
//! - `ChatChannel`: untrusted agent entry point (may be backed by an LLM)
//! - `PolicyResolver`: trusted lookup from principal to policy
//! - `AuditLog`: trusted append-only sink for decisions
//! - `Redactor`: trusted filter applied to every tool result
//!
//! The gateway wires them together. A `Tool` is never executed unless the
//! resolved policy, the rate limiter, and the scope check all permit it.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use tollgate_contracts::{
    action::Arguments,
    audit::AuditRecord,
    error::{TollgateResult, ToolError},
    policy::Policy,
    principal::{Exchange, ExchangeId, Principal},
    tool::ToolDescriptor,
};

/// A concrete action an agent may perform.
///
/// Implementations are external collaborators: database lookups, email
/// senders, payment processors. Enforcement is entirely the gateway's job.
pub trait Tool: Send + Sync {
    /// The fixed description this tool is registered under.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run the tool. Only called after authorization and argument validation.
    fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

/// An agent's normal chat entry point.
///
/// The agent may issue any number of gateway calls while handling one
/// exchange; it must tag each `ActionRequest` with `exchange.id`.
pub trait ChatChannel: Send + Sync {
    /// Handle one user message and return the final response text.
    fn exchange(&self, exchange: &Exchange) -> TollgateResult<String>;
}

/// Maps a principal to the policy governing it.
pub trait PolicyResolver: Send + Sync {
    /// Return the policy bound to `principal`.
    ///
    /// Returns `TollgateError::PolicyNotFound` when nothing is bound; the
    /// gateway refuses to serve such a principal.
    fn resolve(&self, principal: &Principal) -> TollgateResult<Arc<Policy>>;
}

/// The append-only decision record.
///
/// Every gateway decision produces exactly one `AuditRecord` appended here.
/// A failed append is fatal for that request.
pub trait AuditLog: Send + Sync {
    /// Append one record. Records are never modified or deleted.
    fn append(&self, record: &AuditRecord) -> TollgateResult<()>;

    /// Read every record back in append order.
    fn replay(&self) -> TollgateResult<Vec<AuditRecord>>;

    /// Records tagged with the given exchange, in append order.
    fn records_for_exchange(&self, exchange_id: ExchangeId) -> TollgateResult<Vec<AuditRecord>> {
        Ok(self
            .replay()?
            .into_iter()
            .filter(|r| r.exchange_id == Some(exchange_id))
            .collect())
    }
}

/// Masks disallowed fields in data surfaced to a caller.
pub trait Redactor: Send + Sync {
    /// Return `result` with every occurrence of a blocked field masked.
    ///
    /// `blocked_fields` holds lowercase field names.
    fn redact(&self, result: &Value, blocked_fields: &BTreeSet<String>) -> Value;
}
