//! Audit record type.
//!
//! The gateway produces exactly one `AuditRecord` per request it evaluates.
//! Audit logs append records and never modify or delete them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    action::{ExecutionOutcome, ReasonCode, Verdict},
    principal::{ExchangeId, Principal, RequestId},
};

/// An immutable record of one gateway decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Time the decision was recorded (UTC).
    pub timestamp: DateTime<Utc>,
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<ExchangeId>,
    pub principal: Principal,
    pub action_name: String,
    pub verdict: Verdict,
    pub reason_code: ReasonCode,
    pub policy_id: String,
    /// Whether the tool ran, and how that went.
    pub execution: ExecutionOutcome,
    /// The redacted tool output, with PII fields additionally masked.
    /// Absent for refusals, tool failures, and when output capture is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}
