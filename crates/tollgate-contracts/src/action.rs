//! Action requests, decisions, and gateway responses.
//!
//! `ActionRequest` is what an agent hands the gateway for every tool call.
//! `ActionDecision` is the gateway's verdict on it, and `GatewayResponse`
//! pairs that decision with whatever the caller gets back.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::principal::{ExchangeId, Principal, RequestId};

/// Named tool arguments.
pub type Arguments = serde_json::Map<String, Value>;

/// A single tool-call attempt.
///
/// Built once per attempt and consumed by the gateway. The builder methods
/// take `self` by value so a request cannot change after it is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Unique id, echoed in the decision and the audit record.
    pub request_id: RequestId,
    /// The chat exchange this request was issued from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<ExchangeId>,
    /// Name of the tool the agent wants to invoke.
    pub action_name: String,
    /// Arguments for the tool.
    pub arguments: Arguments,
    /// Who the action is performed for.
    pub principal: Principal,
    /// Wall-clock time the request was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ActionRequest {
    /// Build a request stamped with the current time.
    pub fn new(principal: Principal, action_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            request_id: RequestId::new(),
            exchange_id: None,
            action_name: action_name.into(),
            arguments,
            principal,
            timestamp: Utc::now(),
        }
    }

    /// Attach the request to a chat exchange.
    pub fn in_exchange(mut self, exchange_id: ExchangeId) -> Self {
        self.exchange_id = Some(exchange_id);
        self
    }

    /// Override the request timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Outcome of evaluating a request against policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    #[serde(alias = "allowed")]
    Allowed,
    #[serde(alias = "blocked")]
    Blocked,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => f.write_str("ALLOWED"),
            Self::Blocked => f.write_str("BLOCKED"),
        }
    }
}

/// Why the gateway reached its verdict.
///
/// Every variant except `Authorized` is a refusal. Refusals are ordinary
/// values returned to the caller, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// The action passed every check.
    Authorized,
    /// The action is on the policy's blocklist.
    ExplicitDeny,
    /// The action is not on the policy's allowlist.
    NotAllowlisted,
    /// The principal exhausted its rate-limit window.
    RateLimited,
    /// The arguments reference a customer other than the principal's own.
    ScopeViolation,
}

impl ReasonCode {
    /// The wire name, e.g. `EXPLICIT_DENY`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "AUTHORIZED",
            Self::ExplicitDeny => "EXPLICIT_DENY",
            Self::NotAllowlisted => "NOT_ALLOWLISTED",
            Self::RateLimited => "RATE_LIMITED",
            Self::ScopeViolation => "SCOPE_VIOLATION",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gateway's decision for exactly one `ActionRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDecision {
    /// The request this decision answers.
    pub request_id: RequestId,
    pub verdict: Verdict,
    pub reason_code: ReasonCode,
    /// The policy the request was evaluated against.
    pub policy_id: String,
    /// Version of that policy at evaluation time.
    pub policy_version: u32,
}

impl ActionDecision {
    /// An `ALLOWED` decision.
    pub fn allowed(request_id: RequestId, policy_id: impl Into<String>, policy_version: u32) -> Self {
        Self {
            request_id,
            verdict: Verdict::Allowed,
            reason_code: ReasonCode::Authorized,
            policy_id: policy_id.into(),
            policy_version,
        }
    }

    /// A `BLOCKED` decision with the given reason.
    pub fn blocked(
        request_id: RequestId,
        reason_code: ReasonCode,
        policy_id: impl Into<String>,
        policy_version: u32,
    ) -> Self {
        Self {
            request_id,
            verdict: Verdict::Blocked,
            reason_code,
            policy_id: policy_id.into(),
            policy_version,
        }
    }

    /// True when the verdict is `ALLOWED`.
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allowed
    }
}

/// What the caller receives alongside the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    /// The tool ran; `output` has already been redacted.
    Completed { output: Value },
    /// The gateway refused the action. Only the reason code is disclosed.
    Refused { reason_code: ReasonCode },
    /// The action was authorized but the tool itself failed.
    ToolFailed { message: String },
}

/// Decision plus result, returned from every gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub decision: ActionDecision,
    pub result: ActionResult,
}

/// Whether and how the underlying tool ran, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The request was refused; no tool was called.
    NotExecuted,
    /// The tool returned a result.
    Completed,
    /// The tool was called and failed.
    ToolFailed,
}
