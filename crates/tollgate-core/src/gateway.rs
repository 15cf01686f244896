//! The Tollgate action gateway: the policy-bound tool mediator.
//!
//! Every tool call an agent makes passes through one pipeline:
//!
//!   Resolve → Deny list → Allow list → Rate limit → Scope → [Tool::execute] → Redact → Audit
//!
//! `Tool::execute()` is NEVER called unless every check before it passes.
//! Each evaluated request produces exactly one audit record, whatever the
//! outcome. Refusals are returned as values, not errors.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use tollgate_contracts::{
    action::{
        ActionDecision, ActionRequest, ActionResult, Arguments, ExecutionOutcome,
        GatewayResponse, ReasonCode,
    },
    audit::AuditRecord,
    error::{TollgateError, TollgateResult},
    policy::{DataScope, Policy},
    principal::Principal,
};

use crate::config::GatewayConfig;
use crate::rate_limit::SlidingWindowLimiter;
use crate::registry::ToolRegistry;
use crate::traits::{AuditLog, PolicyResolver, Redactor};

/// Mediates every tool invocation against the resolved policy.
///
/// One gateway serves any number of concurrent sessions; share it through
/// an `Arc`. Rate-limit counters and the audit log are the only state that
/// outlives a single request.
pub struct ActionGateway {
    resolver: Arc<dyn PolicyResolver>,
    tools: ToolRegistry,
    redactor: Box<dyn Redactor>,
    audit: Arc<dyn AuditLog>,
    limiter: SlidingWindowLimiter,
    record_outputs: bool,
    mask_pii_in_audit: bool,
}

impl ActionGateway {
    /// Create a gateway from its trusted collaborators.
    pub fn new(
        config: &GatewayConfig,
        resolver: Arc<dyn PolicyResolver>,
        tools: ToolRegistry,
        redactor: Box<dyn Redactor>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            resolver,
            tools,
            redactor,
            audit,
            limiter: SlidingWindowLimiter::new(),
            record_outputs: config.record_outputs,
            mask_pii_in_audit: config.mask_pii_in_audit,
        }
    }

    /// The tools this gateway can dispatch to.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Authorize `request` and, if allowed, execute it.
    ///
    /// # Pipeline
    ///
    /// 1. Resolve the principal's policy; failure is `PolicyNotFound` and
    ///    nothing is audited
    /// 2. Blocklisted action → `EXPLICIT_DENY`
    /// 3. Action not allowlisted → `NOT_ALLOWLISTED`
    /// 4. Rate-limit window full → `RATE_LIMITED`
    /// 5. Identity argument outside the principal's scope → `SCOPE_VIOLATION`
    /// 6. Validate arguments and execute the tool
    /// 7. Redact the result with the policy's blocked fields
    /// 8. Append one audit record
    ///
    /// # Errors
    ///
    /// `PolicyNotFound` from step 1 and `AuditWriteFailed` from step 8.
    /// A tool failure is not an error: the decision stays `ALLOWED` and the
    /// result is `ActionResult::ToolFailed`.
    pub fn authorize_and_execute(&self, request: &ActionRequest) -> TollgateResult<GatewayResponse> {
        debug!(
            request_id = %request.request_id,
            principal = %request.principal,
            action = %request.action_name,
            "gateway request received"
        );

        // ── Step 1: Resolve policy ───────────────────────────────────────────
        let policy = self.resolver.resolve(&request.principal).map_err(|e| {
            warn!(
                request_id = %request.request_id,
                principal = %request.principal,
                error = %e,
                "no policy for principal, refusing to serve"
            );
            e
        })?;

        // ── Steps 2-5: Authorization ─────────────────────────────────────────
        if let Some(reason_code) = self.refusal(request, &policy) {
            warn!(
                request_id = %request.request_id,
                principal = %request.principal,
                action = %request.action_name,
                policy_id = %policy.policy_id,
                reason_code = %reason_code,
                "action blocked"
            );
            let decision = ActionDecision::blocked(
                request.request_id,
                reason_code,
                policy.policy_id.clone(),
                policy.version,
            );
            self.record(request, &decision, ExecutionOutcome::NotExecuted, None)?;
            return Ok(GatewayResponse {
                decision,
                result: ActionResult::Refused { reason_code },
            });
        }

        let decision =
            ActionDecision::allowed(request.request_id, policy.policy_id.clone(), policy.version);

        // ── Step 6: Tool execution ───────────────────────────────────────────
        //
        // Only reachable once every check above has passed.
        let raw = match self.tools.invoke(&request.action_name, &request.arguments) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    request_id = %request.request_id,
                    action = %request.action_name,
                    error = %e,
                    "authorized tool call failed"
                );
                self.record(request, &decision, ExecutionOutcome::ToolFailed, None)?;
                return Ok(GatewayResponse {
                    decision,
                    result: ActionResult::ToolFailed { message: e.to_string() },
                });
            }
        };

        // ── Step 7: Redaction ────────────────────────────────────────────────
        let output = self.redactor.redact(&raw, &policy.blocked_fields);

        // ── Step 8: Audit ────────────────────────────────────────────────────
        let recorded = self.record_outputs.then(|| {
            if self.mask_pii_in_audit && !policy.pii_fields.is_empty() {
                self.redactor.redact(&output, &policy.pii_fields)
            } else {
                output.clone()
            }
        });
        self.record(request, &decision, ExecutionOutcome::Completed, recorded)?;

        info!(
            request_id = %request.request_id,
            principal = %request.principal,
            action = %request.action_name,
            policy_id = %policy.policy_id,
            "action executed"
        );

        Ok(GatewayResponse {
            decision,
            result: ActionResult::Completed { output },
        })
    }

    /// The first check that refuses `request`, in pipeline order.
    fn refusal(&self, request: &ActionRequest, policy: &Policy) -> Option<ReasonCode> {
        let action = request.action_name.as_str();

        if policy.blocks(action) {
            return Some(ReasonCode::ExplicitDeny);
        }
        if !policy.allows(action) {
            return Some(ReasonCode::NotAllowlisted);
        }
        if let Some(limit) = &policy.rate_limit {
            let key = format!("{}/{}", policy.policy_id, request.principal.window_key());
            if !self.limiter.check_and_increment(&key, limit, request.timestamp) {
                return Some(ReasonCode::RateLimited);
            }
        }
        if policy.data_scope == DataScope::RequestingPrincipalOnly
            && !within_scope(&request.principal, &request.arguments, &policy.identity_arguments)
        {
            return Some(ReasonCode::ScopeViolation);
        }
        None
    }

    fn record(
        &self,
        request: &ActionRequest,
        decision: &ActionDecision,
        execution: ExecutionOutcome,
        output: Option<Value>,
    ) -> TollgateResult<()> {
        let record = AuditRecord {
            timestamp: Utc::now(),
            request_id: request.request_id,
            exchange_id: request.exchange_id,
            principal: request.principal.clone(),
            action_name: request.action_name.clone(),
            verdict: decision.verdict,
            reason_code: decision.reason_code,
            policy_id: decision.policy_id.clone(),
            execution,
            output,
        };
        self.audit.append(&record).map_err(|e| match e {
            TollgateError::AuditWriteFailed { .. } => e,
            other => TollgateError::AuditWriteFailed { reason: other.to_string() },
        })
    }
}

/// True when every identity argument present names the principal's customer.
///
/// Strings compare exactly and numbers by their decimal form. Arrays must
/// match element-wise, nulls are ignored, and any other shape is foreign.
fn within_scope(principal: &Principal, arguments: &Arguments, identity_arguments: &[String]) -> bool {
    let present: Vec<&Value> = identity_arguments
        .iter()
        .filter_map(|name| arguments.get(name))
        .filter(|v| !v.is_null())
        .collect();
    if present.is_empty() {
        return true;
    }
    match principal.customer_id.as_deref() {
        Some(own) => present.into_iter().all(|v| names_customer(v, own)),
        None => false,
    }
}

fn names_customer(value: &Value, own: &str) -> bool {
    match value {
        Value::String(s) => s == own,
        Value::Number(n) => n.to_string() == own,
        Value::Array(items) => items.iter().all(|item| names_customer(item, own)),
        Value::Null => true,
        _ => false,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
