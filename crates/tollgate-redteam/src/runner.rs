//! The attack corpus runner.
//!
//! Each case moves through `PENDING → SENT → CLASSIFIED`:
//!
//!   Pending: case queued
//!   Sent:    payload delivered to the agent's chat channel as one exchange
//!   Classified: response + the exchange's audit records judged by the classifier
//!
//! The runner never talks to the gateway directly. It sees what the agent
//! did only through audit records tagged with the exchange id.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use tollgate_contracts::{
    action::Verdict,
    attack::AttackCase,
    error::TollgateResult,
    principal::{Exchange, Principal},
    report::{CaseOutcome, CaseState, CorpusRunReport, Evidence, Expectation},
};
use tollgate_core::{
    config::RunnerConfig,
    traits::{AuditLog, ChatChannel, PolicyResolver},
};
use tollgate_verify::VerdictClassifier;

/// Drives a corpus through a chat channel and builds the report.
pub struct CorpusRunner {
    principal: Principal,
    resolver: Arc<dyn PolicyResolver>,
    audit: Arc<dyn AuditLog>,
    classifier: VerdictClassifier,
}

impl CorpusRunner {
    /// A runner acting as `principal`.
    pub fn new(
        principal: Principal,
        resolver: Arc<dyn PolicyResolver>,
        audit: Arc<dyn AuditLog>,
        classifier: VerdictClassifier,
    ) -> Self {
        Self { principal, resolver, audit, classifier }
    }

    /// A runner acting as the principal named in `config`.
    pub fn from_config(
        config: &RunnerConfig,
        resolver: Arc<dyn PolicyResolver>,
        audit: Arc<dyn AuditLog>,
        classifier: VerdictClassifier,
    ) -> Self {
        let principal = match &config.customer_id {
            Some(customer) => Principal::for_customer(config.agent_id.clone(), customer.clone()),
            None => Principal::agent(config.agent_id.clone()),
        };
        Self::new(principal, resolver, audit, classifier)
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Run every case in order and return the report.
    ///
    /// # Errors
    ///
    /// `PolicyNotFound` if the runner's principal has no policy, and any
    /// audit replay failure. A failing channel is not an error: the case is
    /// classified `BLOCKED` with ambiguous evidence.
    pub fn run(&self, cases: &[AttackCase], channel: &dyn ChatChannel) -> TollgateResult<CorpusRunReport> {
        let initial = self.resolver.resolve(&self.principal)?;
        let mut report = CorpusRunReport::new(initial.policy_id.clone(), self.classifier.pattern_set_version());

        info!(
            cases = cases.len(),
            principal = %self.principal,
            policy_id = %initial.policy_id,
            "corpus run starting"
        );

        for case in cases {
            let outcome = self.run_case(case, channel)?;
            report.record(outcome);
        }
        report.finished_at = Utc::now();

        let totals = report.totals();
        info!(
            total = totals.total,
            blocked = totals.blocked,
            allowed = totals.allowed,
            violations = totals.violations,
            mismatches = totals.mismatches,
            "corpus run finished"
        );
        Ok(report)
    }

    fn run_case(&self, case: &AttackCase, channel: &dyn ChatChannel) -> TollgateResult<CaseOutcome> {
        let mut state = CaseState::Pending;
        debug!(case_id = %case.id, category = %case.category, state = ?state, "case queued");

        let exchange = Exchange::new(self.principal.clone(), case.payload.clone());
        let reply = channel.exchange(&exchange);
        state = CaseState::Sent;
        debug!(case_id = %case.id, exchange_id = %exchange.id, state = ?state, "payload sent");

        let records = self.audit.records_for_exchange(exchange.id)?;
        // Re-resolve so a policy replaced mid-run is judged by its new version.
        let policy = self.resolver.resolve(&self.principal)?;

        let (verdict, violation, evidence) = match reply {
            Ok(response) => {
                let c = self.classifier.classify(&response, &records, &policy);
                (c.verdict, c.violation, c.evidence)
            }
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "chat channel failed; classifying fail-closed");
                let mut evidence = self.classifier.classify("", &records, &policy).evidence;
                evidence.push(Evidence::Ambiguous {
                    detail: format!("chat channel failed: {e}"),
                });
                (Verdict::Blocked, false, evidence)
            }
        };
        state = CaseState::Classified;

        let expectation = Expectation::evaluate(case.expected_verdict, verdict);
        if let Expectation::Mismatched { expected } = expectation {
            warn!(case_id = %case.id, expected = %expected, actual = %verdict, "case missed expected verdict");
        }
        debug!(case_id = %case.id, verdict = %verdict, violation, state = ?state, "case classified");

        Ok(CaseOutcome {
            case: case.clone(),
            state,
            verdict,
            violation,
            evidence,
            expectation,
            audit_records: records.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use serde_json::json;

    use tollgate_audit::InMemoryAuditLog;
    use tollgate_contracts::{
        action::{ExecutionOutcome, ReasonCode},
        attack::AttackCategory,
        audit::AuditRecord,
        error::TollgateError,
        policy::{DataScope, Policy},
        principal::RequestId,
    };
    use tollgate_verify::PatternSet;

    use super::*;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    fn policy() -> Arc<Policy> {
        Arc::new(Policy {
            policy_id: "support-v1".to_string(),
            version: 1,
            description: String::new(),
            allowed_actions: ["lookup"].iter().map(|s| s.to_string()).collect(),
            blocked_actions: ["wipe"].iter().map(|s| s.to_string()).collect(),
            data_scope: DataScope::RequestingPrincipalOnly,
            blocked_fields: ["ssn"].iter().map(|s| s.to_string()).collect(),
            pii_fields: BTreeSet::new(),
            identity_arguments: vec![],
            rate_limit: None,
        })
    }

    struct FixedResolver(Option<Arc<Policy>>);

    impl PolicyResolver for FixedResolver {
        fn resolve(&self, _principal: &Principal) -> TollgateResult<Arc<Policy>> {
            self.0.clone().ok_or_else(|| TollgateError::PolicyNotFound { policy_id: "none".to_string() })
        }
    }

    /// A channel that writes scripted audit records and replies with a
    /// scripted response, keyed by payload.
    struct ScriptedChannel {
        audit: Arc<InMemoryAuditLog>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedChannel {
        fn record(&self, exchange: &Exchange, action: &str, blocked: bool) {
            self.audit
                .append(&AuditRecord {
                    timestamp: Utc::now(),
                    request_id: RequestId::new(),
                    exchange_id: Some(exchange.id),
                    principal: exchange.principal.clone(),
                    action_name: action.to_string(),
                    verdict: if blocked { Verdict::Blocked } else { Verdict::Allowed },
                    reason_code: if blocked { ReasonCode::ExplicitDeny } else { ReasonCode::Authorized },
                    policy_id: "support-v1".to_string(),
                    execution: if blocked { ExecutionOutcome::NotExecuted } else { ExecutionOutcome::Completed },
                    output: Some(json!({})),
                })
                .unwrap();
        }
    }

    impl ChatChannel for ScriptedChannel {
        fn exchange(&self, exchange: &Exchange) -> TollgateResult<String> {
            self.seen.lock().unwrap().push(exchange.message.clone());
            match exchange.message.as_str() {
                "wipe it" => {
                    self.record(exchange, "wipe", true);
                    Ok("I can't do that.".to_string())
                }
                "look up" => {
                    self.record(exchange, "lookup", false);
                    Ok("Found your order.".to_string())
                }
                "leak" => {
                    self.record(exchange, "lookup", false);
                    Ok("The ssn: 123-45-6789".to_string())
                }
                "crash" => Err(TollgateError::ChannelFailed { reason: "completion timed out".to_string() }),
                _ => Ok("Hello!".to_string()),
            }
        }
    }

    fn case(id: &str, category: AttackCategory, payload: &str, expected: Option<Verdict>) -> AttackCase {
        AttackCase {
            id: id.to_string(),
            category,
            payload: payload.to_string(),
            expected_verdict: expected,
        }
    }

    fn setup(resolver: FixedResolver) -> (CorpusRunner, ScriptedChannel) {
        let audit = Arc::new(InMemoryAuditLog::new());
        let runner = CorpusRunner::new(
            Principal::for_customer("support", "42"),
            Arc::new(resolver),
            audit.clone(),
            VerdictClassifier::new(Arc::new(PatternSet::new()), "[REDACTED]"),
        );
        let channel = ScriptedChannel { audit, seen: Mutex::new(vec![]) };
        (runner, channel)
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    #[test]
    fn outcomes_follow_input_order_and_classification() {
        let (runner, channel) = setup(FixedResolver(Some(policy())));
        let cases = vec![
            case("a", AttackCategory::UnauthorizedAction, "wipe it", Some(Verdict::Blocked)),
            case("b", AttackCategory::Jailbreak, "look up", Some(Verdict::Allowed)),
            case("c", AttackCategory::InfoExtraction, "leak", Some(Verdict::Blocked)),
            case("d", AttackCategory::Injection, "hi", Some(Verdict::Blocked)),
        ];

        let report = runner.run(&cases, &channel).unwrap();

        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.case.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(*channel.seen.lock().unwrap(), vec!["wipe it", "look up", "leak", "hi"]);

        let a = &report.outcomes[0];
        assert_eq!(a.verdict, Verdict::Blocked);
        assert_eq!(a.state, CaseState::Classified);
        assert_eq!(a.audit_records, 1);
        assert_eq!(a.expectation, Expectation::Met);

        assert_eq!(report.outcomes[1].verdict, Verdict::Allowed);

        let c = &report.outcomes[2];
        assert_eq!(c.verdict, Verdict::Blocked);
        assert!(c.violation);

        let d = &report.outcomes[3];
        assert_eq!(d.verdict, Verdict::Allowed);
        assert_eq!(d.audit_records, 0);
        assert_eq!(d.expectation, Expectation::Mismatched { expected: Verdict::Blocked });

        assert_eq!(report.policy_id, "support-v1");
        assert_eq!(report.pattern_set_version, tollgate_verify::PATTERN_SET_VERSION);
        assert!(report.has_mismatches());
        assert!(report.has_violations());
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn channel_failure_is_blocked_with_ambiguous_evidence() {
        let (runner, channel) = setup(FixedResolver(Some(policy())));
        let report = runner
            .run(&[case("x", AttackCategory::Injection, "crash", None)], &channel)
            .unwrap();

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.verdict, Verdict::Blocked);
        assert!(!outcome.violation);
        match &outcome.evidence[..] {
            [Evidence::Ambiguous { detail }] => assert!(detail.contains("completion timed out")),
            other => panic!("expected one Ambiguous item, got {:?}", other),
        }
    }

    #[test]
    fn unresolvable_principal_aborts_run() {
        let (runner, channel) = setup(FixedResolver(None));
        let result = runner.run(&[case("x", AttackCategory::Injection, "hi", None)], &channel);
        assert!(matches!(result, Err(TollgateError::PolicyNotFound { .. })));
        assert!(channel.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn from_config_builds_principal() {
        let config = RunnerConfig {
            agent_id: "support".to_string(),
            customer_id: None,
            corpus: None,
            report: None,
        };
        let runner = CorpusRunner::from_config(
            &config,
            Arc::new(FixedResolver(Some(policy()))),
            Arc::new(InMemoryAuditLog::new()),
            VerdictClassifier::new(Arc::new(PatternSet::new()), "[REDACTED]"),
        );
        assert_eq!(runner.principal(), &Principal::agent("support"));
    }
}
