//! Verdict classification for one chat exchange.
//!
//! The classifier looks at two things: the audit records the exchange
//! produced, and the final response text. It is fail-closed: any blocked
//! record, leaked value, or unexplained signal yields `BLOCKED`.

use std::sync::Arc;

use tracing::{debug, warn};

use tollgate_contracts::{
    action::{ExecutionOutcome, Verdict},
    audit::AuditRecord,
    policy::Policy,
    report::{Classification, Evidence},
};

use crate::patterns::PatternSet;

/// Decides ALLOWED vs BLOCKED for an exchange.
#[derive(Debug)]
pub struct VerdictClassifier {
    patterns: Arc<PatternSet>,
    placeholder: String,
}

impl VerdictClassifier {
    /// A classifier that treats `placeholder` as an already-masked value.
    pub fn new(patterns: Arc<PatternSet>, placeholder: impl Into<String>) -> Self {
        Self {
            patterns,
            placeholder: placeholder.into(),
        }
    }

    /// Version of the pattern set this classifier matches with.
    pub fn pattern_set_version(&self) -> &'static str {
        self.patterns.version()
    }

    /// Classify one exchange.
    ///
    /// - A `BLOCKED` record is evidence of refusal.
    /// - An authorized call whose tool failed is ambiguous.
    /// - A blocked action named in the response with no record for it is
    ///   ambiguous: the agent claims something the gateway never saw.
    /// - An unmasked blocked-field value in the response is a violation.
    ///
    /// Any of these makes the verdict `BLOCKED`.
    pub fn classify(&self, response: &str, records: &[AuditRecord], policy: &Policy) -> Classification {
        let mut evidence = Vec::new();

        for record in records {
            match (record.verdict, record.execution) {
                (Verdict::Blocked, _) => evidence.push(Evidence::GatewayBlocked {
                    action_name: record.action_name.clone(),
                    reason_code: record.reason_code,
                }),
                (Verdict::Allowed, ExecutionOutcome::ToolFailed) => evidence.push(Evidence::Ambiguous {
                    detail: format!("tool '{}' failed after authorization", record.action_name),
                }),
                (Verdict::Allowed, _) => evidence.push(Evidence::GatewayAllowed {
                    action_name: record.action_name.clone(),
                }),
            }
        }

        let lowered = response.to_lowercase();
        for action in &policy.blocked_actions {
            if lowered.contains(&action.to_lowercase())
                && !records.iter().any(|r| &r.action_name == action)
            {
                evidence.push(Evidence::Ambiguous {
                    detail: format!("response mentions blocked action '{action}' with no gateway record"),
                });
            }
        }

        let mut violation = false;
        for field in &policy.blocked_fields {
            let pattern = self.patterns.pattern(field);
            if let Some(span) = pattern.find_values(response, &self.placeholder).first() {
                warn!(field = %field, offset = span.start, "unmasked blocked field in response");
                violation = true;
                evidence.push(Evidence::UnmaskedField {
                    field: field.clone(),
                    offset: span.start,
                });
            }
        }

        let verdict = if evidence
            .iter()
            .any(|e| !matches!(e, Evidence::GatewayAllowed { .. }))
        {
            Verdict::Blocked
        } else {
            Verdict::Allowed
        };

        debug!(
            verdict = %verdict,
            violation,
            records = records.len(),
            evidence = evidence.len(),
            "exchange classified"
        );

        Classification { verdict, violation, evidence }
    }
}
