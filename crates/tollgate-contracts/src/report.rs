//! Classification evidence and corpus run reports.
//!
//! The verdict classifier turns one exchange into a `Classification`; the
//! corpus runner folds those into a `CorpusRunReport`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    action::{ReasonCode, Verdict},
    attack::{AttackCase, AttackCategory},
};

/// Lifecycle of a single attack case during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Sent,
    Classified,
}

/// One observation the classifier based its verdict on.
///
/// Evidence never carries a leaked value itself, only where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// The gateway refused an action during the exchange.
    GatewayBlocked {
        action_name: String,
        reason_code: ReasonCode,
    },
    /// The gateway authorized an action during the exchange.
    GatewayAllowed { action_name: String },
    /// The response contains a value for a blocked field that was not masked.
    UnmaskedField { field: String, offset: usize },
    /// The classifier could not tell whether policy held; resolved as BLOCKED.
    Ambiguous { detail: String },
}

/// The classifier's conclusion for one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub verdict: Verdict,
    /// True when blocked data reached the response unmasked.
    pub violation: bool,
    pub evidence: Vec<Evidence>,
}

/// Whether a case met its pinned `expected_verdict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Expectation {
    /// The case does not pin a verdict.
    Unspecified,
    Met,
    Mismatched { expected: Verdict },
}

impl Expectation {
    /// Compare an actual verdict against an optional expectation.
    pub fn evaluate(expected: Option<Verdict>, actual: Verdict) -> Self {
        match expected {
            None => Self::Unspecified,
            Some(e) if e == actual => Self::Met,
            Some(e) => Self::Mismatched { expected: e },
        }
    }
}

/// Final outcome of one attack case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case: AttackCase,
    pub state: CaseState,
    pub verdict: Verdict,
    pub violation: bool,
    pub evidence: Vec<Evidence>,
    pub expectation: Expectation,
    /// Number of audit records the exchange produced.
    pub audit_records: usize,
}

/// Aggregate counts for one attack category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub violations: usize,
    pub mismatches: usize,
}

/// Everything a corpus run produced, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRunReport {
    /// Policy in force for the run's principal when the run started.
    pub policy_id: String,
    /// Version of the redaction/classification pattern set used.
    pub pattern_set_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CaseOutcome>,
    pub summary: BTreeMap<AttackCategory, CategorySummary>,
}

impl CorpusRunReport {
    /// Start an empty report.
    pub fn new(policy_id: impl Into<String>, pattern_set_version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            policy_id: policy_id.into(),
            pattern_set_version: pattern_set_version.into(),
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
            summary: BTreeMap::new(),
        }
    }

    /// Append an outcome and update its category's counts.
    pub fn record(&mut self, outcome: CaseOutcome) {
        let entry = self.summary.entry(outcome.case.category).or_default();
        entry.total += 1;
        match outcome.verdict {
            Verdict::Allowed => entry.allowed += 1,
            Verdict::Blocked => entry.blocked += 1,
        }
        if outcome.violation {
            entry.violations += 1;
        }
        if matches!(outcome.expectation, Expectation::Mismatched { .. }) {
            entry.mismatches += 1;
        }
        self.outcomes.push(outcome);
    }

    /// Totals across every category.
    pub fn totals(&self) -> CategorySummary {
        self.summary.values().fold(CategorySummary::default(), |mut acc, s| {
            acc.total += s.total;
            acc.allowed += s.allowed;
            acc.blocked += s.blocked;
            acc.violations += s.violations;
            acc.mismatches += s.mismatches;
            acc
        })
    }

    /// True if any case missed its expected verdict.
    pub fn has_mismatches(&self) -> bool {
        self.totals().mismatches > 0
    }

    /// True if any case leaked blocked data.
    pub fn has_violations(&self) -> bool {
        self.totals().violations > 0
    }
}
