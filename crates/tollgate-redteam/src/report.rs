//! Report rendering: a console summary table and a JSON file.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tollgate_contracts::{
    attack::AttackCategory,
    error::{TollgateError, TollgateResult},
    report::{CategorySummary, CorpusRunReport, Evidence, Expectation},
};

const CATEGORY_WIDTH: usize = 24;

/// Render the per-category summary table plus any mismatched or leaking cases.
pub fn render_summary(report: &CorpusRunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "policy: {}   patterns: {}   duration: {}ms",
        report.policy_id,
        report.pattern_set_version,
        (report.finished_at - report.started_at).num_milliseconds()
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<w$} {:>6} {:>8} {:>8} {:>11} {:>11}",
        "category",
        "total",
        "blocked",
        "allowed",
        "violations",
        "mismatches",
        w = CATEGORY_WIDTH
    );
    let _ = writeln!(out, "{}", "-".repeat(CATEGORY_WIDTH + 48));

    for category in AttackCategory::ALL {
        if let Some(s) = report.summary.get(&category) {
            row(&mut out, category.as_str(), s);
        }
    }
    let _ = writeln!(out, "{}", "-".repeat(CATEGORY_WIDTH + 48));
    row(&mut out, "TOTAL", &report.totals());

    let flagged: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.violation || matches!(o.expectation, Expectation::Mismatched { .. }))
        .collect();
    if !flagged.is_empty() {
        let _ = writeln!(out);
        for o in flagged {
            let mut notes = Vec::new();
            if let Expectation::Mismatched { expected } = o.expectation {
                notes.push(format!("expected {expected}"));
            }
            if o.violation {
                let fields: Vec<&str> = o
                    .evidence
                    .iter()
                    .filter_map(|e| match e {
                        Evidence::UnmaskedField { field, .. } => Some(field.as_str()),
                        _ => None,
                    })
                    .collect();
                notes.push(format!("leaked {}", fields.join(", ")));
            }
            let _ = writeln!(out, "  ! {} [{}] got {}: {}", o.case.id, o.case.category, o.verdict, notes.join("; "));
        }
    }
    out
}

fn row(out: &mut String, label: &str, s: &CategorySummary) {
    let _ = writeln!(
        out,
        "{:<w$} {:>6} {:>8} {:>8} {:>11} {:>11}",
        label,
        s.total,
        s.blocked,
        s.allowed,
        s.violations,
        s.mismatches,
        w = CATEGORY_WIDTH
    );
}

/// Write the full report as pretty-printed JSON, creating parent directories.
pub fn write_json(report: &CorpusRunReport, path: &Path) -> TollgateResult<()> {
    let failed = |e: &dyn std::fmt::Display| TollgateError::ConfigError {
        reason: format!("cannot write report '{}': {e}", path.display()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| failed(&e))?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|e| failed(&e))?;
    fs::write(path, json + "\n").map_err(|e| failed(&e))
}

#[cfg(test)]
mod tests {
    use tollgate_contracts::{
        action::Verdict,
        attack::AttackCase,
        report::{CaseOutcome, CaseState},
    };

    use super::*;

    fn outcome(id: &str, category: AttackCategory, verdict: Verdict, expected: Option<Verdict>, leak: bool) -> CaseOutcome {
        CaseOutcome {
            case: AttackCase {
                id: id.to_string(),
                category,
                payload: "p".to_string(),
                expected_verdict: expected,
            },
            state: CaseState::Classified,
            verdict,
            violation: leak,
            evidence: if leak {
                vec![Evidence::UnmaskedField { field: "ssn".to_string(), offset: 4 }]
            } else {
                vec![]
            },
            expectation: Expectation::evaluate(expected, verdict),
            audit_records: 1,
        }
    }

    fn sample() -> CorpusRunReport {
        let mut report = CorpusRunReport::new("support-v1", "2026.10.1");
        report.record(outcome("jailbreak-01", AttackCategory::Jailbreak, Verdict::Blocked, Some(Verdict::Blocked), false));
        report.record(outcome("injection-01", AttackCategory::Injection, Verdict::Allowed, Some(Verdict::Blocked), false));
        report.record(outcome("info-01", AttackCategory::InfoExtraction, Verdict::Blocked, None, true));
        report
    }

    #[test]
    fn summary_lists_categories_in_taxonomy_order() {
        let text = render_summary(&sample());
        let injection = text.find("injection ").unwrap();
        let jailbreak = text.find("jailbreak ").unwrap();
        let info = text.find("info_extraction").unwrap();
        assert!(injection < jailbreak && jailbreak < info);
        assert!(!text.contains("data_exfiltration"));
        assert!(text.contains("policy: support-v1"));
    }

    #[test]
    fn summary_flags_mismatches_and_leaks() {
        let text = render_summary(&sample());
        assert!(text.contains("! injection-01 [injection] got ALLOWED: expected BLOCKED"));
        assert!(text.contains("! info-01 [info_extraction] got BLOCKED: leaked ssn"));
        assert!(!text.contains("! jailbreak-01"));
    }

    #[test]
    fn json_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = sample();
        write_json(&report, &path).unwrap();

        let back: CorpusRunReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
