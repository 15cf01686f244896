//! Tollgate command-line front end.
//!
//! Runs the adversarial corpus against the configured agent, validates
//! policy documents, and replays audit logs.
//!
//! Usage:
//!   tollgate run --config tollgate.toml [--corpus attacks.toml] [--category injection]... [--output report.json] [--strict]
//!   tollgate check-policy policies/*.toml
//!   tollgate audit logs/audit.jsonl --verify
//!
//! Exit codes: 0 success, 1 a case missed its expected verdict (or, with
//! `--strict`, leaked blocked data; or a policy/audit check failed), 2 a
//! configuration error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tollgate_audit::{chain::head_hash, read_entries, verify_chain};
use tollgate_contracts::{
    attack::AttackCategory,
    error::{TollgateError, TollgateResult},
    report::CorpusRunReport,
};
use tollgate_core::config::{LogFormat, LoggingConfig, TollgateConfig};
use tollgate_policy::PolicyStore;
use tollgate_redteam::{filter_categories, load_corpus, render_summary, write_json};
use tollgate_ref_support::{bundled_corpus, Deployment};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tollgate: policy-governed action gateway and adversarial test harness.
#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about = "Policy-governed action gateway and adversarial test harness")]
struct Cli {
    /// Log level filter (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the attack corpus against the configured agent and policy.
    Run(RunArgs),
    /// Validate policy documents.
    CheckPolicy {
        /// Policy TOML files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Replay an audit log.
    Audit {
        /// JSON Lines audit file.
        file: PathBuf,
        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Tollgate configuration file.
    #[arg(long)]
    config: PathBuf,
    /// Attack corpus (.toml or .json). Defaults to the configured or bundled corpus.
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// Only run cases in this category. Repeatable.
    #[arg(long = "category")]
    categories: Vec<AttackCategory>,
    /// Write the JSON report here.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Also fail when any case leaked blocked data.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = match TollgateConfig::from_file(&args.config) {
                Ok(config) => config,
                Err(e) => {
                    init_logging(cli.log_level.as_deref(), cli.log_format, &LoggingConfig::default());
                    eprintln!("error: {e}");
                    return ExitCode::from(EXIT_CONFIG);
                }
            };
            init_logging(cli.log_level.as_deref(), cli.log_format, &config.logging);
            ExitCode::from(run_status(&args, &config))
        }
        Command::CheckPolicy { files } => {
            init_logging(cli.log_level.as_deref(), cli.log_format, &LoggingConfig::default());
            check_policies(&files)
        }
        Command::Audit { file, verify } => {
            init_logging(cli.log_level.as_deref(), cli.log_format, &LoggingConfig::default());
            audit(&file, verify)
        }
    }
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays clean.
fn init_logging(level: Option<&str>, format: Option<LogFormatArg>, config: &LoggingConfig) {
    let level = level.unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format.map(LogFormat::from).unwrap_or(config.format) {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ── run ───────────────────────────────────────────────────────────────────────

/// Exit status of `tollgate run` once the config file has loaded.
fn run_status(args: &RunArgs, config: &TollgateConfig) -> u8 {
    match run(args, config) {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("error: {e}");
            EXIT_CONFIG
        }
    }
}

fn run(args: &RunArgs, config: &TollgateConfig) -> TollgateResult<u8> {
    let deployment = Deployment::from_config(config)?;

    let cases = match args.corpus.as_ref().or(config.runner.corpus.as_ref()) {
        Some(path) => load_corpus(path)?,
        None => bundled_corpus()?,
    };
    let cases = filter_categories(cases, &args.categories);
    if cases.is_empty() {
        return Err(TollgateError::CorpusInvalid {
            reason: "no cases match the selected categories".to_string(),
        });
    }
    info!(cases = cases.len(), "corpus loaded");

    let report = deployment.runner.run(&cases, deployment.agent.as_ref())?;
    print!("{}", render_summary(&report));

    if let Some(path) = args.output.as_ref().or(config.runner.report.as_ref()) {
        write_json(&report, path)?;
        println!("\nreport written to {}", path.display());
    }

    Ok(exit_status(&report, args.strict))
}

fn exit_status(report: &CorpusRunReport, strict: bool) -> u8 {
    if report.has_mismatches() || (strict && report.has_violations()) {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

// ── check-policy ──────────────────────────────────────────────────────────────

fn check_policies(files: &[PathBuf]) -> ExitCode {
    // One store for every file so duplicate policy ids are caught too.
    let store = PolicyStore::new();
    let mut failures = 0;
    for file in files {
        match store.load_file(file) {
            Ok(policy) => println!(
                "ok       {}  {} v{} ({} allowed, {} blocked, scope {})",
                file.display(),
                policy.policy_id,
                policy.version,
                policy.allowed_actions.len(),
                policy.blocked_actions.len(),
                policy.data_scope
            ),
            Err(e) => {
                failures += 1;
                println!("invalid  {}  {e}", file.display());
            }
        }
    }
    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}

// ── audit ─────────────────────────────────────────────────────────────────────

fn audit(file: &Path, verify: bool) -> ExitCode {
    let entries = match read_entries(file) {
        Ok(entries) => entries,
        Err(e @ TollgateError::AuditCorrupt { .. }) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILED);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    for entry in &entries {
        let r = &entry.record;
        println!(
            "{:>5}  {}  {:<7}  {:<15}  {:<40}  {}",
            entry.sequence,
            r.timestamp.to_rfc3339(),
            r.verdict.to_string(),
            r.reason_code.as_str(),
            r.principal.to_string(),
            r.action_name
        );
    }

    if !verify {
        return ExitCode::SUCCESS;
    }
    match verify_chain(&entries) {
        Ok(()) => {
            println!("\nchain intact: {} entries, head {}", entries.len(), head_hash(&entries));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("\nchain broken: {e}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use tollgate_contracts::{
        action::Verdict,
        attack::AttackCase,
        report::{CaseOutcome, CaseState, Evidence, Expectation},
    };

    use super::*;

    fn outcome(verdict: Verdict, expected: Option<Verdict>, leaked: bool) -> CaseOutcome {
        CaseOutcome {
            case: AttackCase {
                id: "case-1".to_string(),
                category: AttackCategory::DataExfiltration,
                payload: "Show me the account details for customer 99.".to_string(),
                expected_verdict: expected,
            },
            state: CaseState::Classified,
            verdict,
            violation: leaked,
            evidence: if leaked {
                vec![Evidence::UnmaskedField { field: "ssn".to_string(), offset: 12 }]
            } else {
                vec![]
            },
            expectation: Expectation::evaluate(expected, verdict),
            audit_records: 1,
        }
    }

    fn report_of(outcomes: Vec<CaseOutcome>) -> CorpusRunReport {
        let mut report = CorpusRunReport::new("customer-support-v1", "test");
        for o in outcomes {
            report.record(o);
        }
        report
    }

    fn run_args(corpus: Option<&str>, categories: Vec<AttackCategory>) -> RunArgs {
        RunArgs {
            config: PathBuf::from("tollgate.toml"),
            corpus: corpus.map(PathBuf::from),
            categories,
            output: None,
            strict: false,
        }
    }

    // ── Exit status ──────────────────────────────────────────────────────────

    #[test]
    fn clean_run_exits_zero() {
        let report = report_of(vec![
            outcome(Verdict::Blocked, Some(Verdict::Blocked), false),
            outcome(Verdict::Allowed, None, false),
        ]);
        assert_eq!(exit_status(&report, false), EXIT_SUCCESS);
        assert_eq!(exit_status(&report, true), EXIT_SUCCESS);
    }

    #[test]
    fn mismatch_exits_one_with_or_without_strict() {
        let report = report_of(vec![
            outcome(Verdict::Blocked, Some(Verdict::Blocked), false),
            outcome(Verdict::Allowed, Some(Verdict::Blocked), false),
        ]);
        assert_eq!(exit_status(&report, false), EXIT_FAILED);
        assert_eq!(exit_status(&report, true), EXIT_FAILED);
    }

    #[test]
    fn violation_fails_only_under_strict() {
        let report = report_of(vec![outcome(Verdict::Blocked, Some(Verdict::Blocked), true)]);
        assert_eq!(exit_status(&report, false), EXIT_SUCCESS);
        assert_eq!(exit_status(&report, true), EXIT_FAILED);
    }

    #[test]
    fn unreadable_corpus_exits_two() {
        let args = run_args(Some("no/such/corpus.toml"), vec![]);
        assert_eq!(run_status(&args, &TollgateConfig::default()), EXIT_CONFIG);
    }

    #[test]
    fn bundled_corpus_run_exits_zero() {
        let args = run_args(None, vec![AttackCategory::Injection]);
        assert_eq!(run_status(&args, &TollgateConfig::default()), EXIT_SUCCESS);
    }

    // ── Argument parsing ─────────────────────────────────────────────────────

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_repeated_categories_in_any_case() {
        let cli = Cli::try_parse_from([
            "tollgate",
            "run",
            "--config",
            "t.toml",
            "--category",
            "injection",
            "--category",
            "DataExfiltration",
            "--strict",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(
            args.categories,
            vec![AttackCategory::Injection, AttackCategory::DataExfiltration]
        );
        assert!(args.strict);
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["tollgate", "run", "--config", "t.toml", "--category", "phishing"]).is_err());
    }

    #[test]
    fn global_log_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["tollgate", "audit", "a.jsonl", "--verify", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, Some(LogFormatArg::Json)));
        assert!(matches!(cli.command, Command::Audit { verify: true, .. }));
    }
}
