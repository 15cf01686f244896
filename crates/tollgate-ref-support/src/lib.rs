//! # tollgate-ref-support
//!
//! Customer-support reference deployment for the Tollgate gateway.
//!
//! Wires real Tollgate components (policy store, gateway, redactor, audit
//! log, corpus runner) around a fictional support desk:
//!
//! - [`tools`]: fourteen support tools over hardcoded mock data, from
//!   order lookups to shell access.
//! - [`planner::KeywordPlanner`]: a deterministic stand-in for the
//!   completion service that obeys injected instructions.
//! - [`agent::SupportAgent`]: the chat entry point the harness attacks.
//! - [`BUNDLED_POLICY`] and [`BUNDLED_CORPUS`]: the `customer-support-v1`
//!   policy and the default attack corpus.
//!
//! All data is hardcoded and fictional. No external calls are made.

use std::sync::Arc;

use tracing::info;

use tollgate_audit::{open_audit_log, InMemoryAuditLog};
use tollgate_contracts::{attack::AttackCase, error::TollgateResult};
use tollgate_core::{
    config::TollgateConfig,
    gateway::ActionGateway,
    traits::{AuditLog, PolicyResolver},
};
use tollgate_policy::PolicyStore;
use tollgate_redteam::{corpus, CorpusRunner};
use tollgate_verify::{FieldRedactor, PatternSet, VerdictClassifier};

pub mod agent;
pub mod mock_data;
pub mod planner;
pub mod tools;

use agent::SupportAgent;
use planner::KeywordPlanner;

/// The `customer-support-v1` policy document.
pub const BUNDLED_POLICY: &str = include_str!("../policies/customer-support.toml");

/// The default attack corpus, controls included.
pub const BUNDLED_CORPUS: &str = include_str!("../corpus/default.toml");

/// Agent id the bundled policy is bound to.
pub const REFERENCE_AGENT_ID: &str = "customer_support_agent";

/// Parse [`BUNDLED_CORPUS`].
pub fn bundled_corpus() -> TollgateResult<Vec<AttackCase>> {
    corpus::parse_toml(BUNDLED_CORPUS)
}

/// A complete, wired deployment: store, audit log, gateway, agent, runner.
pub struct Deployment {
    pub store: Arc<PolicyStore>,
    pub audit: Arc<dyn AuditLog>,
    pub gateway: Arc<ActionGateway>,
    pub agent: Arc<SupportAgent>,
    pub runner: CorpusRunner,
}

impl Deployment {
    /// Build a deployment from `config`.
    ///
    /// With no `policy_files` configured the bundled policy is loaded, and
    /// bound to the runner's agent unless `bindings` says otherwise.
    pub fn from_config(config: &TollgateConfig) -> TollgateResult<Self> {
        let store = if config.policy_files.is_empty() {
            let store = PolicyStore::new();
            let policy = store.load_toml_str(BUNDLED_POLICY)?;
            if config.bindings.is_empty() {
                store.bind(&config.runner.agent_id, &policy.policy_id)?;
            }
            for binding in &config.bindings {
                store.bind(&binding.agent_id, &binding.policy_id)?;
            }
            info!(policy_id = %policy.policy_id, "bundled policy loaded");
            store
        } else {
            PolicyStore::from_config(config)?
        };
        let audit = open_audit_log(&config.audit)?;
        Self::assemble(config, Arc::new(store), audit)
    }

    /// The bundled policy, default settings, and an in-memory audit log.
    pub fn reference() -> TollgateResult<Self> {
        let config = TollgateConfig::default();
        let store = PolicyStore::new();
        let policy = store.load_toml_str(BUNDLED_POLICY)?;
        store.bind(REFERENCE_AGENT_ID, &policy.policy_id)?;
        Self::assemble(&config, Arc::new(store), Arc::new(InMemoryAuditLog::new()))
    }

    fn assemble(config: &TollgateConfig, store: Arc<PolicyStore>, audit: Arc<dyn AuditLog>) -> TollgateResult<Self> {
        let patterns = Arc::new(PatternSet::new());
        let redactor = FieldRedactor::from_config(&config.redaction, Arc::clone(&patterns));
        let resolver: Arc<dyn PolicyResolver> = store.clone();

        let gateway = Arc::new(ActionGateway::new(
            &config.gateway,
            Arc::clone(&resolver),
            tools::reference_registry()?,
            Box::new(redactor),
            Arc::clone(&audit),
        ));
        let agent = Arc::new(SupportAgent::new(Arc::clone(&gateway), Box::new(KeywordPlanner::new())));
        let classifier = VerdictClassifier::new(patterns, config.redaction.placeholder.clone());
        let runner = CorpusRunner::from_config(&config.runner, resolver, Arc::clone(&audit), classifier);

        Ok(Self { store, audit, gateway, agent, runner })
    }
}
