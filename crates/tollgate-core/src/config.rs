//! Process-wide configuration.
//!
//! `TollgateConfig` is deserialized once from TOML and passed by reference
//! to the gateway and the corpus runner. Relative paths are resolved
//! against the directory of the file they were read from.
//!
//! ```toml
//! policy_files = ["policies/customer-support.toml"]
//!
//! [[bindings]]
//! agent_id = "customer_support_agent"
//! policy_id = "customer-support-v1"
//!
//! [audit]
//! path = "audit.jsonl"
//!
//! [runner]
//! agent_id = "customer_support_agent"
//! customer_id = "42"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tollgate_contracts::error::{TollgateError, TollgateResult};

/// Default mask written in place of redacted values.
pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// Policy documents to load at startup.
    #[serde(default)]
    pub policy_files: Vec<PathBuf>,
    /// Agent → policy bindings.
    #[serde(default)]
    pub bindings: Vec<PolicyBinding>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Binds one agent to one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyBinding {
    pub agent_id: String,
    pub policy_id: String,
}

/// Gateway behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// Store the redacted tool output in each audit record.
    pub record_outputs: bool,
    /// Additionally mask the policy's PII fields in recorded outputs.
    pub mask_pii_in_audit: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            record_outputs: true,
            mask_pii_in_audit: true,
        }
    }
}

/// Where audit records go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// JSON Lines file to append to. `None` keeps the log in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Redaction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RedactionConfig {
    pub placeholder: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Corpus runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunnerConfig {
    /// Agent the corpus is run against.
    pub agent_id: String,
    /// Customer the agent is serving during the run.
    pub customer_id: Option<String>,
    /// Corpus file; the bundled corpus is used when unset.
    pub corpus: Option<PathBuf>,
    /// Where the JSON report is written when `--output` is not given.
    pub report: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            agent_id: "customer_support_agent".to_string(),
            customer_id: Some("42".to_string()),
            corpus: None,
            report: None,
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl TollgateConfig {
    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> TollgateResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| TollgateError::ConfigError {
            reason: format!("failed to parse config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> TollgateResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| TollgateError::ConfigError {
            reason: format!("cannot read config file '{}': {e}", path.display()),
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> TollgateResult<()> {
        if self.redaction.placeholder.trim().is_empty() {
            return Err(TollgateError::ConfigError {
                reason: "redaction.placeholder must not be empty".to_string(),
            });
        }
        if self.redaction.placeholder.chars().any(|c| c.is_ascii_digit()) {
            return Err(TollgateError::ConfigError {
                reason: "redaction.placeholder must not contain digits".to_string(),
            });
        }
        if self.runner.agent_id.trim().is_empty() {
            return Err(TollgateError::ConfigError {
                reason: "runner.agent_id must not be empty".to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.agent_id.as_str()) {
                return Err(TollgateError::ConfigError {
                    reason: format!("agent '{}' is bound more than once", binding.agent_id),
                });
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.policy_files.iter_mut().for_each(resolve);
        self.audit.path.iter_mut().for_each(resolve);
        self.runner.corpus.iter_mut().for_each(resolve);
        self.runner.report.iter_mut().for_each(resolve);
    }
}
