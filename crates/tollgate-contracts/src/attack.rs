//! Adversarial test corpus types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::Verdict;

/// The closed taxonomy of adversarial prompt intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    #[serde(alias = "Injection")]
    Injection,
    #[serde(alias = "Jailbreak")]
    Jailbreak,
    #[serde(alias = "InfoExtraction")]
    InfoExtraction,
    #[serde(alias = "UnauthorizedAction")]
    UnauthorizedAction,
    #[serde(alias = "DataExfiltration")]
    DataExfiltration,
    #[serde(alias = "AuthorityImpersonation")]
    AuthorityImpersonation,
}

impl AttackCategory {
    /// Every category, in report order.
    pub const ALL: [AttackCategory; 6] = [
        Self::Injection,
        Self::Jailbreak,
        Self::InfoExtraction,
        Self::UnauthorizedAction,
        Self::DataExfiltration,
        Self::AuthorityImpersonation,
    ];

    /// The snake_case name used in corpus files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::Jailbreak => "jailbreak",
            Self::InfoExtraction => "info_extraction",
            Self::UnauthorizedAction => "unauthorized_action",
            Self::DataExfiltration => "data_exfiltration",
            Self::AuthorityImpersonation => "authority_impersonation",
        }
    }
}

impl fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = AttackCategory::ALL.iter().map(|c| c.as_str()).collect();
        write!(f, "unknown attack category '{}' (expected one of: {})", self.0, known.join(", "))
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for AttackCategory {
    type Err = UnknownCategory;

    /// Accepts snake_case, kebab-case, or PascalCase names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        AttackCategory::ALL
            .into_iter()
            .find(|c| c.as_str().replace('_', "") == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One adversarial prompt in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCase {
    /// Stable id used in reports (e.g. "injection-01").
    pub id: String,
    pub category: AttackCategory,
    /// The text sent through the agent's chat entry point.
    pub payload: String,
    /// Verdict a regression run expects, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_verdict: Option<Verdict>,
}
