//! Validated policy types.
//!
//! A `Policy` is only ever produced by the policy store after its source
//! document passed validation, so code holding one can rely on its
//! invariants: the allow and block sets are disjoint, field names are
//! lowercase, and any rate limit is non-zero.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which customer identities a principal's requests may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataScope {
    /// Identity arguments must name the principal's own customer id.
    #[serde(alias = "requesting_principal_only", alias = "requesting_customer_only")]
    RequestingPrincipalOnly,
    /// No identity restriction.
    Unrestricted,
}

impl fmt::Display for DataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestingPrincipalOnly => f.write_str("requesting-principal-only"),
            Self::Unrestricted => f.write_str("unrestricted"),
        }
    }
}

/// Maximum number of actions a principal may take in a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Actions permitted within one window. Always at least 1.
    pub max_actions: u32,
    /// Length of the trailing window in seconds. At least 1 and at most
    /// [`MAX_WINDOW_SECS`](Self::MAX_WINDOW_SECS).
    pub window_secs: u64,
}

impl RateLimit {
    /// Longest window a policy may declare: one leap year.
    pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 60 * 60;

    /// The window length as a `chrono::Duration`, saturating at
    /// `Duration::MAX` for windows chrono cannot represent.
    pub fn window(&self) -> chrono::Duration {
        i64::try_from(self.window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// A loaded, validated, immutable policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy identifier (e.g. "customer-support-v1").
    pub policy_id: String,
    /// Document version; bumped by operators when they replace a policy.
    pub version: u32,
    /// Free-form description for operators.
    pub description: String,
    /// Actions the principal may take.
    pub allowed_actions: BTreeSet<String>,
    /// Actions the principal may never take. Checked before the allowlist.
    pub blocked_actions: BTreeSet<String>,
    pub data_scope: DataScope,
    /// Lowercased field names that must never be disclosed.
    pub blocked_fields: BTreeSet<String>,
    /// Lowercased field names that may reach the caller but are masked in
    /// the audit trail.
    pub pii_fields: BTreeSet<String>,
    /// Argument names that carry a customer identity.
    pub identity_arguments: Vec<String>,
    /// `None` means the policy imposes no rate limit.
    pub rate_limit: Option<RateLimit>,
}

impl Policy {
    /// True if `action` is on the blocklist.
    pub fn blocks(&self, action: &str) -> bool {
        self.blocked_actions.contains(action)
    }

    /// True if `action` is on the allowlist.
    pub fn allows(&self, action: &str) -> bool {
        self.allowed_actions.contains(action)
    }

    /// True if `field` is a blocked field (case-insensitive).
    pub fn is_blocked_field(&self, field: &str) -> bool {
        self.blocked_fields.contains(&field.to_lowercase())
    }
}
