//! Policy document schema.
//!
//! A `PolicyDocument` is the raw shape deserialized from TOML. It becomes a
//! `Policy` only through `into_policy`, which enforces every cross-field
//! invariant. Unknown keys are rejected at parse time.
//!
//! Example:
//! ```toml
//! policy_id = "customer-support-v1"
//! allowed_actions = ["read_customer_record"]
//! blocked_actions = ["modify_billing"]
//! data_scope = "requesting-principal-only"
//! blocked_fields = ["ssn", "credit_card", "password"]
//! rate_limit = { max_actions = 100, window_secs = 3600 }
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tollgate_contracts::{
    error::{TollgateError, TollgateResult},
    policy::{DataScope, Policy, RateLimit},
};

fn default_version() -> u32 {
    1
}

fn default_identity_arguments() -> Vec<String> {
    vec!["customer_id".to_string()]
}

fn default_scope() -> DataScope {
    DataScope::RequestingPrincipalOnly
}

/// The top-level structure of a policy TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Unique identifier; bindings refer to it.
    pub policy_id: String,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub allowed_actions: Vec<String>,

    /// Precedence over `allowed_actions`; the two must not overlap.
    #[serde(default)]
    pub blocked_actions: Vec<String>,

    #[serde(default = "default_scope")]
    pub data_scope: DataScope,

    /// Field names that are never disclosed. Matched case-insensitively.
    #[serde(default)]
    pub blocked_fields: Vec<String>,

    /// Field names masked in the audit trail only.
    #[serde(default)]
    pub pii_fields: Vec<String>,

    /// Arguments carrying a customer identity for the scope check.
    #[serde(default = "default_identity_arguments")]
    pub identity_arguments: Vec<String>,

    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

impl PolicyDocument {
    /// Parse `s` as a TOML policy document.
    ///
    /// Schema violations, including unknown keys, are `PolicyInvalid`.
    pub fn from_toml_str(s: &str) -> TollgateResult<Self> {
        toml::from_str(s).map_err(|e| TollgateError::PolicyInvalid {
            policy_id: peek_policy_id(s),
            reason: format!("failed to parse policy TOML: {e}"),
        })
    }

    /// Validate the document and build the immutable `Policy`.
    pub fn into_policy(self) -> TollgateResult<Policy> {
        let invalid = |reason: String| TollgateError::PolicyInvalid {
            policy_id: self.policy_id.clone(),
            reason,
        };

        if self.policy_id.trim().is_empty() {
            return Err(invalid("policy_id must not be empty".to_string()));
        }

        let allowed_actions: BTreeSet<String> = self.allowed_actions.iter().cloned().collect();
        let blocked_actions: BTreeSet<String> = self.blocked_actions.iter().cloned().collect();
        if let Some(action) = allowed_actions.intersection(&blocked_actions).next() {
            return Err(invalid(format!("action '{action}' is both allowed and blocked")));
        }

        let blocked_fields = lowercase_set(&self.blocked_fields);
        let pii_fields = lowercase_set(&self.pii_fields);
        if let Some(field) = blocked_fields.intersection(&pii_fields).next() {
            return Err(invalid(format!("field '{field}' is both a blocked field and a pii field")));
        }
        if let Some(field) = blocked_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(invalid(format!("blocked field '{field}' is blank")));
        }

        for arg in &self.identity_arguments {
            if blocked_fields.contains(&arg.to_lowercase()) {
                return Err(invalid(format!(
                    "identity argument '{arg}' is also a blocked field"
                )));
            }
        }

        if let Some(limit) = &self.rate_limit {
            if limit.max_actions == 0 {
                return Err(invalid("rate_limit.max_actions must be at least 1".to_string()));
            }
            if limit.window_secs == 0 {
                return Err(invalid("rate_limit.window_secs must be at least 1".to_string()));
            }
            if limit.window_secs > RateLimit::MAX_WINDOW_SECS {
                return Err(invalid(format!(
                    "rate_limit.window_secs must be at most {} (one year)",
                    RateLimit::MAX_WINDOW_SECS
                )));
            }
        }

        Ok(Policy {
            policy_id: self.policy_id,
            version: self.version,
            description: self.description,
            allowed_actions,
            blocked_actions,
            data_scope: self.data_scope,
            blocked_fields,
            pii_fields,
            identity_arguments: self.identity_arguments,
            rate_limit: self.rate_limit,
        })
    }
}

fn lowercase_set(fields: &[String]) -> BTreeSet<String> {
    fields.iter().map(|f| f.to_lowercase()).collect()
}

/// Best-effort id for error messages when the document does not parse.
fn peek_policy_id(s: &str) -> String {
    toml::from_str::<toml::Table>(s)
        .ok()
        .and_then(|t| t.get("policy_id").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| "<unknown>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> TollgateResult<Policy> {
        PolicyDocument::from_toml_str(toml)?.into_policy()
    }

    #[test]
    fn minimal_document_gets_defaults() {
        let policy = parse(r#"policy_id = "p""#).unwrap();
        assert_eq!(policy.version, 1);
        assert_eq!(policy.data_scope, DataScope::RequestingPrincipalOnly);
        assert_eq!(policy.identity_arguments, vec!["customer_id".to_string()]);
        assert!(policy.allowed_actions.is_empty());
        assert!(policy.rate_limit.is_none());
    }

    #[test]
    fn field_names_are_lowercased() {
        let policy = parse(
            r#"
            policy_id = "p"
            blocked_fields = ["SSN", "Credit_Card"]
            pii_fields = ["Email"]
            "#,
        )
        .unwrap();
        assert!(policy.blocked_fields.contains("ssn"));
        assert!(policy.blocked_fields.contains("credit_card"));
        assert!(policy.pii_fields.contains("email"));
        assert!(policy.is_blocked_field("CREDIT_CARD"));
    }

    #[test]
    fn overlapping_actions_are_invalid() {
        let err = parse(
            r#"
            policy_id = "p"
            allowed_actions = ["refund", "read"]
            blocked_actions = ["refund"]
            "#,
        )
        .unwrap_err();
        match err {
            TollgateError::PolicyInvalid { policy_id, reason } => {
                assert_eq!(policy_id, "p");
                assert!(reason.contains("'refund' is both allowed and blocked"), "{reason}");
            }
            other => panic!("expected PolicyInvalid, got {:?}", other),
        }
    }

    #[test]
    fn blocked_and_pii_overlap_is_invalid() {
        let err = parse(
            r#"
            policy_id = "p"
            blocked_fields = ["ssn", "Email"]
            pii_fields = ["email"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'email' is both a blocked field and a pii field"));
    }

    #[test]
    fn identity_argument_cannot_be_blocked() {
        let err = parse(
            r#"
            policy_id = "p"
            blocked_fields = ["customer_id"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("identity argument 'customer_id'"));
    }

    #[test]
    fn zero_rate_limit_is_invalid() {
        let err = parse(
            r#"
            policy_id = "p"
            rate_limit = { max_actions = 0, window_secs = 60 }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_actions"));

        let err = parse(
            r#"
            policy_id = "p"
            rate_limit = { max_actions = 5, window_secs = 0 }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("window_secs"));
    }

    #[test]
    fn oversized_rate_window_is_invalid() {
        let err = parse(
            r#"
            policy_id = "p"
            rate_limit = { max_actions = 5, window_secs = 10000000000000 }
            "#,
        )
        .unwrap_err();
        match err {
            TollgateError::PolicyInvalid { policy_id, reason } => {
                assert_eq!(policy_id, "p");
                assert!(reason.contains("at most 31622400"), "{reason}");
            }
            other => panic!("expected PolicyInvalid, got {:?}", other),
        }

        let year = parse(
            r#"
            policy_id = "p"
            rate_limit = { max_actions = 5, window_secs = 31622400 }
            "#,
        )
        .unwrap();
        assert_eq!(year.rate_limit.unwrap().window_secs, RateLimit::MAX_WINDOW_SECS);
    }

    #[test]
    fn empty_policy_id_is_invalid() {
        assert!(matches!(parse(r#"policy_id = " ""#), Err(TollgateError::PolicyInvalid { .. })));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse(
            r#"
            policy_id = "p"
            allow_everything = true
            "#,
        )
        .unwrap_err();
        match err {
            TollgateError::PolicyInvalid { policy_id, reason } => {
                assert_eq!(policy_id, "p");
                assert!(reason.contains("failed to parse policy TOML"));
            }
            other => panic!("expected PolicyInvalid, got {:?}", other),
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = parse(
            r#"
            policy_id = "p"
            data_scope = "everyone"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TollgateError::PolicyInvalid { .. }));
    }

    #[test]
    fn malformed_toml_reports_unknown_id() {
        match PolicyDocument::from_toml_str("this is not valid toml ][[[") {
            Err(TollgateError::PolicyInvalid { policy_id, .. }) => assert_eq!(policy_id, "<unknown>"),
            other => panic!("expected PolicyInvalid, got {:?}", other),
        }
    }
}
