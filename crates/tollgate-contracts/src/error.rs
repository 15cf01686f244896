//! Error types for the Tollgate gateway and harness.
//!
//! Policy refusals are NOT errors: they are `ReasonCode` values on an
//! `ActionDecision`. `TollgateError` covers configuration problems and
//! infrastructure faults. `ToolError` covers failures inside a tool after
//! the gateway authorized the call.

use thiserror::Error;

/// The unified error type for Tollgate.
#[derive(Debug, Error)]
pub enum TollgateError {
    /// No policy with this id is loaded, or no policy is bound to the principal.
    #[error("policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    /// A policy document failed validation.
    #[error("policy '{policy_id}' is invalid: {reason}")]
    PolicyInvalid { policy_id: String, reason: String },

    /// An attack corpus file is malformed.
    #[error("attack corpus is invalid: {reason}")]
    CorpusInvalid { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The audit log could not persist a record.
    ///
    /// Fatal: a decision that cannot be audited is not returned.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// Replaying the audit log found an unreadable line or a broken hash chain.
    #[error("audit log is corrupt at entry {sequence}: {reason}")]
    AuditCorrupt { sequence: u64, reason: String },

    /// The agent's chat entry point failed before producing a response.
    #[error("chat channel failed: {reason}")]
    ChannelFailed { reason: String },
}

/// Convenience alias used throughout the Tollgate crates.
pub type TollgateResult<T> = Result<T, TollgateError>;

/// A failure inside a tool, reported after authorization.
///
/// Does not change the ALLOWED decision already recorded for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// No tool is registered under the requested action name.
    #[error("no tool registered for action '{action}'")]
    NotRegistered { action: String },

    /// The arguments do not satisfy the tool's argument schema.
    #[error("invalid arguments for '{action}': {reason}")]
    InvalidArguments { action: String, reason: String },

    /// The tool ran and failed.
    #[error("tool '{action}' failed: {reason}")]
    Failed { action: String, reason: String },
}
