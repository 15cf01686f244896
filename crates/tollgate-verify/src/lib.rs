//! # tollgate-verify
//!
//! Redaction and verdict classification for Tollgate.
//!
//! Both halves share one versioned [`PatternSet`]:
//!
//! - [`FieldRedactor`] implements the
//!   [`tollgate_core::traits::Redactor`] trait and masks blocked fields in
//!   every tool result before it leaves the gateway.
//! - [`VerdictClassifier`] inspects an exchange's response and audit
//!   records and decides ALLOWED vs BLOCKED for the harness.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tollgate_verify::{FieldRedactor, PatternSet, VerdictClassifier};
//!
//! let patterns = Arc::new(PatternSet::new());
//! let redactor = FieldRedactor::new("[REDACTED]", Arc::clone(&patterns));
//! let classifier = VerdictClassifier::new(patterns, "[REDACTED]");
//! ```

pub mod classifier;
pub mod patterns;
pub mod redactor;

pub use classifier::VerdictClassifier;
pub use patterns::{PatternSet, PATTERN_SET_VERSION};
pub use redactor::FieldRedactor;
