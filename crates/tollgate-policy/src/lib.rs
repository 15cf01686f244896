//! # tollgate-policy
//!
//! Declarative TOML policies and the store that resolves them.
//!
//! ## Overview
//!
//! This crate provides [`PolicyStore`], which implements the
//! [`PolicyResolver`](tollgate_core::traits::PolicyResolver) trait. Policies
//! are declared in TOML, validated once at load, and handed out as shared
//! read-only `Arc`s. Each agent is bound to exactly one policy.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tollgate_policy::PolicyStore;
//!
//! let store = PolicyStore::new();
//! store.load_dir(Path::new("policies"))?;
//! store.bind("customer_support_agent", "customer-support-v1")?;
//! // Pass `Arc::new(store)` to `tollgate_core::ActionGateway::new(...)`.
//! ```
//!
//! ## Validation
//!
//! A document is rejected if an action is both allowed and blocked, a field
//! is both blocked and PII, an identity argument is a blocked field, the id
//! is empty, a rate limit is zero, or it carries an unknown key.

pub mod document;
pub mod store;

pub use document::PolicyDocument;
pub use store::PolicyStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
