//! # tollgate-redteam
//!
//! Adversarial test harness for agents behind the Tollgate gateway.
//!
//! The harness sends each [`AttackCase`](tollgate_contracts::attack::AttackCase)
//! through an agent's normal chat entry point, the same path a real user
//! takes, then judges the exchange from two sources only: the agent's final
//! response and the audit records the gateway wrote for that exchange.
//!
//! - [`corpus`]: load and filter attack corpora (TOML or JSON).
//! - [`runner::CorpusRunner`]: the per-case `PENDING → SENT → CLASSIFIED` loop.
//! - [`report`]: console summary and JSON output.

pub mod corpus;
pub mod report;
pub mod runner;

pub use corpus::{filter_categories, load_corpus};
pub use report::{render_summary, write_json};
pub use runner::CorpusRunner;
