//! # tollgate-contracts
//!
//! Shared types, schemas, and contracts for the Tollgate action gateway.
//!
//! All crates in the workspace import from here. Apart from small helpers
//! on the types themselves, no business logic lives in this crate.

pub mod action;
pub mod attack;
pub mod audit;
pub mod error;
pub mod policy;
pub mod principal;
pub mod report;
pub mod tool;
