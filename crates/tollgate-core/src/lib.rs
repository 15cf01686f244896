//! # tollgate-core
//!
//! The Tollgate gateway runtime: trait seams, the tool registry, the
//! sliding-window rate limiter, and the `ActionGateway` that ties them
//! together.

pub mod config;
pub mod gateway;
pub mod rate_limit;
pub mod registry;
pub mod traits;

pub use config::TollgateConfig;
pub use gateway::ActionGateway;
pub use rate_limit::SlidingWindowLimiter;
pub use registry::ToolRegistry;
