//! Principal identity and correlation identifiers.
//!
//! A `Principal` names who an action is requested for. Gateway decisions,
//! rate-limit windows, and audit records are all keyed on it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, human-readable identifier for an agent.
///
/// Used as the key for policy bindings and in every audit record.
/// Example: AgentId("customer_support_agent")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Construct an agent id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity an action is performed on behalf of.
///
/// `customer_id` is present when the agent is serving a specific end user;
/// the gateway's data-scope check compares identity arguments against it.
/// A principal is never modified once a request has been built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// The agent issuing the request.
    pub agent_id: AgentId,
    /// The end customer the agent is acting for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl Principal {
    /// A principal with no associated customer.
    pub fn agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: AgentId::new(agent_id),
            customer_id: None,
        }
    }

    /// A principal acting for the given customer.
    pub fn for_customer(agent_id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            agent_id: AgentId::new(agent_id),
            customer_id: Some(customer_id.into()),
        }
    }

    /// Key used to partition rate-limit windows.
    pub fn window_key(&self) -> String {
        match &self.customer_id {
            Some(customer) => format!("{}#{}", self.agent_id, customer),
            None => self.agent_id.0.clone(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.customer_id {
            Some(customer) => write!(f, "{} (customer {})", self.agent_id, customer),
            None => write!(f, "{}", self.agent_id),
        }
    }
}

/// Unique identifier for a single action request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    /// Create a new, unique request ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier shared by every request issued while handling one chat message.
///
/// The corpus runner uses it to pick the audit records belonging to a single
/// exchange out of a log that concurrent sessions also write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub uuid::Uuid);

impl ExchangeId {
    /// Create a new, unique exchange ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One user message delivered to an agent's chat entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Correlates every gateway call made while answering this message.
    pub id: ExchangeId,
    /// Who the agent is serving.
    pub principal: Principal,
    /// The raw user message.
    pub message: String,
}

impl Exchange {
    /// Start a new exchange with a fresh id.
    pub fn new(principal: Principal, message: impl Into<String>) -> Self {
        Self {
            id: ExchangeId::new(),
            principal,
            message: message.into(),
        }
    }
}
