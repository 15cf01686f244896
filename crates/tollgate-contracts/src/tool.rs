//! Tool capability descriptors.
//!
//! Every tool the gateway can forward to is described up front by a
//! `ToolDescriptor` and registered explicitly. Nothing about a tool is
//! discovered at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The shape of what a tool returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// A JSON object of named fields.
    Structured,
    /// Free text.
    Text,
}

/// Fixed-shape description of one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique action name, the key policies refer to (e.g. "send_customer_email").
    pub action_name: String,
    /// Human-readable summary.
    pub description: String,
    /// JSON Schema the arguments must satisfy before the tool is invoked.
    pub argument_schema: Value,
    pub result_kind: ResultKind,
}

impl ToolDescriptor {
    /// Build a descriptor.
    pub fn new(
        action_name: impl Into<String>,
        description: impl Into<String>,
        argument_schema: Value,
        result_kind: ResultKind,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            description: description.into(),
            argument_schema,
            result_kind,
        }
    }
}
