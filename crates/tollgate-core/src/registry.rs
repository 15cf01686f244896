//! Explicit tool lookup table.
//!
//! Tools are registered once at startup under their descriptor's action
//! name. The argument schema is compiled at registration so a malformed
//! schema fails startup rather than the first call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use tollgate_contracts::{
    action::Arguments,
    error::{TollgateError, TollgateResult, ToolError},
    tool::ToolDescriptor,
};

use crate::traits::Tool;

struct Registered {
    tool: Arc<dyn Tool>,
    validator: jsonschema::Validator,
}

/// Registered tools keyed by action name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Registered>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under its descriptor's action name.
    ///
    /// Returns `ConfigError` if the name is taken or the argument schema
    /// does not compile.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> TollgateResult<()> {
        let descriptor = tool.descriptor();
        let name = descriptor.action_name.clone();
        if self.tools.contains_key(&name) {
            return Err(TollgateError::ConfigError {
                reason: format!("tool '{name}' is already registered"),
            });
        }
        let validator = jsonschema::validator_for(&descriptor.argument_schema).map_err(|e| {
            TollgateError::ConfigError {
                reason: format!("tool '{name}' has an invalid argument schema: {e}"),
            }
        })?;
        debug!(action = %name, "tool registered");
        self.tools.insert(name, Registered { tool, validator });
        Ok(())
    }

    /// Descriptor for `action`, if registered.
    pub fn descriptor(&self, action: &str) -> Option<&ToolDescriptor> {
        self.tools.get(action).map(|r| r.tool.descriptor())
    }

    /// All descriptors, sorted by action name.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut all: Vec<&ToolDescriptor> = self.tools.values().map(|r| r.tool.descriptor()).collect();
        all.sort_by(|a, b| a.action_name.cmp(&b.action_name));
        all
    }

    /// Validate `arguments` against the tool's schema, then execute it.
    pub fn invoke(&self, action: &str, arguments: &Arguments) -> Result<Value, ToolError> {
        let registered = self.tools.get(action).ok_or_else(|| ToolError::NotRegistered {
            action: action.to_string(),
        })?;

        let instance = Value::Object(arguments.clone());
        let violations: Vec<String> = registered
            .validator
            .iter_errors(&instance)
            .map(|e| format!("{} at '{}'", e, e.instance_path))
            .collect();
        if !violations.is_empty() {
            return Err(ToolError::InvalidArguments {
                action: action.to_string(),
                reason: violations.join("; "),
            });
        }

        registered.tool.execute(arguments)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tollgate_contracts::tool::ResultKind;

    use super::*;

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new(name: &str) -> Self {
            Self {
                descriptor: ToolDescriptor::new(
                    name,
                    "echoes its arguments",
                    json!({
                        "type": "object",
                        "properties": { "text": { "type": "string" } },
                        "required": ["text"]
                    }),
                    ResultKind::Structured,
                ),
            }
        }
    }

    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        fn execute(&self, arguments: &Arguments) -> Result<Value, ToolError> {
            Ok(Value::Object(arguments.clone()))
        }
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn invoke_runs_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo"))).unwrap();

        let out = registry.invoke("echo", &args(json!({ "text": "hi" }))).unwrap();
        assert_eq!(out, json!({ "text": "hi" }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo"))).unwrap();
        let err = registry.register(Arc::new(EchoTool::new("echo"))).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn invalid_arguments_never_reach_the_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo"))).unwrap();

        match registry.invoke("echo", &args(json!({ "text": 5 }))) {
            Err(ToolError::InvalidArguments { action, .. }) => assert_eq!(action, "echo"),
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_not_registered() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.invoke("missing", &Arguments::new()),
            Err(ToolError::NotRegistered { action: "missing".to_string() })
        );
    }

    #[test]
    fn descriptors_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("b"))).unwrap();
        registry.register(Arc::new(EchoTool::new("a"))).unwrap();
        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.action_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(registry.descriptor("a").is_some());
    }
}
