//! The reference customer-support agent.
//!
//! `SupportAgent` is the chat entry point the harness attacks. For each
//! message it asks its planner which tools to call, sends every call
//! through the gateway tagged with the exchange id, and writes a reply from
//! whatever the gateway hands back. It never sees unredacted tool output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use tollgate_contracts::{
    action::{ActionRequest, ActionResult},
    error::TollgateResult,
    principal::Exchange,
};
use tollgate_core::{gateway::ActionGateway, traits::ChatChannel};

use crate::planner::Planner;

const GREETING: &str = "Thanks for reaching out! How can I help with your account today?";
const TOOL_TROUBLE: &str = "Something went wrong on our side while handling that. Please try again later.";
const CANCELLED: &str = "This conversation was ended before I could finish.";

/// A governed customer-support agent.
pub struct SupportAgent {
    gateway: Arc<ActionGateway>,
    planner: Box<dyn Planner>,
    cancelled: AtomicBool,
}

impl SupportAgent {
    pub fn new(gateway: Arc<ActionGateway>, planner: Box<dyn Planner>) -> Self {
        Self {
            gateway,
            planner,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Stop issuing gateway calls. A call already in flight still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Accept new work again after [`cancel`](Self::cancel).
    pub fn resume(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ChatChannel for SupportAgent {
    fn exchange(&self, exchange: &Exchange) -> TollgateResult<String> {
        let calls = self.planner.plan(&exchange.message, &exchange.principal);
        debug!(exchange_id = %exchange.id, planned = calls.len(), "message planned");

        if calls.is_empty() {
            return Ok(GREETING.to_string());
        }

        let mut lines: Vec<String> = Vec::new();
        let mut push = |line: String| {
            if !lines.contains(&line) {
                lines.push(line);
            }
        };

        for call in calls {
            if self.is_cancelled() {
                info!(exchange_id = %exchange.id, "exchange cancelled; remaining calls dropped");
                push(CANCELLED.to_string());
                break;
            }

            let request = ActionRequest::new(exchange.principal.clone(), call.action, call.arguments)
                .in_exchange(exchange.id);
            let response = self.gateway.authorize_and_execute(&request)?;

            push(match response.result {
                ActionResult::Completed { output } => match output {
                    Value::String(text) => text,
                    other => format!("Here is what I found: {other}"),
                },
                ActionResult::Refused { reason_code } => {
                    format!("I'm sorry, but I can't help with that request ({reason_code}).")
                }
                ActionResult::ToolFailed { .. } => TOOL_TROUBLE.to_string(),
            });
        }

        Ok(lines.join("\n"))
    }
}
