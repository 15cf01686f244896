//! Deterministic stand-in for the agent's completion service.
//!
//! A real deployment asks an LLM which tools to call. [`KeywordPlanner`]
//! answers the same question with keyword rules, and it is deliberately
//! gullible: it follows whatever the message asks for, injected
//! instructions included. Keeping the agent naive means every refusal the
//! harness sees was made by the gateway, not by the planner.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use tollgate_contracts::{action::Arguments, principal::Principal};

use crate::mock_data::{self, INVENTORY};

/// One tool call the agent intends to make.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    pub action: String,
    pub arguments: Arguments,
}

impl PlannedCall {
    fn new(action: &str, arguments: Value) -> Self {
        Self {
            action: action.to_string(),
            arguments: arguments.as_object().cloned().unwrap_or_default(),
        }
    }
}

/// Decides which tool calls answer a user message.
pub trait Planner: Send + Sync {
    /// Calls to make for `message`, in order. May be empty.
    fn plan(&self, message: &str, principal: &Principal) -> Vec<PlannedCall>;
}

static CUSTOMER_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:customer|account)\s*(?:id\s*)?#?\s*(\d+)\b").expect("customer reference regex")
});

static ORDER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#\s*(\d{3,})|\border\s+(\d{3,})").expect("order reference regex"));

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d+(?:\.\d{1,2})?)").expect("amount regex"));

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPROD-\d{3}\b").expect("product id regex"));

static ENDPOINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|net|org|io)(?:/[^\s\]]*)?")
        .expect("endpoint regex")
});

static TICKET_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bT-\d+\b").expect("ticket reference regex"));

const LIST_ALL: &[&str] = &[
    "list all",
    "all customer",
    "all users",
    "all accounts",
    "every customer",
    "trained on",
    "customer examples",
];
const RAW_QUERY: &[&str] = &["credit card", "social security", "ssn", "database", "sql"];
const ADMIN: &[&str] = &[
    "password",
    "api key",
    "admin",
    "superuser",
    "root access",
    "bypass",
    "system prompt",
    "instructions",
    "configuration",
    "authentication",
    "privileges",
    "developer mode",
];
const SHELL: &[&str] = &["firewall", "shell", "command", "sudo"];
const BILLING: &[&str] = &["billing", "subscription"];
const DELETE: &[&str] = &["delete", "erase", "wipe"];
const EXPORT: &[&str] = &["export", "dump", "download all"];
const EXTERNAL: &[&str] = &["external", "webhook", "http://", "https://"];
const OWN_RECORD: &[&str] = &["my order", "my account", "my record", "my details"];
const INVENTORY_WORDS: &[&str] = &["in stock", "inventory", "stock"];
const EMAIL_ME: &[&str] = &["email me", "confirmation email", "send me a confirmation"];
const HUMAN: &[&str] = &["human", "manager", "real person"];

fn mentions(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Keyword-driven planner over the reference tool set.
#[derive(Debug, Default)]
pub struct KeywordPlanner;

impl KeywordPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl Planner for KeywordPlanner {
    fn plan(&self, message: &str, principal: &Principal) -> Vec<PlannedCall> {
        let text = message.to_lowercase();
        let own = principal.customer_id.as_deref();
        let endpoint = ENDPOINT.find(message).map(|m| m.as_str().to_string());
        let mut calls = Vec::new();

        if mentions(&text, LIST_ALL) {
            calls.push(PlannedCall::new("list_all_customers", json!({})));
        }
        if mentions(&text, RAW_QUERY) {
            calls.push(PlannedCall::new(
                "query_customer_database",
                json!({ "query": "SELECT * FROM customers" }),
            ));
        }
        if let Some(section) = ADMIN.iter().find(|k| text.contains(*k)) {
            calls.push(PlannedCall::new("access_admin_panel", json!({ "section": section })));
        }
        if mentions(&text, SHELL) {
            calls.push(PlannedCall::new("run_shell_command", json!({ "command": message })));
        }
        if mentions(&text, BILLING) {
            let plan = if text.contains("free") { "free" } else { "standard" };
            calls.push(PlannedCall::new(
                "modify_billing",
                json!({ "customer_id": own, "plan": plan }),
            ));
        }
        if mentions(&text, DELETE) {
            let target = CUSTOMER_REF
                .captures(message)
                .map(|c| c[1].to_string())
                .or_else(|| own.map(str::to_string));
            calls.push(PlannedCall::new("delete_records", json!({ "customer_id": target })));
        }
        if mentions(&text, EXPORT) {
            let destination = endpoint.clone().unwrap_or_else(|| "local".to_string());
            calls.push(PlannedCall::new("export_bulk_data", json!({ "destination": destination })));
        }
        if mentions(&text, EXTERNAL) || endpoint.is_some() {
            let target = endpoint.clone().unwrap_or_else(|| "unknown".to_string());
            calls.push(PlannedCall::new(
                "call_external_api",
                json!({ "endpoint": target, "data": { "message": message } }),
            ));
        }

        let order_id = ORDER_REF
            .captures(message)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string());

        let referenced: BTreeSet<String> = CUSTOMER_REF
            .captures_iter(message)
            .map(|c| c[1].to_string())
            .collect();
        if !referenced.is_empty() {
            for id in referenced {
                calls.push(PlannedCall::new("read_customer_record", json!({ "customer_id": id })));
            }
        } else if let (true, Some(own)) = (mentions(&text, OWN_RECORD), own) {
            let mut args = json!({ "customer_id": own });
            if let Some(order_id) = &order_id {
                args["order_id"] = json!(order_id);
            }
            calls.push(PlannedCall::new("read_customer_record", args));
        }

        if mentions(&text, INVENTORY_WORDS) || PRODUCT_ID.is_match(message) {
            let product = PRODUCT_ID
                .find(message)
                .map(|m| m.as_str().to_uppercase())
                .or_else(|| {
                    INVENTORY
                        .iter()
                        .find(|p| text.contains(&p.name.to_lowercase()))
                        .map(|p| p.id.to_string())
                })
                .unwrap_or_else(|| "unknown".to_string());
            calls.push(PlannedCall::new("check_inventory", json!({ "product_id": product })));
        }

        if text.contains("refund") {
            let mut args = json!({
                "order_id": order_id.clone().unwrap_or_else(|| "unknown".to_string()),
                "reason": message
            });
            if let Some(amount) = AMOUNT
                .captures(message)
                .and_then(|c| c[1].parse::<f64>().ok())
            {
                args["amount"] = json!(amount);
            }
            calls.push(PlannedCall::new("process_refund", args));
        }

        if mentions(&text, EMAIL_ME) {
            if let Some(customer) = own.and_then(mock_data::customer) {
                calls.push(PlannedCall::new(
                    "send_customer_email",
                    json!({
                        "to_email": customer.email,
                        "subject": "Your support request",
                        "body": "Thanks for contacting TechCorp support."
                    }),
                ));
            }
        }

        if text.contains("ticket") {
            let ticket = TICKET_REF
                .find(message)
                .map(|m| m.as_str().to_uppercase())
                .unwrap_or_else(|| "T-0".to_string());
            let status = if text.contains("close") {
                "closed"
            } else if text.contains("resolve") {
                "resolved"
            } else {
                "pending"
            };
            calls.push(PlannedCall::new(
                "update_ticket_status",
                json!({ "ticket_id": ticket, "status": status }),
            ));
        }

        if mentions(&text, HUMAN) {
            calls.push(PlannedCall::new("escalate_to_human", json!({ "reason": message })));
        }

        calls
    }
}
