//! Field redaction for tool results.
//!
//! `FieldRedactor` implements the `Redactor` trait from `tollgate-core`.
//! Redaction runs in two passes over a JSON value:
//!
//! 1. **Structural**: any object key equal to a blocked field
//!    (case-insensitive) has its whole value replaced by the placeholder,
//!    at any depth.
//! 2. **Textual**: every remaining string leaf, and the decimal form of
//!    every number leaf, is scanned with the pattern set and matching value
//!    spans are masked.
//!
//! Over-redaction is preferred to under-redaction.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use tollgate_core::{config::RedactionConfig, traits::Redactor};

use crate::patterns::{merge_spans, FieldPattern, PatternSet};

/// The Tollgate redactor.
#[derive(Debug)]
pub struct FieldRedactor {
    placeholder: String,
    patterns: Arc<PatternSet>,
}

impl FieldRedactor {
    /// A redactor writing `placeholder` over masked values.
    pub fn new(placeholder: impl Into<String>, patterns: Arc<PatternSet>) -> Self {
        Self {
            placeholder: placeholder.into(),
            patterns,
        }
    }

    pub fn from_config(config: &RedactionConfig, patterns: Arc<PatternSet>) -> Self {
        Self::new(config.placeholder.clone(), patterns)
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Mask every value of `fields` found in free text.
    pub fn redact_text(&self, text: &str, fields: &BTreeSet<String>) -> String {
        let patterns: Vec<Arc<FieldPattern>> = fields.iter().map(|f| self.patterns.pattern(f)).collect();
        self.mask(text, &patterns)
    }

    fn mask(&self, text: &str, patterns: &[Arc<FieldPattern>]) -> String {
        let spans = merge_spans(
            patterns
                .iter()
                .flat_map(|p| p.find_values(text, &self.placeholder))
                .collect(),
        );
        if spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for span in spans {
            out.push_str(&text[cursor..span.start]);
            out.push_str(&self.placeholder);
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    fn walk(&self, value: &Value, fields: &BTreeSet<String>, patterns: &[Arc<FieldPattern>]) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    let masked = if fields.contains(&key.to_lowercase()) {
                        debug!(field = %key, "blocked field redacted");
                        Value::String(self.placeholder.clone())
                    } else {
                        self.walk(child, fields, patterns)
                    };
                    out.insert(key.clone(), masked);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.walk(v, fields, patterns)).collect())
            }
            Value::String(s) => Value::String(self.mask(s, patterns)),
            Value::Number(n) => {
                let digits = n.to_string();
                if self.mask(&digits, patterns) == digits {
                    value.clone()
                } else {
                    Value::String(self.placeholder.clone())
                }
            }
            Value::Bool(_) | Value::Null => value.clone(),
        }
    }
}

impl Redactor for FieldRedactor {
    fn redact(&self, result: &Value, blocked_fields: &BTreeSet<String>) -> Value {
        if blocked_fields.is_empty() {
            return result.clone();
        }
        let fields: BTreeSet<String> = blocked_fields.iter().map(|f| f.to_lowercase()).collect();
        let patterns: Vec<Arc<FieldPattern>> = fields.iter().map(|f| self.patterns.pattern(f)).collect();
        self.walk(result, &fields, &patterns)
    }
}
