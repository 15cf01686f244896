//! The declared, versioned pattern set shared by redaction and classification.
//!
//! Each blocked field gets a [`FieldPattern`] with two kinds of matcher:
//!
//! - **Label patterns** find the field name mentioned next to a value:
//!   `ssn: 123-45-6789`, `"password": "hunter2"`, `password is hunter2`,
//!   `credit card 4111 1111 1111 1111`. The bare adjacent form only fires
//!   when the value contains a digit.
//! - **Shape patterns** find values by their well-known form regardless of
//!   labels (SSNs, card numbers, API keys, email addresses). A field gets a
//!   shape when its name contains the shape's keyword.
//!
//! Only the value span of a match is reported, never the label. Matches
//! that already start with the placeholder are skipped, so masking is
//! idempotent.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::Regex;
use tracing::warn;

/// Bumped whenever any matcher below changes behaviour.
pub const PATTERN_SET_VERSION: &str = "2026.10.1";

/// US social security numbers: ddd-dd-dddd.
static SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("SSN regex"));

/// 13-16 digit card numbers, optionally grouped by spaces or dashes.
static CARD_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]?){12,15}\d\b").expect("card number regex"));

/// Secret-looking API keys: sk-..., sk_live_..., AKIA...
static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sk-[A-Za-z0-9_-]{20,}|[ps]k_(?:live|test)_[A-Za-z0-9]{20,}|AKIA[0-9A-Z]{16}")
        .expect("API key regex")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

/// A value format recognised without a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Ssn,
    CardNumber,
    ApiKey,
    Email,
}

impl Shape {
    fn regex(&self) -> &'static Regex {
        match self {
            Self::Ssn => &SSN,
            Self::CardNumber => &CARD_NUMBER,
            Self::ApiKey => &API_KEY,
            Self::Email => &EMAIL,
        }
    }

    /// Shapes implied by a field name, e.g. `credit_card` → card numbers.
    pub fn for_field(field: &str) -> Vec<Shape> {
        let f = field.to_lowercase();
        let mut shapes = Vec::new();
        if f.contains("ssn") || f.contains("social_security") || f.contains("social security") {
            shapes.push(Self::Ssn);
        }
        if f.contains("card") {
            shapes.push(Self::CardNumber);
        }
        if ["api_key", "apikey", "token", "secret"].iter().any(|k| f.contains(k)) {
            shapes.push(Self::ApiKey);
        }
        if f.contains("email") {
            shapes.push(Self::Email);
        }
        shapes
    }
}

/// Matchers for one field name.
#[derive(Debug)]
pub struct FieldPattern {
    field: String,
    assigned: Option<Regex>,
    adjacent: Option<Regex>,
    shapes: Vec<Shape>,
}

const VALUE: &str = r#"\d(?:[\d\- ]*\d)?|[^\s"',;}\]]+"#;
const DIGIT_VALUE: &str = r"\d(?:[\d\- ]*\d)?";
const SUFFIX: &str = r"(?:s)?(?:[\s_-]?(?:number|num|no\.?|#))?";

impl FieldPattern {
    /// Compile the matchers for `field`.
    pub fn new(field: &str) -> Self {
        let label = label_pattern(field);
        let compile = |source: String| match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(field = %field, error = %e, "label pattern failed to compile; shapes only");
                None
            }
        };
        let (assigned, adjacent) = if label.is_empty() {
            (None, None)
        } else {
            (
                compile(format!(
                    r#"(?i)(?:^|[^a-z0-9]){label}{SUFFIX}["']?\s*(?:[:=]|\b(?:is|was)\b)\s*["']?(?P<value>{VALUE})"#
                )),
                compile(format!(r"(?i)(?:^|[^a-z0-9]){label}{SUFFIX}\s+(?P<value>{DIGIT_VALUE})")),
            )
        };
        Self {
            field: field.to_lowercase(),
            assigned,
            adjacent,
            shapes: Shape::for_field(field),
        }
    }

    /// The lowercased field name this pattern covers.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Byte ranges of every unmasked value for this field in `text`.
    ///
    /// Ranges are sorted and may overlap.
    pub fn find_values(&self, text: &str, placeholder: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        for shape in &self.shapes {
            spans.extend(shape.regex().find_iter(text).map(|m| m.range()));
        }
        for re in self.assigned.iter().chain(self.adjacent.iter()) {
            for caps in re.captures_iter(text) {
                if let Some(value) = caps.name("value") {
                    spans.push(value.range());
                }
            }
        }
        spans.retain(|r| !r.is_empty() && !text[r.start..].starts_with(placeholder));
        spans.sort_by_key(|r| (r.start, r.end));
        spans
    }
}

/// `credit_card` → `credit[\s_-]?card`, each word escaped.
fn label_pattern(field: &str) -> String {
    field
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[\s_-]?")
}

/// Lazily compiled field patterns, shared between threads.
#[derive(Debug, Default)]
pub struct PatternSet {
    compiled: Mutex<HashMap<String, Arc<FieldPattern>>>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pattern for `field`, compiling it on first use.
    pub fn pattern(&self, field: &str) -> Arc<FieldPattern> {
        let key = field.to_lowercase();
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            compiled
                .entry(key)
                .or_insert_with_key(|k| Arc::new(FieldPattern::new(k))),
        )
    }

    pub fn version(&self) -> &'static str {
        PATTERN_SET_VERSION
    }
}

/// Merge sorted, possibly overlapping ranges.
pub(crate) fn merge_spans(mut spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
    spans.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}
