//! Cross-field matching, e.g. password confirmation.
//!
//! The dependent field must equal its reference field under loose
//! comparison. Presence is not enforced: two empty fields match.

use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

use crate::config::{InputConfig, DEFAULT_MATCH_ERROR_KEY};
use crate::validator::{
    FailureKind, FieldValidator, FormValues, ValidationFailure, ValidationOutcome,
};

/// A value reduced to what loose comparison looks at.
#[derive(Debug, PartialEq)]
enum Loose<'a> {
    Empty,
    Text(Cow<'a, str>),
    Number(f64),
    /// Arrays and objects never match anything.
    Malformed,
}

fn loosen(value: Option<&Value>) -> Loose<'_> {
    match value {
        None | Some(Value::Null) => Loose::Empty,
        Some(Value::String(s)) if s.is_empty() => Loose::Empty,
        Some(Value::String(s)) => Loose::Text(Cow::Borrowed(s)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => Loose::Number(f),
            None => Loose::Text(Cow::Owned(n.to_string())),
        },
        Some(Value::Bool(b)) => Loose::Text(Cow::Owned(b.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Loose::Malformed,
    }
}

fn text_equals_number(text: &str, number: f64) -> bool {
    text.trim().parse::<f64>().is_ok_and(|parsed| parsed == number)
}

/// Loose equality of two field values.
///
/// Absent, `null` and `""` are all empty and match each other. Numbers
/// compare by value, against other numbers or against text that parses as
/// a number, so `"42"` matches `42` and `"1"` matches `1.0`. Booleans
/// compare by their string form.
pub fn loosely_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (loosen(a), loosen(b)) {
        (Loose::Empty, Loose::Empty) => true,
        (Loose::Text(a), Loose::Text(b)) => a == b,
        (Loose::Number(a), Loose::Number(b)) => a == b,
        (Loose::Text(t), Loose::Number(n)) | (Loose::Number(n), Loose::Text(t)) => {
            text_equals_number(&t, n)
        }
        _ => false,
    }
}

/// Compare a dependent value against its reference.
pub fn compare(dependent: Option<&Value>, reference: Option<&Value>) -> ValidationOutcome {
    if loosely_equal(dependent, reference) {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(ValidationFailure {
            kind: FailureKind::Mismatch,
            value: dependent.cloned(),
        })
    }
}

/// Requires the field it is registered on to match another field.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchValidator {
    // Held as a one-element list so it can be handed out as `depends_on`.
    reference: Vec<String>,
    error_key: String,
}

impl MatchValidator {
    /// Match against `reference`, reporting under `"passwordMatch"`.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: vec![reference.into()],
            error_key: DEFAULT_MATCH_ERROR_KEY.to_string(),
        }
    }

    pub fn from_config(reference: impl Into<String>, config: &InputConfig) -> Self {
        Self::new(reference).with_error_key(config.matching.error_key.clone())
    }

    pub fn with_error_key(mut self, key: impl Into<String>) -> Self {
        self.error_key = key.into();
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference[0]
    }
}

impl FieldValidator for MatchValidator {
    fn error_key(&self) -> &str {
        &self.error_key
    }

    fn depends_on(&self) -> &[String] {
        &self.reference
    }

    fn validate(&self, value: Option<&Value>, values: &FormValues) -> ValidationOutcome {
        let outcome = compare(value, values.get(self.reference()));
        if !outcome.is_valid() {
            debug!(reference = self.reference(), key = %self.error_key, "fields do not match");
        }
        outcome
    }
}
