//! Keystroke filtering for numeric-only fields.
//!
//! Every key event is classified on its own; nothing is carried between
//! events. The filter admits characters, it does not parse values, so both
//! decimal separators pass regardless of locale.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::InputConfig;
use crate::key::KeyEvent;

/// Named keys a numeric field always accepts.
pub const CONTROL_KEYS: [&str; 11] = [
    ".",
    ",",
    "Escape",
    "Enter",
    "Delete",
    "Backspace",
    "Home",
    "End",
    "Left",
    "Right",
    "Tab",
];

const ARROW_ALIASES: [&str; 2] = ["ArrowLeft", "ArrowRight"];

/// Outcome of filtering one key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyDecision {
    AcceptDigit,
    /// Separator, editing/navigation key, or a ctrl/meta shortcut.
    AcceptControlKey,
    Reject,
}

impl KeyDecision {
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Reject)
    }

    /// The host must suppress the event's default effect on the field.
    pub fn prevents_default(self) -> bool {
        matches!(self, Self::Reject)
    }
}

/// Accept/reject decision registered against a field.
pub trait KeyFilter {
    fn decide(&self, event: &KeyEvent) -> KeyDecision;
}

impl<F> KeyFilter for F
where
    F: Fn(&KeyEvent) -> KeyDecision,
{
    fn decide(&self, event: &KeyEvent) -> KeyDecision {
        self(event)
    }
}

/// Filter for numeric-only fields.
///
/// Policy, first match wins:
/// 1. a single decimal digit,
/// 2. a decimal separator or editing/navigation key ([`CONTROL_KEYS`]),
/// 3. ctrl or meta held, whatever the key.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericKeyFilter {
    extra_keys: Vec<String>,
    arrow_aliases: bool,
}

impl NumericKeyFilter {
    pub fn new() -> Self {
        Self {
            extra_keys: Vec::new(),
            arrow_aliases: true,
        }
    }

    pub fn from_config(config: &InputConfig) -> Self {
        Self {
            extra_keys: config.numeric.extra_keys.clone(),
            arrow_aliases: config.numeric.arrow_aliases,
        }
    }

    /// Admit additional named keys, e.g. `"PageUp"`.
    pub fn with_extra_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.extra_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    fn is_control_key(&self, key: &str) -> bool {
        CONTROL_KEYS.contains(&key)
            || (self.arrow_aliases && ARROW_ALIASES.contains(&key))
            || self.extra_keys.iter().any(|k| k == key)
    }
}

impl Default for NumericKeyFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFilter for NumericKeyFilter {
    fn decide(&self, event: &KeyEvent) -> KeyDecision {
        let decision = if is_digit(&event.key) {
            KeyDecision::AcceptDigit
        } else if self.is_control_key(&event.key) || event.is_command_chord() {
            KeyDecision::AcceptControlKey
        } else {
            KeyDecision::Reject
        };
        trace!(key = %event.key, ?decision, "numeric key filter");
        decision
    }
}

fn is_digit(key: &str) -> bool {
    let mut chars = key.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit())
}
