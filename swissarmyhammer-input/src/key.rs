//! Key events as delivered by the input surface.

use serde::{Deserialize, Serialize};

/// Modifier flags held while a key was pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

/// A single key press.
///
/// `key` uses the host's key identifiers: printable keys are the character
/// itself (`"7"`, `"a"`, `"."`), named keys are spelled out (`"Backspace"`,
/// `"Left"`, `"Tab"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.modifiers.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    /// Ctrl or Meta is held: copy, paste, select-all, undo and friends.
    pub fn is_command_chord(&self) -> bool {
        self.modifiers.ctrl || self.modifiers.meta
    }
}
