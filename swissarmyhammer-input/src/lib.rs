//! Live input filtering and cross-field validation
//!
//! Two behaviors a form attaches to its fields:
//!
//! - [`NumericKeyFilter`] admits only digits, decimal separators, editing
//!   keys and ctrl/meta shortcuts into a numeric field
//! - [`MatchValidator`] requires a field to loosely equal another one, the
//!   password confirmation case
//!
//! Both are registered explicitly on a [`Form`], which routes key events and
//! value changes and re-validates dependents when a referenced field moves.
//! A form's values can be snapshotted as JSON against a restricted shape
//! from `swissarmyhammer-shapes`.

pub mod config;
pub mod cross_field;
pub mod error;
pub mod form;
pub mod key;
pub mod keystroke;
pub mod validator;

pub use config::{InputConfig, MatchingConfig, NumericConfig};
pub use cross_field::{compare, loosely_equal, MatchValidator};
pub use error::{InputError, Result};
pub use form::{FieldErrors, Form};
pub use key::{KeyEvent, Modifiers};
pub use keystroke::{KeyDecision, KeyFilter, NumericKeyFilter, CONTROL_KEYS};
pub use validator::{
    FailureKind, FieldValidator, FormValues, ValidationFailure, ValidationOutcome,
};
