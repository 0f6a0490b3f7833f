//! Field validation contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current values of a form, by field name. Unset fields are absent.
pub type FormValues = IndexMap<String, Value>;

/// Named reason a validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Mismatch,
}

/// Payload of a failed validation: what went wrong and the offending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub value: Option<Value>,
}

/// Result of one validation pass. Created fresh each time.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Valid => None,
            Self::Invalid(failure) => Some(failure),
        }
    }
}

/// A validator registered against a field.
///
/// Validators are pure: they see the field's current value and the form's
/// values and report an outcome. A validator that reads other fields lists
/// them in `depends_on` so the form re-runs it when they change.
pub trait FieldValidator {
    /// Key the failure is reported under, e.g. `"passwordMatch"`.
    fn error_key(&self) -> &str;

    fn depends_on(&self) -> &[String] {
        &[]
    }

    fn validate(&self, value: Option<&Value>, values: &FormValues) -> ValidationOutcome;
}
