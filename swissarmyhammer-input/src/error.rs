//! Error types for input handling

use thiserror::Error;

/// Result type for input operations
pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised by form registration, snapshots and configuration.
///
/// Rejected keystrokes and failed validations are not errors; they are
/// reported through `KeyDecision` and `ValidationOutcome`.
#[derive(Debug, Error)]
pub enum InputError {
    /// Field was never registered on the form
    #[error("unknown field: {field}")]
    UnknownField { field: String },

    /// Field registered twice
    #[error("duplicate field: {field}")]
    DuplicateField { field: String },

    /// Form values do not fit the restricted shape
    #[error("form values do not conform to shape '{shape}'")]
    NotSerializable { shape: String },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for InputError {
    fn from(error: figment::Error) -> Self {
        InputError::Config(Box::new(error))
    }
}
