//! Error types for the shapes registry

use thiserror::Error;

/// Result type for shapes operations
pub type Result<T> = std::result::Result<T, ShapesError>;

/// Errors that can occur in shape registry operations.
///
/// The restriction transform itself never fails; these cover the registry
/// around it.
#[derive(Debug, Error)]
pub enum ShapesError {
    /// Shape not found by name
    #[error("shape not found: {name}")]
    ShapeNotFound { name: String },

    /// Shape name unusable as a file name
    #[error("invalid shape name: '{name}'")]
    InvalidName { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShapesError::ShapeNotFound {
            name: "account".into(),
        };
        assert_eq!(err.to_string(), "shape not found: account");
    }

    #[test]
    fn test_invalid_name_display() {
        let err = ShapesError::InvalidName {
            name: "../escape".into(),
        };
        assert!(err.to_string().contains("../escape"));
    }
}
