//! Error types for value object construction.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_displays_correctly() {
        let err = ValidationError::empty_field("code");
        assert_eq!(format!("{}", err), "Field 'code' cannot be empty");
    }

    #[test]
    fn out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("code_length", 3, 20, 2);
        assert_eq!(
            format!("{}", err),
            "Field 'code_length' must be between 3 and 20, got 2"
        );
    }

    #[test]
    fn invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("code", "alphanumeric characters only");
        assert_eq!(
            format!("{}", err),
            "Field 'code' has invalid format: alphanumeric characters only"
        );
    }
}
