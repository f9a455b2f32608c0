//! Rule code value object.
//!
//! Represents the customer-facing identifier of a discount rule.
//!
//! # Validation Rules
//!
//! - 3-20 characters after trimming
//! - ASCII alphanumeric, `-` and `_` only
//! - Normalized to uppercase (lookups are case-insensitive)

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

/// A validated, case-normalized discount code.
///
/// Two codes that differ only in case are the same code: `summer10` and
/// `SUMMER10` both normalize to `SUMMER10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCode(String);

impl RuleCode {
    /// Creates a new RuleCode from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - The trimmed code is empty
    /// - The code is shorter than 3 or longer than 20 characters
    /// - The code contains characters other than ASCII alphanumerics,
    ///   `-`, or `_`
    pub fn try_new(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }

        if trimmed.len() < 3 || trimmed.len() > 20 {
            return Err(ValidationError::out_of_range(
                "code_length",
                3,
                20,
                trimmed.len() as i64,
            ));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "code",
                "ASCII alphanumeric, '-' and '_' only",
            ));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the normalized code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for RuleCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl TryFrom<String> for RuleCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(&value)
    }
}
