//! Application-level error taxonomy for code redemption.

use thiserror::Error;

use crate::domain::discount::{IneligibilityReason, RuleCode};
use crate::domain::foundation::ValidationError;
use crate::ports::StoreError;

/// Everything that can go wrong when applying or releasing a code.
///
/// Business outcomes (`CodeNotFound`, `MalformedCode`, `Ineligible`) are
/// expected results of normal operation and are never retried here.
/// `TransientConflict` invites the caller to retry the whole call;
/// `Storage` is a server-side fault whose retry policy belongs to the
/// caller's infrastructure.
#[derive(Debug, Error)]
pub enum RedemptionError {
    /// No rule carries the supplied code.
    #[error("no discount rule matches code '{code}'")]
    CodeNotFound { code: String },

    /// The supplied string is not a well-formed code at all.
    #[error("'{code}' is not a well-formed discount code: {reason}")]
    MalformedCode {
        code: String,
        reason: ValidationError,
    },

    /// The rule exists but cannot be applied to this order.
    #[error("code '{code}' cannot be applied: {reason}")]
    Ineligible {
        code: RuleCode,
        reason: IneligibilityReason,
    },

    /// The reservation kept losing conflicting updates and exhausted its
    /// retry budget.
    #[error("reservation for '{code}' lost {attempts} conflicting update(s); try again")]
    TransientConflict { code: RuleCode, attempts: u32 },

    /// The persistence collaborator failed outright.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RedemptionError {
    /// Returns true if retrying the whole call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RedemptionError::TransientConflict { .. })
    }

    /// The ineligibility reason, if that is what this error carries.
    pub fn ineligibility(&self) -> Option<&IneligibilityReason> {
        match self {
            RedemptionError::Ineligible { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_transient() {
        let conflict = RedemptionError::TransientConflict {
            code: RuleCode::try_new("SUMMER10").unwrap(),
            attempts: 3,
        };
        assert!(conflict.is_transient());

        let not_found = RedemptionError::CodeNotFound {
            code: "NOPE99".to_string(),
        };
        assert!(!not_found.is_transient());

        let storage = RedemptionError::Storage(StoreError::Unavailable("down".to_string()));
        assert!(!storage.is_transient());
    }

    #[test]
    fn ineligibility_accessor_extracts_the_reason() {
        let err = RedemptionError::Ineligible {
            code: RuleCode::try_new("SUMMER10").unwrap(),
            reason: IneligibilityReason::Inactive,
        };
        assert_eq!(err.ineligibility(), Some(&IneligibilityReason::Inactive));

        let other = RedemptionError::CodeNotFound {
            code: "NOPE99".to_string(),
        };
        assert!(other.ineligibility().is_none());
    }

    #[test]
    fn storage_errors_convert_with_from() {
        let err: RedemptionError = StoreError::Unavailable("timeout".to_string()).into();
        assert!(matches!(err, RedemptionError::Storage(_)));
    }

    #[test]
    fn display_includes_the_code() {
        let err = RedemptionError::CodeNotFound {
            code: "NOPE99".to_string(),
        };
        assert!(format!("{}", err).contains("NOPE99"));
    }
}
