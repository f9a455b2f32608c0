//! Rule store port - durable storage for discount rules.
//!
//! This is the one hard external requirement of the engine: the store
//! must expose an atomic conditional update so the usage ledger can make
//! "check the limits, then increment" a single indivisible step. The
//! contract here is a compare-and-set on a per-rule version number;
//! implementations may realize it with row-level CAS, a conditional
//! document update, or a lock keyed by code.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::discount::{DiscountRule, RuleCode, RuleUsage};

/// A rule together with the storage version its state was read at.
///
/// The version is the CAS token for `commit_usage`: a commit succeeds
/// only if the stored version still matches, which proves no concurrent
/// writer touched the rule in between.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRule {
    /// The rule as persisted.
    pub rule: DiscountRule,
    /// Monotonic per-rule version, bumped on every committed update.
    pub version: u64,
}

/// Outcome of a conditional usage commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The update was applied; the redemption (or release) is durable.
    Committed,
    /// Another writer got there first; re-read and retry.
    VersionConflict,
}

/// Errors from the rule store.
///
/// `Unavailable` is the only genuinely transient fault; everything else
/// reflects a violated storage invariant.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend could not be reached or failed outright.
    #[error("rule storage unavailable: {0}")]
    Unavailable(String),

    /// Persisted data could not be decoded into a rule.
    #[error("stored rule data is corrupted: {0}")]
    Corrupted(String),

    /// An insert collided with an existing code.
    #[error("a rule with code '{0}' already exists")]
    DuplicateCode(String),

    /// A delete was refused because the rule has recorded redemptions.
    #[error("rule '{0}' has recorded redemptions and cannot be deleted")]
    RuleInUse(String),
}

/// Port for durable storage of discount rules and their usage counters.
///
/// Implementations must guarantee:
/// - `code` uniqueness (`insert` fails with `DuplicateCode`)
/// - `commit_usage` is atomic per code: of any set of concurrent commits
///   against the same observed version, at most one reports `Committed`
/// - commits against different codes never contend
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Loads the current state of the rule with this code.
    ///
    /// Returns `None` if no rule carries the code.
    async fn find_by_code(&self, code: &RuleCode) -> Result<Option<StoredRule>, StoreError>;

    /// Atomically replaces the rule's usage counters if the stored
    /// version still equals `expected_version`.
    ///
    /// Returns `VersionConflict` (not an error) when the version moved,
    /// including when the rule has been deleted concurrently; callers
    /// re-read and retry.
    async fn commit_usage(
        &self,
        code: &RuleCode,
        expected_version: u64,
        usage: RuleUsage,
    ) -> Result<CommitOutcome, StoreError>;

    /// Inserts a new rule.
    ///
    /// # Errors
    ///
    /// - `DuplicateCode` if a rule with the same code exists
    /// - `Unavailable` on persistence failure
    async fn insert(&self, rule: DiscountRule) -> Result<(), StoreError>;

    /// Deletes a rule that has never been redeemed.
    ///
    /// Deleting an unknown code is a no-op. A rule whose global usage
    /// count is non-zero is never deleted; deactivate it instead.
    ///
    /// # Errors
    ///
    /// - `RuleInUse` if the rule has recorded redemptions
    /// - `Unavailable` on persistence failure
    async fn delete(&self, code: &RuleCode) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn RuleStore) {}
    }

    #[test]
    fn store_errors_display_the_code() {
        let err = StoreError::DuplicateCode("SUMMER10".to_string());
        assert!(format!("{}", err).contains("SUMMER10"));

        let err = StoreError::RuleInUse("SUMMER10".to_string());
        assert!(format!("{}", err).contains("SUMMER10"));
    }
}
