//! Usage ledger - the only writer of redemption state.
//!
//! The ledger turns "check the limits, then increment" into one atomic
//! unit per code. Each attempt re-reads the current persisted rule,
//! re-runs the eligibility evaluation against that fresh snapshot, and
//! commits the incremented counters with a compare-and-set on the rule's
//! storage version. Losing the CAS means another checkout got there
//! first; the attempt is repeated against the new state, bounded by a
//! small retry budget.
//!
//! Reservations for different codes never contend: the CAS is scoped to
//! one rule, so there is no global lock to queue behind.
//!
//! A storage failure during the commit leaves the outcome unknown. The
//! ledger surfaces it as-is and never retries it, preferring a missed
//! redemption over a double one.

use std::sync::Arc;

use crate::domain::discount::{
    calculate, evaluate, EligibilityVerdict, OrderContext, RuleCode,
};
use crate::domain::foundation::{Money, Timestamp, UserId};
use crate::ports::{CommitOutcome, RuleStore};

use super::RedemptionError;

/// How many CAS attempts a reservation makes before giving up.
const DEFAULT_RESERVE_ATTEMPTS: u32 = 3;

/// A successfully recorded redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionResult {
    /// The discount to subtract from the order subtotal.
    pub discount: Money,
    /// The normalized code that was applied.
    pub code: RuleCode,
    /// When the redemption was recorded (the order's injected `now`).
    pub applied_at: Timestamp,
}

/// Records and releases redemptions against the rule store.
pub struct UsageLedger {
    store: Arc<dyn RuleStore>,
    reserve_attempts: u32,
}

impl UsageLedger {
    /// Creates a ledger with the default retry budget.
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            reserve_attempts: DEFAULT_RESERVE_ATTEMPTS,
        }
    }

    /// Overrides the CAS retry budget (minimum 1).
    pub fn with_reserve_attempts(mut self, attempts: u32) -> Self {
        self.reserve_attempts = attempts.max(1);
        self
    }

    /// Atomically checks eligibility and records one redemption.
    ///
    /// The eligibility re-check and the counter increment act as a single
    /// step: concurrent reservations for the same code cannot both pass
    /// the limit check and both increment past a limit. Once this returns
    /// `Ok`, the redemption is final and only [`release`](Self::release)
    /// undoes it.
    ///
    /// # Errors
    ///
    /// - `CodeNotFound` if no rule carries the code
    /// - `Ineligible` with the first failing check's reason
    /// - `TransientConflict` when the retry budget is exhausted
    /// - `Storage` on persistence failure (outcome unknown; callers must
    ///   not assume the redemption happened)
    pub async fn reserve(
        &self,
        code: &RuleCode,
        order: &OrderContext,
    ) -> Result<RedemptionResult, RedemptionError> {
        for attempt in 1..=self.reserve_attempts {
            let Some(stored) = self.store.find_by_code(code).await? else {
                return Err(RedemptionError::CodeNotFound {
                    code: code.to_string(),
                });
            };
            let rule = stored.rule;

            if let EligibilityVerdict::Ineligible(reason) = evaluate(&rule, order, &rule.usage) {
                return Err(RedemptionError::Ineligible {
                    code: code.clone(),
                    reason,
                });
            }

            // Discount and counters both come from the snapshot the CAS
            // will validate, so a committed reservation reflects exactly
            // the state it was checked against.
            let discount = calculate(&rule.kind, order.subtotal);
            let mut usage = rule.usage.clone();
            usage.record(order.user_id.clone(), order.now);

            match self.store.commit_usage(code, stored.version, usage).await? {
                CommitOutcome::Committed => {
                    tracing::info!(
                        code = %code,
                        user = %order.user_id,
                        discount = %discount,
                        "redemption reserved"
                    );
                    return Ok(RedemptionResult {
                        discount,
                        code: code.clone(),
                        applied_at: order.now,
                    });
                }
                CommitOutcome::VersionConflict => {
                    tracing::debug!(
                        code = %code,
                        attempt,
                        "reservation lost a conflicting update, retrying"
                    );
                }
            }
        }

        tracing::warn!(
            code = %code,
            attempts = self.reserve_attempts,
            "reservation retry budget exhausted"
        );
        Err(RedemptionError::TransientConflict {
            code: code.clone(),
            attempts: self.reserve_attempts,
        })
    }

    /// Releases one redemption for the user, the inverse of `reserve`.
    ///
    /// Decrements the global and per-user counters with a floor of zero.
    /// A user with no recorded usage is a successful no-op, not an error.
    ///
    /// # Errors
    ///
    /// - `CodeNotFound` if no rule carries the code
    /// - `TransientConflict` when the retry budget is exhausted
    /// - `Storage` on persistence failure
    pub async fn release(
        &self,
        code: &RuleCode,
        user_id: &UserId,
    ) -> Result<(), RedemptionError> {
        for attempt in 1..=self.reserve_attempts {
            let Some(stored) = self.store.find_by_code(code).await? else {
                return Err(RedemptionError::CodeNotFound {
                    code: code.to_string(),
                });
            };

            let mut usage = stored.rule.usage.clone();
            if !usage.release(user_id) {
                return Ok(());
            }

            match self.store.commit_usage(code, stored.version, usage).await? {
                CommitOutcome::Committed => {
                    tracing::info!(code = %code, user = %user_id, "redemption released");
                    return Ok(());
                }
                CommitOutcome::VersionConflict => {
                    tracing::debug!(
                        code = %code,
                        attempt,
                        "release lost a conflicting update, retrying"
                    );
                }
            }
        }

        tracing::warn!(
            code = %code,
            attempts = self.reserve_attempts,
            "release retry budget exhausted"
        );
        Err(RedemptionError::TransientConflict {
            code: code.clone(),
            attempts: self.reserve_attempts,
        })
    }
}
