//! Discount rule aggregate.
//!
//! One rule describes one coupon/offer: its worth, validity window,
//! scope, and usage limits, together with the usage counters consumed by
//! redemptions.
//!
//! # Invariants
//!
//! - `code` is unique across the rule set (enforced by the store)
//! - `valid_from <= valid_to` when both are present
//! - `usage.global_count` never exceeds `global_usage_limit` when set
//! - no user's count ever exceeds `per_user_usage_limit`
//!
//! Rules are immutable during an evaluation; only the usage ledger's
//! atomic commit mutates the counters. Deactivation is `active = false`,
//! not deletion; a rule with recorded redemptions is never deleted.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, RuleId, Timestamp, ValidationError};

use super::{DiscountKind, RuleCode, RuleScope, RuleUsage};

/// A coupon/offer definition with eligibility terms and usage limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    /// Surrogate identifier for storage.
    pub id: RuleId,

    /// Customer-facing code, unique across all rules.
    pub code: RuleCode,

    /// What the rule is worth.
    pub kind: DiscountKind,

    /// Minimum order subtotal required to apply the rule.
    pub min_order_value: Money,

    /// Start of the validity window (inclusive).
    pub valid_from: Timestamp,

    /// End of the validity window (inclusive); `None` means no end.
    pub valid_to: Option<Timestamp>,

    /// Cap on total redemptions across all users; `None` means unlimited.
    pub global_usage_limit: Option<u32>,

    /// Maximum redemptions by one user.
    pub per_user_usage_limit: u32,

    /// If true, only users with zero prior completed orders qualify.
    pub first_order_only: bool,

    /// Which part of an order the rule applies to.
    pub scope: RuleScope,

    /// Kill-switch, independent of the validity window.
    pub active: bool,

    /// Redemption counters, mutated only by the usage ledger.
    pub usage: RuleUsage,

    /// When the rule was created.
    pub created_at: Timestamp,

    /// When the rule was last updated.
    pub updated_at: Timestamp,
}

impl DiscountRule {
    /// Creates an active rule valid from `valid_from` with no end, no
    /// minimum, unlimited global usage, one redemption per user, and
    /// scope `All`.
    pub fn new(code: RuleCode, kind: DiscountKind, valid_from: Timestamp) -> Self {
        let now = Timestamp::now();
        Self {
            id: RuleId::new(),
            code,
            kind,
            min_order_value: Money::ZERO,
            valid_from,
            valid_to: None,
            global_usage_limit: None,
            per_user_usage_limit: 1,
            first_order_only: false,
            scope: RuleScope::All,
            active: true,
            usage: RuleUsage::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the inclusive end of the validity window.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `valid_to` precedes `valid_from`.
    pub fn valid_until(mut self, valid_to: Timestamp) -> Result<Self, ValidationError> {
        if valid_to.is_before(&self.valid_from) {
            return Err(ValidationError::invalid_format(
                "valid_to",
                "must not precede valid_from",
            ));
        }
        self.valid_to = Some(valid_to);
        Ok(self)
    }

    /// Sets the minimum order subtotal.
    pub fn with_min_order_value(mut self, minimum: Money) -> Self {
        self.min_order_value = minimum;
        self
    }

    /// Caps total redemptions across all users.
    pub fn with_global_limit(mut self, limit: u32) -> Self {
        self.global_usage_limit = Some(limit);
        self
    }

    /// Sets the per-user redemption limit.
    pub fn with_per_user_limit(mut self, limit: u32) -> Self {
        self.per_user_usage_limit = limit;
        self
    }

    /// Restricts the rule to users on their first order.
    pub fn first_order_only(mut self) -> Self {
        self.first_order_only = true;
        self
    }

    /// Restricts the rule to a scope.
    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    /// Deactivates the rule without touching its validity window.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}
