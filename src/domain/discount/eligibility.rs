//! Eligibility evaluator - decides whether a rule applies to an order.
//!
//! `evaluate` is pure and side-effect-free: it is called once
//! optimistically for early feedback and again inside the ledger's atomic
//! reservation, and both calls must agree given the same inputs.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, Timestamp};

use super::{DiscountRule, OrderContext, RuleUsage};

/// Why a rule cannot be applied to an order.
///
/// These are terminal business outcomes, not faults: they are returned as
/// values and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// The rule has been switched off.
    Inactive,

    /// The validity window has not opened yet.
    NotYetValid {
        /// When the rule becomes valid.
        valid_from: Timestamp,
    },

    /// The validity window has closed.
    Expired {
        /// The last instant the rule was valid.
        valid_to: Timestamp,
    },

    /// The order subtotal is below the rule's minimum.
    BelowMinimum {
        /// Required minimum subtotal.
        minimum: Money,
        /// The order's actual subtotal.
        subtotal: Money,
    },

    /// The rule is restricted to first orders and this is not one.
    NotFirstOrder,

    /// No item in the order falls inside the rule's scope.
    OutOfScope,

    /// The rule has been redeemed up to its global cap.
    GlobalLimitReached {
        /// The global redemption cap.
        limit: u32,
    },

    /// This user has redeemed the rule up to the per-user cap.
    UserLimitReached {
        /// The per-user redemption cap.
        limit: u32,
    },
}

impl IneligibilityReason {
    /// A user-facing message for the reason.
    pub fn user_message(&self) -> String {
        match self {
            IneligibilityReason::Inactive => {
                "This code is no longer active.".to_string()
            }
            IneligibilityReason::NotYetValid { valid_from } => {
                format!("This code is not valid yet. It starts on {}.", valid_from)
            }
            IneligibilityReason::Expired { valid_to } => {
                format!("This code expired on {}.", valid_to)
            }
            IneligibilityReason::BelowMinimum { minimum, .. } => {
                format!("This code requires a minimum order of {}.", minimum)
            }
            IneligibilityReason::NotFirstOrder => {
                "This code is only valid on your first order.".to_string()
            }
            IneligibilityReason::OutOfScope => {
                "This code does not apply to the items in your order.".to_string()
            }
            IneligibilityReason::GlobalLimitReached { .. } => {
                "This code has been fully redeemed.".to_string()
            }
            IneligibilityReason::UserLimitReached { limit } => {
                format!("You have already used this code {} time(s).", limit)
            }
        }
    }
}

impl std::fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

/// The outcome of an eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityVerdict {
    /// Every check passed; the rule may be applied.
    Eligible,
    /// A check failed; the reason is the first failure in check order.
    Ineligible(IneligibilityReason),
}

impl EligibilityVerdict {
    /// Returns true if the verdict is `Eligible`.
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityVerdict::Eligible)
    }

    /// Converts to a Result, with ineligibility becoming an error.
    pub fn into_result(self) -> Result<(), IneligibilityReason> {
        match self {
            EligibilityVerdict::Eligible => Ok(()),
            EligibilityVerdict::Ineligible(reason) => Err(reason),
        }
    }
}

/// Evaluates whether `rule` may be applied to `order` given the usage
/// counters in `usage`.
///
/// Checks run in a fixed order and the first failure wins, so callers
/// always see a deterministic reason:
///
/// 1. kill-switch
/// 2. validity window (`valid_to` inclusive)
/// 3. minimum subtotal
/// 4. first-order gate
/// 5. scope
/// 6. global usage cap
/// 7. per-user usage cap
///
/// The usage snapshot is passed separately from the rule so the ledger
/// can re-check against the freshest persisted counters.
pub fn evaluate(
    rule: &DiscountRule,
    order: &OrderContext,
    usage: &RuleUsage,
) -> EligibilityVerdict {
    use EligibilityVerdict::Ineligible;
    use IneligibilityReason::*;

    if !rule.active {
        return Ineligible(Inactive);
    }

    if order.now.is_before(&rule.valid_from) {
        return Ineligible(NotYetValid {
            valid_from: rule.valid_from,
        });
    }
    if let Some(valid_to) = rule.valid_to {
        if order.now.is_after(&valid_to) {
            return Ineligible(Expired { valid_to });
        }
    }

    if order.subtotal < rule.min_order_value {
        return Ineligible(BelowMinimum {
            minimum: rule.min_order_value,
            subtotal: order.subtotal,
        });
    }

    if rule.first_order_only && !order.is_first_order {
        return Ineligible(NotFirstOrder);
    }

    if !rule.scope.matches(order) {
        return Ineligible(OutOfScope);
    }

    if let Some(limit) = rule.global_usage_limit {
        if usage.global_count() >= limit {
            return Ineligible(GlobalLimitReached { limit });
        }
    }

    if usage.count_for(&order.user_id) >= rule.per_user_usage_limit {
        return Ineligible(UserLimitReached {
            limit: rule.per_user_usage_limit,
        });
    }

    EligibilityVerdict::Eligible
}
