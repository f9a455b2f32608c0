//! Discount kind - what a rule is worth.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, ValidationError};

/// What a discount rule takes off an order.
///
/// A closed variant: the calculator and evaluator match on it
/// exhaustively, so a new kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// A percentage of the order subtotal, optionally capped.
    Percentage {
        /// Percent of the subtotal, on a 0-100 scale.
        percent: Decimal,
        /// Upper bound on the computed discount, if any.
        cap: Option<Money>,
    },
    /// A fixed amount off the order subtotal.
    Fixed {
        /// The amount to subtract.
        amount: Money,
    },
}

impl DiscountKind {
    /// Creates a percentage discount, rejecting negative percentages.
    ///
    /// Values above 100 are accepted; the calculator clamps the result to
    /// the order subtotal regardless.
    pub fn percentage(percent: Decimal, cap: Option<Money>) -> Result<Self, ValidationError> {
        if percent.is_sign_negative() {
            return Err(ValidationError::invalid_format(
                "percent",
                "must not be negative",
            ));
        }
        Ok(Self::Percentage { percent, cap })
    }

    /// Creates a fixed-amount discount.
    pub fn fixed(amount: Money) -> Self {
        Self::Fixed { amount }
    }
}
