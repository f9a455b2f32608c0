//! Discount calculator - computes what a rule is worth on a subtotal.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::foundation::Money;

use super::DiscountKind;

/// Computes the discount amount for `kind` applied to `subtotal`.
///
/// The result is never negative and never exceeds `subtotal`, so the
/// payable amount cannot go below zero.
///
/// Percentage discounts are computed in exact decimal arithmetic and
/// rounded to whole minor units exactly once, at the end, with
/// round-half-up. Intermediate values are never rounded.
///
/// Pure: no clock reads, no randomness, no I/O.
pub fn calculate(kind: &DiscountKind, subtotal: Money) -> Money {
    match kind {
        DiscountKind::Percentage { percent, cap } => {
            let raw = Decimal::from(subtotal.cents()) * *percent / Decimal::ONE_HUNDRED;
            let capped = match cap {
                Some(cap) => raw.min(Decimal::from(cap.cents())),
                None => raw,
            };
            let clamped = capped.min(Decimal::from(subtotal.cents()));
            let rounded =
                clamped.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            // The clamp bounds the value by an i64, so the conversion
            // cannot fail; the fallback preserves the bound anyway.
            Money::from_cents(rounded.to_i64().unwrap_or(subtotal.cents()))
        }
        DiscountKind::Fixed { amount } => *amount.min(&subtotal),
    }
}
