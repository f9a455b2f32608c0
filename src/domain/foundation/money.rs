//! Money value object in minor currency units.
//!
//! All monetary values are stored as i64 minor units (cents), never as
//! floats. Amounts are non-negative by construction.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A non-negative amount of money in minor currency units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a Money from minor units, returning error if negative.
    pub fn try_from_cents(cents: i64) -> Result<Self, ValidationError> {
        if cents < 0 {
            return Err(ValidationError::out_of_range(
                "money_cents",
                0,
                i64::MAX,
                cents,
            ));
        }
        Ok(Self(cents))
    }

    /// Creates a Money from minor units known to be non-negative.
    ///
    /// Negative input is clamped to zero.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents.max(0))
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at the representable maximum.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts an amount, flooring at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self((self.0 - other.0).max(0))
    }

    /// Returns the smaller of two amounts.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
