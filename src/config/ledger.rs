//! Usage ledger configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Usage ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How many compare-and-set attempts a reservation makes before
    /// surfacing a transient conflict to the caller.
    #[serde(default = "default_reserve_attempts")]
    pub reserve_attempts: u32,
}

impl LedgerConfig {
    /// Validate ledger configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reserve_attempts == 0 {
            return Err(ValidationError::InvalidRetryBudget);
        }
        if self.reserve_attempts > 25 {
            return Err(ValidationError::RetryBudgetTooLarge);
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reserve_attempts: default_reserve_attempts(),
        }
    }
}

fn default_reserve_attempts() -> u32 {
    3
}
