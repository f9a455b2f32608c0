//! ReleaseCodeHandler - Command handler for returning a redemption after
//! an order is cancelled.
//!
//! The counterpart of applying a code: the cancellation flow calls this
//! so a cancelled order does not permanently strand usage counts.

use std::sync::Arc;

use crate::application::{RedemptionError, UsageLedger};
use crate::domain::discount::RuleCode;
use crate::domain::foundation::UserId;

/// Command to release one previously recorded redemption.
#[derive(Debug, Clone)]
pub struct ReleaseCodeCommand {
    /// The code whose redemption is being returned.
    pub code: String,
    /// The user whose redemption is being returned.
    pub user_id: UserId,
}

/// Handler for releasing redemptions on cancellation.
pub struct ReleaseCodeHandler {
    ledger: Arc<UsageLedger>,
}

impl ReleaseCodeHandler {
    pub fn new(ledger: Arc<UsageLedger>) -> Self {
        Self { ledger }
    }

    /// Releases one redemption of the code by the user.
    ///
    /// Succeeds (as a no-op) when the user has no recorded usage, so the
    /// cancellation flow can call it unconditionally.
    ///
    /// # Errors
    ///
    /// - `MalformedCode` if the input is not a well-formed code
    /// - `CodeNotFound` if no rule carries the code
    /// - `TransientConflict` if the ledger's retry budget is exhausted
    /// - `Storage` on persistence failure
    pub async fn handle(&self, cmd: ReleaseCodeCommand) -> Result<(), RedemptionError> {
        let code = RuleCode::try_new(&cmd.code).map_err(|reason| {
            RedemptionError::MalformedCode {
                code: cmd.code.clone(),
                reason,
            }
        })?;

        self.ledger.release(&code, &cmd.user_id).await
    }
}
