//! ApplyCodeHandler - Command handler for applying a discount code to an
//! order.
//!
//! This is the redemption coordinator: it normalizes the code, fails
//! fast with a specific reason against the last-known snapshot, and then
//! hands the actual reservation to the usage ledger, whose result it
//! returns verbatim. Ineligibility is a terminal business decision and
//! is never retried here; CAS conflicts are retried inside the ledger.

use std::sync::Arc;

use crate::application::{RedemptionError, RedemptionResult, UsageLedger};
use crate::domain::discount::{evaluate, EligibilityVerdict, OrderContext, RuleCode};
use crate::ports::RuleStore;

/// Command to apply a discount code to a pending order.
#[derive(Debug, Clone)]
pub struct ApplyCodeCommand {
    /// The code as typed by the user; normalized before lookup.
    pub code: String,
    /// The order the code is being applied to.
    pub order: OrderContext,
}

/// Handler for applying discount codes.
pub struct ApplyCodeHandler {
    store: Arc<dyn RuleStore>,
    ledger: Arc<UsageLedger>,
}

impl ApplyCodeHandler {
    pub fn new(store: Arc<dyn RuleStore>, ledger: Arc<UsageLedger>) -> Self {
        Self { store, ledger }
    }

    /// Applies the code to the order, recording the redemption.
    ///
    /// # Errors
    ///
    /// - `MalformedCode` if the input is not a well-formed code
    /// - `CodeNotFound` if no rule carries the code
    /// - `Ineligible` with the first failing check's reason
    /// - `TransientConflict` if the ledger's retry budget is exhausted;
    ///   the caller may retry the whole call
    /// - `Storage` on persistence failure
    pub async fn handle(
        &self,
        cmd: ApplyCodeCommand,
    ) -> Result<RedemptionResult, RedemptionError> {
        // 1. Normalize the code (lookups are case-insensitive)
        let code = RuleCode::try_new(&cmd.code).map_err(|reason| {
            RedemptionError::MalformedCode {
                code: cmd.code.clone(),
                reason,
            }
        })?;

        // 2. Fail fast against the last-known snapshot. This buys the
        //    caller a specific reason without a write attempt; the ledger
        //    re-checks against the freshest state before committing.
        let Some(stored) = self.store.find_by_code(&code).await? else {
            return Err(RedemptionError::CodeNotFound {
                code: code.to_string(),
            });
        };
        if let EligibilityVerdict::Ineligible(reason) =
            evaluate(&stored.rule, &cmd.order, &stored.rule.usage)
        {
            return Err(RedemptionError::Ineligible { code, reason });
        }

        // 3. Reserve atomically; the ledger's result is returned verbatim.
        self.ledger.reserve(&code, &cmd.order).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRuleStore;
    use crate::domain::discount::{DiscountKind, DiscountRule, IneligibilityReason};
    use crate::domain::foundation::{Money, Timestamp, UserId};

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs)
    }

    fn rule(code: &str) -> DiscountRule {
        DiscountRule::new(
            RuleCode::try_new(code).unwrap(),
            DiscountKind::fixed(Money::from_cents(500)),
            ts(0),
        )
    }

    fn order() -> OrderContext {
        OrderContext::new(
            UserId::new("user-1").unwrap(),
            Money::from_cents(10_000),
            ts(100),
        )
    }

    async fn handler_with(rules: Vec<DiscountRule>) -> ApplyCodeHandler {
        let store = Arc::new(InMemoryRuleStore::new());
        for rule in rules {
            store.insert(rule).await.unwrap();
        }
        let ledger = Arc::new(UsageLedger::new(store.clone()));
        ApplyCodeHandler::new(store, ledger)
    }

    #[tokio::test]
    async fn applies_a_valid_code() {
        let handler = handler_with(vec![rule("FIVEOFF")]).await;

        let result = handler
            .handle(ApplyCodeCommand {
                code: "FIVEOFF".to_string(),
                order: order(),
            })
            .await
            .unwrap();

        assert_eq!(result.discount.cents(), 500);
        assert_eq!(result.code.as_str(), "FIVEOFF");
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let handler = handler_with(vec![rule("FIVEOFF")]).await;

        let result = handler
            .handle(ApplyCodeCommand {
                code: "fiveoff".to_string(),
                order: order(),
            })
            .await
            .unwrap();

        assert_eq!(result.code.as_str(), "FIVEOFF");
    }

    #[tokio::test]
    async fn unknown_code_is_code_not_found() {
        let handler = handler_with(vec![]).await;

        let err = handler
            .handle(ApplyCodeCommand {
                code: "NOPE99".to_string(),
                order: order(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RedemptionError::CodeNotFound { code } if code == "NOPE99"));
    }

    #[tokio::test]
    async fn malformed_code_is_rejected_before_lookup() {
        let handler = handler_with(vec![]).await;

        let err = handler
            .handle(ApplyCodeCommand {
                code: "x".to_string(),
                order: order(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RedemptionError::MalformedCode { .. }));
    }

    #[tokio::test]
    async fn ineligible_code_reports_the_specific_reason() {
        let handler = handler_with(vec![rule("FIVEOFF").deactivated()]).await;

        let err = handler
            .handle(ApplyCodeCommand {
                code: "FIVEOFF".to_string(),
                order: order(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.ineligibility(), Some(&IneligibilityReason::Inactive));
    }

    #[tokio::test]
    async fn second_application_by_same_user_hits_the_per_user_limit() {
        let handler = handler_with(vec![rule("FIVEOFF")]).await;

        handler
            .handle(ApplyCodeCommand {
                code: "FIVEOFF".to_string(),
                order: order(),
            })
            .await
            .unwrap();

        let err = handler
            .handle(ApplyCodeCommand {
                code: "FIVEOFF".to_string(),
                order: order(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.ineligibility(),
            Some(IneligibilityReason::UserLimitReached { limit: 1 })
        ));
    }
}
