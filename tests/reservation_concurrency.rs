//! Integration tests for the concurrent reservation contract.
//!
//! These tests verify the end-to-end flow:
//! 1. ApplyCodeHandler normalizes and fast-path checks the code
//! 2. UsageLedger re-checks eligibility and commits via compare-and-set
//! 3. Usage limits hold exactly under concurrent load
//! 4. Release restores counters so allowance can be consumed again
//!
//! Uses the in-memory rule store so the CAS race is real (many tasks, one
//! versioned entry) without external dependencies.

use std::sync::Arc;

use rust_decimal::Decimal;

use discount_engine::adapters::InMemoryRuleStore;
use discount_engine::application::handlers::{
    ApplyCodeCommand, ApplyCodeHandler, ReleaseCodeCommand, ReleaseCodeHandler,
};
use discount_engine::application::{RedemptionError, UsageLedger};
use discount_engine::domain::discount::{
    DiscountKind, DiscountRule, IneligibilityReason, OrderContext, RuleCode,
};
use discount_engine::domain::foundation::{Money, Timestamp, UserId};
use discount_engine::ports::RuleStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Installs a test subscriber once so `RUST_LOG=debug` shows the ledger's
/// conflict/retry events when a test fails.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn ts(secs: i64) -> Timestamp {
    Timestamp::from_unix_secs(secs)
}

fn ten_percent(code: &str) -> DiscountRule {
    DiscountRule::new(
        RuleCode::try_new(code).unwrap(),
        DiscountKind::percentage(Decimal::from(10), None).unwrap(),
        ts(0),
    )
}

fn order_for(user: &str) -> OrderContext {
    OrderContext::new(
        UserId::new(user).unwrap(),
        Money::from_cents(10_000),
        ts(100),
    )
}

async fn engine_with(
    rule: DiscountRule,
    reserve_attempts: u32,
) -> (Arc<InMemoryRuleStore>, Arc<ApplyCodeHandler>) {
    let store = Arc::new(InMemoryRuleStore::new());
    store.insert(rule).await.unwrap();
    let ledger = Arc::new(
        UsageLedger::new(store.clone()).with_reserve_attempts(reserve_attempts),
    );
    (store.clone(), Arc::new(ApplyCodeHandler::new(store, ledger)))
}

/// Fires one apply-code task per user name and collects the results.
async fn apply_concurrently(
    handler: Arc<ApplyCodeHandler>,
    code: &str,
    users: Vec<String>,
) -> Vec<Result<i64, RedemptionError>> {
    let tasks: Vec<_> = users
        .into_iter()
        .map(|user| {
            let handler = handler.clone();
            let code = code.to_string();
            tokio::spawn(async move {
                handler
                    .handle(ApplyCodeCommand {
                        code,
                        order: order_for(&user),
                    })
                    .await
                    .map(|r| r.discount.cents())
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in futures::future::join_all(tasks).await {
        results.push(task.expect("task panicked"));
    }
    results
}

// =============================================================================
// Global Limit Under Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn global_limit_admits_exactly_k_of_n_concurrent_reservations() {
    init_tracing();
    const LIMIT: u32 = 5;
    const CALLERS: usize = 32;

    // A caller can lose the CAS at most once per committed reservation,
    // so a budget above the global limit rules out spurious transient
    // failures and every loser gets the real business reason.
    let (store, handler) =
        engine_with(ten_percent("LASTFIVE").with_global_limit(LIMIT), LIMIT + 5).await;

    let users: Vec<String> = (0..CALLERS).map(|i| format!("user-{}", i)).collect();
    let results = apply_concurrently(handler, "LASTFIVE", users).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, LIMIT as usize, "exactly the cap may succeed");

    for result in results.iter().filter(|r| r.is_err()) {
        match result {
            Err(RedemptionError::Ineligible {
                reason: IneligibilityReason::GlobalLimitReached { limit },
                ..
            }) => assert_eq!(*limit, LIMIT),
            other => panic!("expected GlobalLimitReached, got {:?}", other.as_ref().err()),
        }
    }

    let stored = store
        .find_by_code(&RuleCode::try_new("LASTFIVE").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rule.usage.global_count(), LIMIT);
    assert_eq!(stored.rule.usage.distinct_users(), LIMIT as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn per_user_limit_admits_one_of_many_concurrent_attempts_by_same_user() {
    init_tracing();
    const CALLERS: usize = 10;

    let (store, handler) = engine_with(ten_percent("ONEEACH"), 8).await;

    let users: Vec<String> = (0..CALLERS).map(|_| "greedy-user".to_string()).collect();
    let results = apply_concurrently(handler, "ONEEACH", users).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "one user gets one redemption");

    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(RedemptionError::Ineligible {
                reason: IneligibilityReason::UserLimitReached { limit: 1 },
                ..
            })
        ));
    }

    let stored = store
        .find_by_code(&RuleCode::try_new("ONEEACH").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rule.usage.global_count(), 1);
    assert_eq!(
        stored
            .rule
            .usage
            .count_for(&UserId::new("greedy-user").unwrap()),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn reservations_for_different_codes_do_not_contend() {
    init_tracing();
    const CALLERS_PER_CODE: usize = 8;

    let store = Arc::new(InMemoryRuleStore::new());
    store
        .insert(ten_percent("CODE-A").with_per_user_limit(10))
        .await
        .unwrap();
    store
        .insert(ten_percent("CODE-B").with_per_user_limit(10))
        .await
        .unwrap();
    let ledger = Arc::new(UsageLedger::new(store.clone()).with_reserve_attempts(20));
    let handler = Arc::new(ApplyCodeHandler::new(store.clone(), ledger));

    let mut tasks = Vec::new();
    for code in ["CODE-A", "CODE-B"] {
        for i in 0..CALLERS_PER_CODE {
            let handler = handler.clone();
            let code = code.to_string();
            let user = format!("user-{}-{}", code, i);
            tasks.push(tokio::spawn(async move {
                handler
                    .handle(ApplyCodeCommand {
                        code,
                        order: order_for(&user),
                    })
                    .await
            }));
        }
    }

    let results = futures::future::join_all(tasks).await;
    let successes = results
        .iter()
        .filter(|t| t.as_ref().expect("task panicked").is_ok())
        .count();
    assert_eq!(successes, 2 * CALLERS_PER_CODE, "no cross-code interference");

    for code in ["CODE-A", "CODE-B"] {
        let stored = store
            .find_by_code(&RuleCode::try_new(code).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rule.usage.global_count(), CALLERS_PER_CODE as u32);
    }
}

// =============================================================================
// Release Round-Trips
// =============================================================================

#[tokio::test]
async fn release_frees_allowance_for_the_next_caller() {
    let (store, handler) = engine_with(
        ten_percent("SINGLE")
            .with_global_limit(1)
            .with_per_user_limit(1),
        5,
    )
    .await;
    let ledger = Arc::new(UsageLedger::new(store.clone()));
    let release = ReleaseCodeHandler::new(ledger);

    handler
        .handle(ApplyCodeCommand {
            code: "SINGLE".to_string(),
            order: order_for("first-user"),
        })
        .await
        .unwrap();

    // The code is spent.
    let err = handler
        .handle(ApplyCodeCommand {
            code: "SINGLE".to_string(),
            order: order_for("second-user"),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.ineligibility(),
        Some(IneligibilityReason::GlobalLimitReached { limit: 1 })
    ));

    // Cancellation returns the allowance.
    release
        .handle(ReleaseCodeCommand {
            code: "SINGLE".to_string(),
            user_id: UserId::new("first-user").unwrap(),
        })
        .await
        .unwrap();

    let result = handler
        .handle(ApplyCodeCommand {
            code: "SINGLE".to_string(),
            order: order_for("second-user"),
        })
        .await
        .unwrap();
    assert_eq!(result.discount.cents(), 1_000);
}

#[tokio::test]
async fn redundant_releases_never_push_counters_negative() {
    let (store, handler) = engine_with(ten_percent("GENEROUS"), 5).await;
    let ledger = Arc::new(UsageLedger::new(store.clone()));
    let release = ReleaseCodeHandler::new(ledger);

    handler
        .handle(ApplyCodeCommand {
            code: "GENEROUS".to_string(),
            order: order_for("user-1"),
        })
        .await
        .unwrap();

    for _ in 0..3 {
        release
            .handle(ReleaseCodeCommand {
                code: "GENEROUS".to_string(),
                user_id: UserId::new("user-1").unwrap(),
            })
            .await
            .unwrap();
    }

    let stored = store
        .find_by_code(&RuleCode::try_new("GENEROUS").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rule.usage.global_count(), 0);
}

// =============================================================================
// End-to-End Discount Values
// =============================================================================

#[tokio::test]
async fn applied_discount_reflects_the_rule_terms() {
    let rule = DiscountRule::new(
        RuleCode::try_new("HALFCAP").unwrap(),
        DiscountKind::percentage(Decimal::from(50), Some(Money::from_cents(100))).unwrap(),
        ts(0),
    );
    let (_store, handler) = engine_with(rule, 3).await;

    let result = handler
        .handle(ApplyCodeCommand {
            code: "halfcap".to_string(),
            order: order_for("user-1"),
        })
        .await
        .unwrap();

    // 50% of 100.00 is 50.00, but the cap holds it to 1.00.
    assert_eq!(result.discount.cents(), 100);
    assert_eq!(result.applied_at, ts(100));
}
