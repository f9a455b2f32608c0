//! PostgreSQL implementation of the RuleStore port.
//!
//! The compare-and-set contract maps to a conditional UPDATE on the
//! rule's version column: `... WHERE code = $1 AND version = $2`. Zero
//! affected rows means another writer (or a delete) got there first.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE discount_rules (
//!     id                   UUID PRIMARY KEY,
//!     code                 TEXT NOT NULL UNIQUE,
//!     kind                 JSONB NOT NULL,
//!     scope                JSONB NOT NULL,
//!     min_order_cents      BIGINT NOT NULL,
//!     valid_from           TIMESTAMPTZ NOT NULL,
//!     valid_to             TIMESTAMPTZ,
//!     global_usage_limit   INTEGER,
//!     per_user_usage_limit INTEGER NOT NULL,
//!     first_order_only     BOOLEAN NOT NULL,
//!     active               BOOLEAN NOT NULL,
//!     usage                JSONB NOT NULL,
//!     version              BIGINT NOT NULL DEFAULT 0,
//!     created_at           TIMESTAMPTZ NOT NULL,
//!     updated_at           TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::discount::{DiscountKind, DiscountRule, RuleCode, RuleScope, RuleUsage};
use crate::domain::foundation::{Money, RuleId, Timestamp};
use crate::ports::{CommitOutcome, RuleStore, StoreError, StoredRule};

/// PostgreSQL implementation of the [`RuleStore`] port.
///
/// Uses sqlx with connection pooling; the pool is built and owned by the
/// embedding application and injected here.
pub struct PostgresRuleStore {
    pool: PgPool,
}

impl PostgresRuleStore {
    /// Creates a new PostgresRuleStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a discount rule.
#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    code: String,
    kind: serde_json::Value,
    scope: serde_json::Value,
    min_order_cents: i64,
    valid_from: DateTime<Utc>,
    valid_to: Option<DateTime<Utc>>,
    global_usage_limit: Option<i32>,
    per_user_usage_limit: i32,
    first_order_only: bool,
    active: bool,
    usage: serde_json::Value,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for StoredRule {
    type Error = StoreError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let code = RuleCode::try_new(&row.code)
            .map_err(|e| StoreError::Corrupted(format!("invalid code '{}': {}", row.code, e)))?;
        let kind: DiscountKind = serde_json::from_value(row.kind)
            .map_err(|e| StoreError::Corrupted(format!("invalid kind: {}", e)))?;
        let scope: RuleScope = serde_json::from_value(row.scope)
            .map_err(|e| StoreError::Corrupted(format!("invalid scope: {}", e)))?;
        let usage: RuleUsage = serde_json::from_value(row.usage)
            .map_err(|e| StoreError::Corrupted(format!("invalid usage: {}", e)))?;
        let min_order_value = Money::try_from_cents(row.min_order_cents)
            .map_err(|e| StoreError::Corrupted(format!("invalid min_order_cents: {}", e)))?;
        let global_usage_limit = row
            .global_usage_limit
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Corrupted(format!("invalid global_usage_limit: {}", e)))?;
        let per_user_usage_limit = u32::try_from(row.per_user_usage_limit)
            .map_err(|e| StoreError::Corrupted(format!("invalid per_user_usage_limit: {}", e)))?;
        let version = u64::try_from(row.version)
            .map_err(|e| StoreError::Corrupted(format!("invalid version: {}", e)))?;

        Ok(StoredRule {
            rule: DiscountRule {
                id: RuleId::from_uuid(row.id),
                code,
                kind,
                min_order_value,
                valid_from: Timestamp::from_datetime(row.valid_from),
                valid_to: row.valid_to.map(Timestamp::from_datetime),
                global_usage_limit,
                per_user_usage_limit,
                first_order_only: row.first_order_only,
                scope,
                active: row.active,
                usage,
                created_at: Timestamp::from_datetime(row.created_at),
                updated_at: Timestamp::from_datetime(row.updated_at),
            },
            version,
        })
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn encode(value: &impl serde::Serialize, what: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Corrupted(format!("failed to encode {}: {}", what, e)))
}

const SELECT_RULE: &str = r#"
    SELECT id, code, kind, scope, min_order_cents, valid_from, valid_to,
           global_usage_limit, per_user_usage_limit, first_order_only,
           active, usage, version, created_at, updated_at
    FROM discount_rules
    WHERE code = $1
"#;

#[async_trait]
impl RuleStore for PostgresRuleStore {
    async fn find_by_code(&self, code: &RuleCode) -> Result<Option<StoredRule>, StoreError> {
        let row: Option<RuleRow> = sqlx::query_as(SELECT_RULE)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(StoredRule::try_from).transpose()
    }

    async fn commit_usage(
        &self,
        code: &RuleCode,
        expected_version: u64,
        usage: RuleUsage,
    ) -> Result<CommitOutcome, StoreError> {
        let payload = encode(&usage, "usage")?;
        let expected = i64::try_from(expected_version)
            .map_err(|e| StoreError::Corrupted(format!("invalid expected version: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE discount_rules
            SET usage = $3, version = version + 1, updated_at = NOW()
            WHERE code = $1 AND version = $2
            "#,
        )
        .bind(code.as_str())
        .bind(expected)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            // Stale version or concurrently deleted rule; either way the
            // caller re-reads and retries.
            Ok(CommitOutcome::VersionConflict)
        } else {
            Ok(CommitOutcome::Committed)
        }
    }

    async fn insert(&self, rule: DiscountRule) -> Result<(), StoreError> {
        let kind = encode(&rule.kind, "kind")?;
        let scope = encode(&rule.scope, "scope")?;
        let usage = encode(&rule.usage, "usage")?;

        sqlx::query(
            r#"
            INSERT INTO discount_rules (
                id, code, kind, scope, min_order_cents, valid_from, valid_to,
                global_usage_limit, per_user_usage_limit, first_order_only,
                active, usage, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0, $13, $14)
            "#,
        )
        .bind(rule.id.as_uuid())
        .bind(rule.code.as_str())
        .bind(kind)
        .bind(scope)
        .bind(rule.min_order_value.cents())
        .bind(rule.valid_from.as_datetime())
        .bind(rule.valid_to.map(|t| *t.as_datetime()))
        .bind(rule.global_usage_limit.map(|v| v as i32))
        .bind(rule.per_user_usage_limit as i32)
        .bind(rule.first_order_only)
        .bind(rule.active)
        .bind(usage)
        .bind(rule.created_at.as_datetime())
        .bind(rule.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("discount_rules_code_key") {
                    return StoreError::DuplicateCode(rule.code.to_string());
                }
            }
            unavailable(e)
        })?;

        Ok(())
    }

    async fn delete(&self, code: &RuleCode) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM discount_rules
            WHERE code = $1 AND (usage->>'global_count')::bigint = 0
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing deleted: either the code is unknown (a no-op) or the
        // rule has recorded redemptions and must not be deleted.
        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM discount_rules WHERE code = $1")
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;

        match exists {
            Some(_) => Err(StoreError::RuleInUse(code.to_string())),
            None => Ok(()),
        }
    }
}
