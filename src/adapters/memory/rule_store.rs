//! In-memory rule store for testing and single-process deployments.
//!
//! Keeps rules in a HashMap guarded by an async RwLock. The version
//! check and the usage swap happen under one write-lock acquisition, so
//! the compare-and-set contract holds without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::discount::{DiscountRule, RuleCode, RuleUsage};
use crate::domain::foundation::Timestamp;
use crate::ports::{CommitOutcome, RuleStore, StoreError, StoredRule};

/// In-memory implementation of the [`RuleStore`] port.
///
/// Not suitable for multi-process deployments; the production
/// counterpart is [`PostgresRuleStore`](crate::adapters::PostgresRuleStore).
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<RuleCode, Entry>>,
}

#[derive(Debug, Clone)]
struct Entry {
    rule: DiscountRule,
    version: u64,
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rules currently stored.
    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    /// Returns true if no rules are stored.
    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_by_code(&self, code: &RuleCode) -> Result<Option<StoredRule>, StoreError> {
        let rules = self.rules.read().await;
        Ok(rules.get(code).map(|entry| StoredRule {
            rule: entry.rule.clone(),
            version: entry.version,
        }))
    }

    async fn commit_usage(
        &self,
        code: &RuleCode,
        expected_version: u64,
        usage: RuleUsage,
    ) -> Result<CommitOutcome, StoreError> {
        let mut rules = self.rules.write().await;

        // A concurrently deleted rule reads as a conflict: the caller
        // re-reads and discovers the deletion itself.
        let Some(entry) = rules.get_mut(code) else {
            return Ok(CommitOutcome::VersionConflict);
        };
        if entry.version != expected_version {
            return Ok(CommitOutcome::VersionConflict);
        }

        entry.rule.usage = usage;
        entry.rule.updated_at = Timestamp::now();
        entry.version += 1;
        Ok(CommitOutcome::Committed)
    }

    async fn insert(&self, rule: DiscountRule) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        if rules.contains_key(&rule.code) {
            return Err(StoreError::DuplicateCode(rule.code.to_string()));
        }
        rules.insert(rule.code.clone(), Entry { rule, version: 0 });
        Ok(())
    }

    async fn delete(&self, code: &RuleCode) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        match rules.get(code) {
            None => Ok(()),
            Some(entry) if entry.rule.usage.global_count() > 0 => {
                Err(StoreError::RuleInUse(code.to_string()))
            }
            Some(_) => {
                rules.remove(code);
                Ok(())
            }
        }
    }
}
