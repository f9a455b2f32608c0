//! Usage counters for a discount rule.
//!
//! Tracks how many times a rule has been redeemed overall and per user.
//! These counters are the only mutable part of a rule, and they are only
//! ever mutated through the usage ledger's atomic commit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// One user's redemption record for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    /// How many times this user has redeemed the rule.
    pub count: u32,
    /// When this user last redeemed the rule.
    pub last_used_at: Timestamp,
}

/// Redemption counters for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RuleUsage {
    global_count: u32,
    per_user: HashMap<UserId, UserUsage>,
}

impl RuleUsage {
    /// Creates empty usage counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successful redemptions across all users.
    pub fn global_count(&self) -> u32 {
        self.global_count
    }

    /// Redemption count for one user; zero if the user never redeemed.
    pub fn count_for(&self, user_id: &UserId) -> u32 {
        self.per_user.get(user_id).map_or(0, |u| u.count)
    }

    /// This user's usage record, if any.
    pub fn usage_for(&self, user_id: &UserId) -> Option<&UserUsage> {
        self.per_user.get(user_id)
    }

    /// Number of distinct users that have redeemed the rule.
    pub fn distinct_users(&self) -> usize {
        self.per_user.len()
    }

    /// Records one redemption: increments the global counter and the
    /// user's counter, creating the user entry if absent.
    pub fn record(&mut self, user_id: UserId, now: Timestamp) {
        self.global_count += 1;
        let entry = self.per_user.entry(user_id).or_insert(UserUsage {
            count: 0,
            last_used_at: now,
        });
        entry.count += 1;
        entry.last_used_at = now;
    }

    /// Releases one redemption for the user, decrementing both counters
    /// with a floor of zero.
    ///
    /// Returns `false` (and changes nothing) when the user has no
    /// recorded usage; callers treat that as a successful no-op.
    pub fn release(&mut self, user_id: &UserId) -> bool {
        let Some(entry) = self.per_user.get_mut(user_id) else {
            return false;
        };
        entry.count = entry.count.saturating_sub(1);
        if entry.count == 0 {
            self.per_user.remove(user_id);
        }
        self.global_count = self.global_count.saturating_sub(1);
        true
    }
}
