//! Ports - Contracts between the engine and its collaborators.

mod rule_store;

pub use rule_store::{CommitOutcome, RuleStore, StoreError, StoredRule};
