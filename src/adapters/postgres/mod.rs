//! PostgreSQL adapter implementations.

mod rule_store;

pub use rule_store::PostgresRuleStore;
