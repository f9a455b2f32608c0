//! Rule scope - which part of an order a rule is restricted to.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ItemId;

use super::OrderContext;

/// The subset of order contents a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleScope {
    /// Applies to every order.
    All,
    /// Applies only when the order contains at least one item in one of
    /// these categories.
    Categories { categories: HashSet<String> },
    /// Applies only when the order contains at least one of these items.
    Products { item_ids: HashSet<ItemId> },
}

impl RuleScope {
    /// Creates a category scope from an iterator of category names.
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categories {
            categories: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a product scope from an iterator of item ids.
    pub fn products<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        Self::Products {
            item_ids: ids.into_iter().collect(),
        }
    }

    /// Returns true if the order falls inside this scope.
    ///
    /// `Categories` and `Products` require a non-empty intersection with
    /// the order's categories/items respectively.
    pub fn matches(&self, order: &OrderContext) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::Categories { categories } => categories
                .iter()
                .any(|c| order.item_categories.contains(c)),
            RuleScope::Products { item_ids } => {
                item_ids.iter().any(|id| order.item_ids.contains(id))
            }
        }
    }
}
