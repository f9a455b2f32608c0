//! Order context - the caller-supplied view of a pending order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ItemId, Money, Timestamp, UserId};

/// Everything the engine needs to know about the order a code is being
/// applied to.
///
/// Assembled by the caller from its identity and order-context providers.
/// `now` is injected rather than read from a system clock so evaluation
/// stays deterministic and testable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContext {
    /// Stable, opaque identifier of the ordering user.
    pub user_id: UserId,
    /// Order subtotal before any discount.
    pub subtotal: Money,
    /// Categories of the items in the order.
    pub item_categories: HashSet<String>,
    /// Identifiers of the items in the order.
    pub item_ids: HashSet<ItemId>,
    /// Whether this is the user's first completed order.
    pub is_first_order: bool,
    /// The instant the evaluation is judged against.
    pub now: Timestamp,
}

impl OrderContext {
    /// Creates an order context with no items and `is_first_order` unset.
    pub fn new(user_id: UserId, subtotal: Money, now: Timestamp) -> Self {
        Self {
            user_id,
            subtotal,
            item_categories: HashSet::new(),
            item_ids: HashSet::new(),
            is_first_order: false,
            now,
        }
    }

    /// Sets the order's item categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the order's item identifiers.
    pub fn with_items<I>(mut self, item_ids: I) -> Self
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.item_ids = item_ids.into_iter().collect();
        self
    }

    /// Marks this as the user's first order.
    pub fn first_order(mut self, is_first: bool) -> Self {
        self.is_first_order = is_first;
        self
    }
}
