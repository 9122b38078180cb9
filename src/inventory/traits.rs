//! Inventory trait.

use std::sync::Arc;

use crate::error::Result;

/// Balances of virtual items and currencies.
///
/// Every method fails with `LevelUpError::ItemNotFound` for ids the
/// inventory does not know.
pub trait Inventory: Send + Sync {
    /// Current balance of an item.
    fn balance(&self, item_id: &str) -> Result<i64>;

    /// Add `amount` units, returning the new balance.
    fn give(&self, item_id: &str, amount: i64) -> Result<i64>;

    /// Remove `amount` units, returning the new balance.
    fn take(&self, item_id: &str, amount: i64) -> Result<i64>;
}

impl<T: Inventory + ?Sized> Inventory for Arc<T> {
    fn balance(&self, item_id: &str) -> Result<i64> {
        (**self).balance(item_id)
    }

    fn give(&self, item_id: &str, amount: i64) -> Result<i64> {
        (**self).give(item_id, amount)
    }

    fn take(&self, item_id: &str, amount: i64) -> Result<i64> {
        (**self).take(item_id, amount)
    }
}
