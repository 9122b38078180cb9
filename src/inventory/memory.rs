//! In-memory inventory.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{LevelUpError, Result};
use crate::events::{EventBus, LevelUpEvent};
use crate::inventory::Inventory;

/// In-memory inventory over a fixed catalog of item ids.
///
/// Balances never go below zero: taking more than the balance empties it.
/// Every change is published as `InventoryBalanceChanged` when a bus is
/// attached.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    balances: RwLock<HashMap<String, i64>>,
    bus: Option<EventBus>,
}

impl MemoryInventory {
    /// Create an inventory with no items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inventory knowing the given item ids, all at zero.
    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inventory = Self::new();
        for item in items {
            inventory.register(item);
        }
        inventory
    }

    /// Publish balance changes on `bus`.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Add an item id to the catalog. Existing balances are kept.
    pub fn register(&self, item_id: impl Into<String>) {
        self.balances
            .write()
            .unwrap()
            .entry(item_id.into())
            .or_insert(0);
    }

    fn change(&self, item_id: &str, delta: i64) -> Result<i64> {
        let (applied, balance) = {
            let mut balances = self.balances.write().unwrap();
            let balance = balances
                .get_mut(item_id)
                .ok_or_else(|| LevelUpError::item_not_found(item_id))?;
            let next = balance
                .checked_add(delta)
                .ok_or_else(|| {
                    LevelUpError::inventory(format!("balance of {} would overflow", item_id))
                })?
                .max(0);
            let applied = next - *balance;
            *balance = next;
            (applied, next)
        };

        if let Some(bus) = &self.bus {
            bus.publish(LevelUpEvent::InventoryBalanceChanged {
                item_id: item_id.to_string(),
                amount_added: applied,
                balance,
            });
        }
        Ok(balance)
    }
}

fn check_amount(amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(LevelUpError::inventory(format!(
            "amount must not be negative, got {}",
            amount
        )));
    }
    Ok(())
}

impl Inventory for MemoryInventory {
    fn balance(&self, item_id: &str) -> Result<i64> {
        self.balances
            .read()
            .unwrap()
            .get(item_id)
            .copied()
            .ok_or_else(|| LevelUpError::item_not_found(item_id))
    }

    fn give(&self, item_id: &str, amount: i64) -> Result<i64> {
        check_amount(amount)?;
        self.change(item_id, amount)
    }

    fn take(&self, item_id: &str, amount: i64) -> Result<i64> {
        check_amount(amount)?;
        self.change(item_id, -amount)
    }
}
