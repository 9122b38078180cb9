//! Virtual-economy collaborator.
//!
//! The engine reads balances for balance gates and moves items for
//! virtual-item rewards and scores. Hosts plug in their own store by
//! implementing [`Inventory`]; [`MemoryInventory`] is the reference
//! implementation.

pub mod memory;
pub mod traits;

pub use memory::MemoryInventory;
pub use traits::Inventory;
