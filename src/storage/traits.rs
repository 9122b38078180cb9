//! Storage traits for LevelUp.
//!
//! This module defines the `KeyValueStore` trait for progress persistence.

use std::sync::Arc;

use crate::error::Result;

/// Trait for key-value storage backends.
///
/// All reads and writes are point lookups. No operation spans multiple keys,
/// so a crash between two writes can leave related keys inconsistent.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    fn delete(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Blanket implementation of KeyValueStore for Arc-wrapped stores.
///
/// This allows sharing one store between a `Context` and the test or host
/// code inspecting it.
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix)
    }
}
