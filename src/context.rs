//! Collaborators the progression engine runs against.
//!
//! A [`Context`] bundles persistent storage, the inventory, the event bus,
//! the clock and the random source. It is built once by the host and passed
//! by reference to every operation that touches external state.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{LevelUpError, Result};
use crate::events::{EventBus, LevelUpEvent};
use crate::inventory::{Inventory, MemoryInventory};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, Progress};

/// Storage, inventory, notifications, time and randomness.
pub struct Context {
    progress: Progress,
    inventory: Arc<dyn Inventory>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("progress", &self.progress)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Create a context over the given store and inventory.
    ///
    /// Uses the default key prefix, a fresh event bus, the system clock and
    /// an OS-seeded random source.
    pub fn new(store: Arc<dyn KeyValueStore>, inventory: Arc<dyn Inventory>) -> Self {
        Self {
            progress: Progress::new(store),
            inventory,
            bus: EventBus::new(),
            clock: Arc::new(SystemClock),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// In-memory store and inventory sharing one event bus.
    ///
    /// The inventory knows the given item ids, all at zero.
    pub fn in_memory<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bus = EventBus::new();
        let inventory = MemoryInventory::with_items(items).with_bus(bus.clone());
        Self::new(Arc::new(MemoryStore::new()), Arc::new(inventory)).with_bus(bus)
    }

    /// Build a context from configuration, using the host's inventory.
    pub fn from_config(config: &Config, inventory: Arc<dyn Inventory>) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn KeyValueStore> = match config.storage.backend.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            "file" => {
                let path = config.storage.progress_path().ok_or_else(|| {
                    LevelUpError::config("Could not determine progress file location")
                })?;
                Arc::new(FileStore::open(path)?)
            }
            other => {
                return Err(LevelUpError::config(format!(
                    "unsupported storage backend '{}'",
                    other
                )))
            }
        };

        let mut context =
            Self::new(store, inventory).with_key_prefix(config.storage.key_prefix.clone());
        if let Some(seed) = config.rewards.seed {
            context = context.with_seed(seed);
        }
        Ok(context)
    }

    /// Use a different key prefix for persisted progress.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.progress = Progress::with_prefix(Arc::clone(self.progress.store()), prefix);
        self
    }

    /// Publish on the given bus.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Use the given clock for level timing.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the random source so random rewards are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Typed persisted progress.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// The inventory collaborator.
    pub fn inventory(&self) -> &dyn Inventory {
        self.inventory.as_ref()
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Publish a notification.
    pub fn publish(&self, event: LevelUpEvent) {
        self.bus.publish(event);
    }

    /// Current instant from the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` with exclusive access to the random source.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap();
        f(&mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rand::Rng;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_shares_bus_with_inventory() {
        let context = Context::in_memory(["gem"]);
        let recorder = context.bus().record();

        context.inventory().give("gem", 2).unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_from_config_memory() {
        let mut config = Config::default();
        config.storage.backend = "memory".to_string();
        config.storage.key_prefix = "game.".to_string();

        let context = Context::from_config(&config, Arc::new(MemoryInventory::new())).unwrap();
        assert_eq!(context.progress().prefix(), "game.");
    }

    #[test]
    fn test_from_config_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.path = Some(dir.path().join("progress.json"));

        let context = Context::from_config(&config, Arc::new(MemoryInventory::new())).unwrap();
        context.progress().set_gate_open("g1", true).unwrap();
        assert!(dir.path().join("progress.json").exists());
    }

    #[test]
    fn test_from_config_rejects_invalid_backend() {
        let mut config = Config::default();
        config.storage.backend = "redis".to_string();
        assert!(Context::from_config(&config, Arc::new(MemoryInventory::new())).is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = Context::in_memory(Vec::<String>::new()).with_seed(7);
        let b = Context::in_memory(Vec::<String>::new()).with_seed(7);
        let xs: Vec<u32> = (0..5).map(|_| a.with_rng(|r| r.random())).collect();
        let ys: Vec<u32> = (0..5).map(|_| b.with_rng(|r| r.random())).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_with_clock() {
        let clock = Arc::new(ManualClock::default());
        let context = Context::in_memory(Vec::<String>::new()).with_clock(clock.clone());
        let before = context.now();
        clock.advance_millis(250);
        assert_eq!((context.now() - before).num_milliseconds(), 250);
    }
}
