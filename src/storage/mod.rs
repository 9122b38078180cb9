//! Persistent progress storage for LevelUp.
//!
//! This module provides the key-value collaborator the engine persists its
//! monotonic flags and statistics into, with file-based and in-memory
//! backends, plus the typed key schema used on top of them.

pub mod file;
pub mod memory;
pub mod progress;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use progress::{Progress, DEFAULT_KEY_PREFIX};
pub use traits::KeyValueStore;
