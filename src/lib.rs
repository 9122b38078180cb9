//! LevelUp - game progression engine
//!
//! LevelUp models a game as a tree of worlds and levels. Access to a world is
//! guarded by gates (score records, inventory balances, completion of other
//! worlds), levels track timed play sessions and scores, and rewards are
//! granted through challenges. All progress is persisted in a pluggable
//! key-value store.

pub mod cli;
pub mod clock;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod events;
pub mod inventory;
pub mod model;
pub mod registry;
pub mod storage;
pub mod util;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use context::Context;
pub use crate::core::{
    BalanceGate, Challenge, Gate, GatesList, Level, LevelState, ListOperator, Openable, Range,
    RecordGate, Reward, RewardKind, Score, ScoreKind, ScoreLookup, World, WorldCompletionGate,
    WorldNode,
};
pub use error::{LevelUpError, Result};
pub use events::{EventBus, EventRecorder, LevelUpEvent, SubscriptionId};
pub use inventory::{Inventory, MemoryInventory};
pub use model::{Model, ModelSummary};
pub use registry::LevelUp;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Progress};

// CLI commands
pub use cli::{ResetCommand, StatusCommand, ValidateCommand};
