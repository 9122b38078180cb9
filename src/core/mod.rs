//! Core progression types.
//!
//! Worlds and levels form a tree. Each world owns its scores, challenges and
//! an optional gate list; levels add a timed play session. All persisted
//! state is read and written through a [`Context`](crate::context::Context).

pub mod challenge;
pub mod gate;
pub mod level;
pub mod reward;
pub mod score;
pub mod world;

pub use challenge::Challenge;
pub use gate::{BalanceGate, Gate, GatesList, ListOperator, Openable, RecordGate, WorldCompletionGate};
pub use level::{Level, LevelState};
pub use reward::{Reward, RewardKind};
pub use score::{Range, Score, ScoreKind, ScoreLookup};
pub use world::{World, WorldNode};
