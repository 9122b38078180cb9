//! Typed access to persisted progress.
//!
//! Every persisted field of the progression tree maps to one key under a
//! configurable prefix:
//!
//! ```text
//! {prefix}gates.{gate_id}.open
//! {prefix}worlds.{world_id}.completed
//! {prefix}levels.{world_id}.started | played | fastest | slowest
//! {prefix}scores.{score_id}.latest | record
//! {prefix}rewards.{reward_id}.owned | cursor | chosen
//! {prefix}challenges.{challenge_id}.completed
//! {prefix}model
//! ```
//!
//! Boolean flags are stored as `"true"` and cleared by deleting the key.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::{LevelUpError, Result};
use crate::storage::KeyValueStore;

/// Default prefix for every key the engine writes.
pub const DEFAULT_KEY_PREFIX: &str = "levelup.";

/// Typed view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct Progress {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Create a progress view with the default key prefix.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_prefix(store, DEFAULT_KEY_PREFIX)
    }

    /// Create a progress view with a custom key prefix.
    pub fn with_prefix(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The key prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn key(&self, kind: &str, id: &str, field: &str) -> String {
        format!("{}{}.{}.{}", self.prefix, kind, id, field)
    }

    fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(self.store.get(key)?.as_deref() == Some("true"))
    }

    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        if value {
            self.store.put(key, "true")
        } else {
            self.store.delete(key)
        }
    }

    fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                LevelUpError::deserialize(format!("invalid value '{}' stored at {}", raw, key))
            }),
        }
    }

    fn put_value(&self, key: &str, value: impl ToString) -> Result<()> {
        self.store.put(key, &value.to_string())
    }

    fn increment(&self, key: &str) -> Result<u32> {
        let next = self.get_parsed::<u32>(key)?.unwrap_or(0) + 1;
        self.put_value(key, next)?;
        Ok(next)
    }

    // =========================================================================
    // Gates
    // =========================================================================

    pub fn is_gate_open(&self, gate_id: &str) -> Result<bool> {
        self.get_flag(&self.key("gates", gate_id, "open"))
    }

    pub fn set_gate_open(&self, gate_id: &str, open: bool) -> Result<()> {
        self.set_flag(&self.key("gates", gate_id, "open"), open)
    }

    // =========================================================================
    // Worlds and levels
    // =========================================================================

    pub fn is_world_completed(&self, world_id: &str) -> Result<bool> {
        self.get_flag(&self.key("worlds", world_id, "completed"))
    }

    pub fn set_world_completed(&self, world_id: &str, completed: bool) -> Result<()> {
        self.set_flag(&self.key("worlds", world_id, "completed"), completed)
    }

    pub fn times_started(&self, level_id: &str) -> Result<u32> {
        Ok(self
            .get_parsed(&self.key("levels", level_id, "started"))?
            .unwrap_or(0))
    }

    /// Increment the start counter, returning the new value.
    pub fn inc_times_started(&self, level_id: &str) -> Result<u32> {
        self.increment(&self.key("levels", level_id, "started"))
    }

    pub fn times_played(&self, level_id: &str) -> Result<u32> {
        Ok(self
            .get_parsed(&self.key("levels", level_id, "played"))?
            .unwrap_or(0))
    }

    /// Increment the play counter, returning the new value.
    pub fn inc_times_played(&self, level_id: &str) -> Result<u32> {
        self.increment(&self.key("levels", level_id, "played"))
    }

    /// Fastest recorded play in seconds, `None` before the first play.
    pub fn fastest_duration(&self, level_id: &str) -> Result<Option<f64>> {
        self.get_parsed(&self.key("levels", level_id, "fastest"))
    }

    pub fn set_fastest_duration(&self, level_id: &str, seconds: f64) -> Result<()> {
        self.put_value(&self.key("levels", level_id, "fastest"), seconds)
    }

    /// Slowest recorded play in seconds, `None` before the first play.
    pub fn slowest_duration(&self, level_id: &str) -> Result<Option<f64>> {
        self.get_parsed(&self.key("levels", level_id, "slowest"))
    }

    pub fn set_slowest_duration(&self, level_id: &str, seconds: f64) -> Result<()> {
        self.put_value(&self.key("levels", level_id, "slowest"), seconds)
    }

    // =========================================================================
    // Scores
    // =========================================================================

    pub fn score_latest(&self, score_id: &str) -> Result<Option<f64>> {
        self.get_parsed(&self.key("scores", score_id, "latest"))
    }

    pub fn set_score_latest(&self, score_id: &str, value: f64) -> Result<()> {
        self.put_value(&self.key("scores", score_id, "latest"), value)
    }

    pub fn score_record(&self, score_id: &str) -> Result<Option<f64>> {
        self.get_parsed(&self.key("scores", score_id, "record"))
    }

    pub fn set_score_record(&self, score_id: &str, value: f64) -> Result<()> {
        self.put_value(&self.key("scores", score_id, "record"), value)
    }

    // =========================================================================
    // Rewards and challenges
    // =========================================================================

    pub fn is_reward_owned(&self, reward_id: &str) -> Result<bool> {
        self.get_flag(&self.key("rewards", reward_id, "owned"))
    }

    pub fn set_reward_owned(&self, reward_id: &str, owned: bool) -> Result<()> {
        self.set_flag(&self.key("rewards", reward_id, "owned"), owned)
    }

    /// Number of sub-rewards a sequence reward has handed out.
    pub fn sequence_cursor(&self, reward_id: &str) -> Result<usize> {
        Ok(self
            .get_parsed(&self.key("rewards", reward_id, "cursor"))?
            .unwrap_or(0))
    }

    pub fn set_sequence_cursor(&self, reward_id: &str, cursor: usize) -> Result<()> {
        self.put_value(&self.key("rewards", reward_id, "cursor"), cursor)
    }

    /// Sub-reward last chosen by a random reward.
    pub fn random_choice(&self, reward_id: &str) -> Result<Option<String>> {
        self.store.get(&self.key("rewards", reward_id, "chosen"))
    }

    pub fn set_random_choice(&self, reward_id: &str, chosen: Option<&str>) -> Result<()> {
        let key = self.key("rewards", reward_id, "chosen");
        match chosen {
            Some(id) => self.store.put(&key, id),
            None => self.store.delete(&key),
        }
    }

    pub fn is_challenge_completed(&self, challenge_id: &str) -> Result<bool> {
        self.get_flag(&self.key("challenges", challenge_id, "completed"))
    }

    pub fn set_challenge_completed(&self, challenge_id: &str, completed: bool) -> Result<()> {
        self.set_flag(&self.key("challenges", challenge_id, "completed"), completed)
    }

    // =========================================================================
    // Model document
    // =========================================================================

    /// The persisted model document, if one was saved.
    pub fn model(&self) -> Result<Option<String>> {
        self.store.get(&format!("{}model", self.prefix))
    }

    pub fn set_model(&self, json: &str) -> Result<()> {
        self.store.put(&format!("{}model", self.prefix), json)
    }

    /// Delete every progress key under the prefix, keeping the model document.
    ///
    /// Returns the number of keys removed.
    pub fn clear(&self) -> Result<usize> {
        let model_key = format!("{}model", self.prefix);
        let mut removed = 0;
        for key in self.store.keys(&self.prefix)? {
            if key == model_key {
                continue;
            }
            self.store.delete(&key)?;
            removed += 1;
        }
        Ok(removed)
    }
}
