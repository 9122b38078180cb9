//! Once-completable groups of rewards owned by a world.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::core::reward::Reward;
use crate::error::Result;

/// A named goal whose rewards are given when it is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    challenge_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    rewards: Vec<Reward>,
}

impl Challenge {
    pub fn new(challenge_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            challenge_id: challenge_id.into(),
            name: name.into(),
            rewards: Vec::new(),
        }
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    pub fn challenge_id(&self) -> &str {
        &self.challenge_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn is_completed(&self, ctx: &Context) -> Result<bool> {
        ctx.progress().is_challenge_completed(&self.challenge_id)
    }

    /// Mark the challenge completed and give each of its rewards.
    ///
    /// Returns `false` if it was already completed.
    pub fn complete(&self, ctx: &Context) -> Result<bool> {
        if self.is_completed(ctx)? {
            return Ok(false);
        }
        for reward in &self.rewards {
            reward.give(ctx)?;
        }
        ctx.progress()
            .set_challenge_completed(&self.challenge_id, true)?;
        tracing::debug!(challenge_id = %self.challenge_id, "challenge completed");
        Ok(true)
    }
}
