//! Rewards granted for progress.
//!
//! Every reward persists an `owned` flag. A non-repeatable reward can only be
//! given again after it has been taken. Composite rewards (random and
//! sequence) delegate to sub-rewards and persist which one they granted so
//! `take` can revoke it.

use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::context::Context;
use crate::error::{LevelUpError, Result};
use crate::events::LevelUpEvent;

/// Reward variants, selected by the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RewardKind {
    /// A collectible with no side effect.
    #[serde(rename = "badge")]
    Badge {
        #[serde(rename = "iconUrl", default, skip_serializing_if = "Option::is_none")]
        icon_url: Option<String>,
    },
    /// `amount` units of an inventory item.
    #[serde(rename = "item")]
    VirtualItem {
        #[serde(rename = "associatedItemId")]
        associated_item_id: String,
        #[serde(deserialize_with = "positive_amount")]
        amount: i64,
    },
    /// One sub-reward picked uniformly at random.
    #[serde(rename = "random")]
    Random { rewards: Vec<Reward> },
    /// The next sub-reward in order.
    #[serde(rename = "sequence")]
    Sequence { rewards: Vec<Reward> },
}

fn positive_amount<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = i64::deserialize(deserializer)?;
    if amount <= 0 {
        return Err(D::Error::custom(format!(
            "item reward amount must be positive, got {}",
            amount
        )));
    }
    Ok(amount)
}

/// A grantable reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    reward_id: String,
    #[serde(default)]
    name: String,
    /// Unset means the variant default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeatable: Option<bool>,
    #[serde(flatten)]
    kind: RewardKind,
}

impl Reward {
    fn with_kind(reward_id: impl Into<String>, name: impl Into<String>, kind: RewardKind) -> Self {
        Self {
            reward_id: reward_id.into(),
            name: name.into(),
            repeatable: None,
            kind,
        }
    }

    pub fn badge(reward_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(reward_id, name, RewardKind::Badge { icon_url: None })
    }

    /// An item reward. Fails unless `amount` is positive.
    pub fn virtual_item(
        reward_id: impl Into<String>,
        name: impl Into<String>,
        item_id: impl Into<String>,
        amount: i64,
    ) -> Result<Self> {
        let reward_id = reward_id.into();
        if amount <= 0 {
            return Err(LevelUpError::deserialize(format!(
                "item reward `{}` amount must be positive, got {}",
                reward_id, amount
            )));
        }
        Ok(Self::with_kind(
            reward_id,
            name,
            RewardKind::VirtualItem {
                associated_item_id: item_id.into(),
                amount,
            },
        ))
    }

    pub fn random(
        reward_id: impl Into<String>,
        name: impl Into<String>,
        rewards: Vec<Reward>,
    ) -> Self {
        Self::with_kind(reward_id, name, RewardKind::Random { rewards })
    }

    pub fn sequence(
        reward_id: impl Into<String>,
        name: impl Into<String>,
        rewards: Vec<Reward>,
    ) -> Self {
        Self::with_kind(reward_id, name, RewardKind::Sequence { rewards })
    }

    pub fn with_repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = Some(repeatable);
        self
    }

    pub fn reward_id(&self) -> &str {
        &self.reward_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &RewardKind {
        &self.kind
    }

    /// Whether the reward may be given while already owned.
    ///
    /// Random and sequence rewards default to repeatable.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable.unwrap_or(matches!(
            self.kind,
            RewardKind::Random { .. } | RewardKind::Sequence { .. }
        ))
    }

    pub fn is_owned(&self, ctx: &Context) -> Result<bool> {
        ctx.progress().is_reward_owned(&self.reward_id)
    }

    /// Grant the reward.
    ///
    /// Returns `false` without side effects when a non-repeatable reward is
    /// already owned or a composite reward has nothing left to grant.
    pub fn give(&self, ctx: &Context) -> Result<bool> {
        if !self.is_repeatable() && self.is_owned(ctx)? {
            tracing::debug!(reward_id = %self.reward_id, "reward already owned");
            return Ok(false);
        }
        if !self.grant(ctx)? {
            return Ok(false);
        }

        ctx.progress().set_reward_owned(&self.reward_id, true)?;
        tracing::debug!(reward_id = %self.reward_id, "reward given");
        ctx.publish(LevelUpEvent::RewardGiven {
            reward_id: self.reward_id.clone(),
        });
        Ok(true)
    }

    /// Revoke the reward. Returns `false` if it is not owned.
    pub fn take(&self, ctx: &Context) -> Result<bool> {
        if !self.is_owned(ctx)? {
            tracing::debug!(reward_id = %self.reward_id, "reward not owned");
            return Ok(false);
        }
        if !self.revoke(ctx)? {
            return Ok(false);
        }

        ctx.progress().set_reward_owned(&self.reward_id, false)?;
        tracing::debug!(reward_id = %self.reward_id, "reward taken");
        ctx.publish(LevelUpEvent::RewardTaken {
            reward_id: self.reward_id.clone(),
        });
        Ok(true)
    }

    fn grant(&self, ctx: &Context) -> Result<bool> {
        match &self.kind {
            RewardKind::Badge { .. } => Ok(true),
            RewardKind::VirtualItem {
                associated_item_id,
                amount,
            } => {
                ctx.inventory().give(associated_item_id, *amount)?;
                Ok(true)
            }
            RewardKind::Random { rewards } => {
                if rewards.is_empty() {
                    tracing::warn!(reward_id = %self.reward_id, "random reward has no sub-rewards");
                    return Ok(false);
                }
                let index = ctx.with_rng(|rng| rng.random_range(0..rewards.len()));
                let chosen = &rewards[index];
                if !chosen.give(ctx)? {
                    return Ok(false);
                }
                ctx.progress()
                    .set_random_choice(&self.reward_id, Some(chosen.reward_id()))?;
                Ok(true)
            }
            RewardKind::Sequence { rewards } => {
                let cursor = ctx.progress().sequence_cursor(&self.reward_id)?;
                let Some(next) = rewards.get(cursor) else {
                    tracing::debug!(reward_id = %self.reward_id, "sequence exhausted");
                    return Ok(false);
                };
                if !next.give(ctx)? {
                    return Ok(false);
                }
                ctx.progress()
                    .set_sequence_cursor(&self.reward_id, cursor + 1)?;
                Ok(true)
            }
        }
    }

    fn revoke(&self, ctx: &Context) -> Result<bool> {
        match &self.kind {
            RewardKind::Badge { .. } => Ok(true),
            RewardKind::VirtualItem {
                associated_item_id,
                amount,
            } => {
                ctx.inventory().take(associated_item_id, *amount)?;
                Ok(true)
            }
            RewardKind::Random { rewards } => {
                let chosen = ctx.progress().random_choice(&self.reward_id)?;
                if let Some(reward) = chosen
                    .as_deref()
                    .and_then(|id| rewards.iter().find(|r| r.reward_id == id))
                {
                    reward.take(ctx)?;
                }
                ctx.progress().set_random_choice(&self.reward_id, None)?;
                Ok(true)
            }
            RewardKind::Sequence { rewards } => {
                let cursor = ctx.progress().sequence_cursor(&self.reward_id)?;
                if cursor == 0 {
                    return Ok(true);
                }
                if let Some(last) = rewards.get(cursor - 1) {
                    last.take(ctx)?;
                }
                ctx.progress()
                    .set_sequence_cursor(&self.reward_id, cursor - 1)?;
                Ok(true)
            }
        }
    }
}
