//! Scores tracked during level play.
//!
//! A score has a volatile in-session value (`temp`) and two persisted values:
//! `latest`, the value saved at the end of the last session, and `record`,
//! the best value ever saved. "Best" depends on the policy: with
//! `higher_better` the record is a maximum, otherwise a minimum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Result;
use crate::events::LevelUpEvent;
use crate::util::Keyed;

/// Inclusive bounds of a range score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Clamp a value into the range. Never panics, even for `low > high`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.low).min(self.high)
    }
}

/// Score variants, selected by the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScoreKind {
    /// Unbounded counter.
    #[serde(rename = "score")]
    Plain,
    /// Counter clamped into `range`.
    #[serde(rename = "range")]
    Range { range: Range },
    /// Counter whose saved value is deposited into the inventory.
    #[serde(rename = "item")]
    VirtualItem {
        #[serde(rename = "associatedItemId")]
        associated_item_id: String,
    },
}

/// A tracked numeric metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    score_id: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_higher_better")]
    higher_better: bool,
    #[serde(default)]
    start_value: f64,
    #[serde(flatten)]
    kind: ScoreKind,
    /// In-session value; `None` means "at the start value".
    #[serde(skip)]
    temp: Option<f64>,
}

fn default_higher_better() -> bool {
    true
}

impl Keyed for Score {
    fn key(&self) -> &str {
        &self.score_id
    }
}

impl Score {
    /// Create a plain score starting at zero.
    pub fn new(score_id: impl Into<String>, name: impl Into<String>, higher_better: bool) -> Self {
        Self {
            score_id: score_id.into(),
            name: name.into(),
            higher_better,
            start_value: 0.0,
            kind: ScoreKind::Plain,
            temp: None,
        }
    }

    /// Create a score whose in-session value stays within `range`.
    pub fn range(
        score_id: impl Into<String>,
        name: impl Into<String>,
        higher_better: bool,
        range: Range,
    ) -> Self {
        Self {
            kind: ScoreKind::Range { range },
            ..Self::new(score_id, name, higher_better)
        }
    }

    /// Create a score that deposits its saved value as `item_id` units.
    pub fn virtual_item(
        score_id: impl Into<String>,
        name: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: ScoreKind::VirtualItem {
                associated_item_id: item_id.into(),
            },
            ..Self::new(score_id, name, true)
        }
    }

    /// Builder form of [`Score::set_start_value`].
    pub fn with_start_value(mut self, value: f64) -> Self {
        self.set_start_value(value);
        self
    }

    pub fn score_id(&self) -> &str {
        &self.score_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_higher_better(&self) -> bool {
        self.higher_better
    }

    pub fn start_value(&self) -> f64 {
        self.start_value
    }

    pub fn kind(&self) -> &ScoreKind {
        &self.kind
    }

    /// Current in-session value.
    pub fn temp_score(&self) -> f64 {
        self.temp.unwrap_or_else(|| self.bound(self.start_value))
    }

    fn bound(&self, value: f64) -> f64 {
        match &self.kind {
            ScoreKind::Range { range } => range.clamp(value),
            _ => value,
        }
    }

    pub fn set_temp_score(&mut self, value: f64) {
        self.temp = Some(self.bound(value));
    }

    pub fn inc(&mut self, amount: f64) {
        self.set_temp_score(self.temp_score() + amount);
    }

    pub fn dec(&mut self, amount: f64) {
        self.set_temp_score(self.temp_score() - amount);
    }

    /// Set the in-session value back to the start value.
    pub fn reset(&mut self) {
        self.temp = None;
    }

    /// Change the value sessions reset to. The current value is untouched.
    pub fn set_start_value(&mut self, value: f64) {
        self.start_value = value;
    }

    /// Whether `candidate` is strictly better than `current` under the policy.
    pub fn is_better(&self, candidate: f64, current: f64) -> bool {
        if self.higher_better {
            candidate > current
        } else {
            candidate < current
        }
    }

    fn reached(&self, value: f64, target: f64) -> bool {
        if self.higher_better {
            value >= target
        } else {
            value <= target
        }
    }

    /// Whether the in-session value is at least as good as `target`.
    pub fn has_temp_reached(&self, target: f64) -> bool {
        self.reached(self.temp_score(), target)
    }

    /// Value saved by the last `save_and_reset`, if any.
    pub fn latest(&self, ctx: &Context) -> Result<Option<f64>> {
        ctx.progress().score_latest(&self.score_id)
    }

    /// Best value ever saved, if any.
    pub fn record(&self, ctx: &Context) -> Result<Option<f64>> {
        ctx.progress().score_record(&self.score_id)
    }

    /// Whether the record is at least as good as `target`. No record means no.
    pub fn has_record_reached(&self, target: f64, ctx: &Context) -> Result<bool> {
        Ok(self
            .record(ctx)?
            .is_some_and(|record| self.reached(record, target)))
    }

    /// Persist the session value and start a new session.
    ///
    /// Sets `latest`, raises `record` when the value beats it (or no record
    /// exists), then resets to the start value. Virtual-item scores first
    /// deposit the rounded value into the inventory when it is positive.
    pub fn save_and_reset(&mut self, ctx: &Context) -> Result<()> {
        let value = self.temp_score();

        if let ScoreKind::VirtualItem { associated_item_id } = &self.kind {
            let amount = value.round() as i64;
            if amount > 0 {
                ctx.inventory().give(associated_item_id, amount)?;
            }
        }

        let progress = ctx.progress();
        progress.set_score_latest(&self.score_id, value)?;

        let improved = match progress.score_record(&self.score_id)? {
            None => true,
            Some(record) => self.is_better(value, record),
        };
        if improved {
            progress.set_score_record(&self.score_id, value)?;
            tracing::debug!(score_id = %self.score_id, record = value, "new score record");
            ctx.publish(LevelUpEvent::ScoreRecordChanged {
                score_id: self.score_id.clone(),
                record: value,
            });
        }

        self.reset();
        Ok(())
    }
}

/// Resolve scores by id, for gates that depend on them.
pub trait ScoreLookup {
    fn find_score(&self, score_id: &str) -> Option<&Score>;
}

impl ScoreLookup for BTreeMap<String, Score> {
    fn find_score(&self, score_id: &str) -> Option<&Score> {
        self.get(score_id)
    }
}

impl ScoreLookup for Vec<Score> {
    fn find_score(&self, score_id: &str) -> Option<&Score> {
        self.iter().find(|s| s.score_id == score_id)
    }
}
