//! Levels: worlds with a timed play session.
//!
//! The session is runtime-only. Play statistics (times started and played,
//! fastest and slowest duration) are persisted under the level id.
//!
//! ```text
//! Idle/Ended/Completed --start--> Running --pause--> Paused
//!                                 Running <--resume-- Paused
//!                   Running/Paused --end--> Ended (or Completed)
//! ```
//!
//! Transitions from any other state are logged and ignored.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::core::world::World;
use crate::error::Result;
use crate::events::LevelUpEvent;

/// Play-session state of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    #[default]
    Idle,
    Running,
    Paused,
    Ended,
    Completed,
}

impl LevelState {
    /// Whether a play session is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, LevelState::Running | LevelState::Paused)
    }
}

impl std::fmt::Display for LevelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LevelState::Idle => "idle",
            LevelState::Running => "running",
            LevelState::Paused => "paused",
            LevelState::Ended => "ended",
            LevelState::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PlaySession {
    state: LevelState,
    /// Start of the current running stretch.
    start_time: Option<DateTime<Utc>>,
    /// Time accumulated before the last pause.
    elapsed: TimeDelta,
}

impl Default for PlaySession {
    fn default() -> Self {
        Self {
            state: LevelState::Idle,
            start_time: None,
            elapsed: TimeDelta::zero(),
        }
    }
}

/// A playable world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    #[serde(flatten)]
    world: World,
    #[serde(skip)]
    session: PlaySession,
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

impl Level {
    pub fn new(level_id: impl Into<String>) -> Self {
        Self::from_world(World::new(level_id))
    }

    pub fn from_world(world: World) -> Self {
        Self {
            world,
            session: PlaySession::default(),
        }
    }

    pub fn level_id(&self) -> &str {
        self.world.world_id()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn state(&self) -> LevelState {
        self.session.state
    }

    pub fn can_start(&self, ctx: &Context) -> Result<bool> {
        self.world.can_start(ctx)
    }

    pub fn times_started(&self, ctx: &Context) -> Result<u32> {
        ctx.progress().times_started(self.level_id())
    }

    pub fn times_played(&self, ctx: &Context) -> Result<u32> {
        ctx.progress().times_played(self.level_id())
    }

    pub fn fastest_duration(&self, ctx: &Context) -> Result<Option<f64>> {
        ctx.progress().fastest_duration(self.level_id())
    }

    pub fn slowest_duration(&self, ctx: &Context) -> Result<Option<f64>> {
        ctx.progress().slowest_duration(self.level_id())
    }

    /// Start a play session.
    ///
    /// Returns `false` when the level's gate is closed or a session is
    /// already in progress.
    pub fn start(&mut self, ctx: &Context) -> Result<bool> {
        if self.session.state.is_active() {
            tracing::warn!(
                level_id = %self.level_id(),
                state = %self.session.state,
                "start ignored: level is already being played"
            );
            return Ok(false);
        }
        if !self.can_start(ctx)? {
            tracing::debug!(level_id = %self.level_id(), "level gate is closed");
            return Ok(false);
        }

        ctx.progress().inc_times_started(self.level_id())?;
        self.session.start_time = Some(ctx.now());
        self.session.elapsed = TimeDelta::zero();
        self.session.state = LevelState::Running;

        tracing::debug!(level_id = %self.level_id(), "level started");
        ctx.publish(LevelUpEvent::LevelStarted {
            level_id: self.level_id().to_string(),
        });
        Ok(true)
    }

    pub fn pause(&mut self, ctx: &Context) {
        let (LevelState::Running, Some(start)) = (self.session.state, self.session.start_time)
        else {
            tracing::warn!(
                level_id = %self.level_id(),
                state = %self.session.state,
                "pause ignored: level is not running"
            );
            return;
        };
        self.session.elapsed += ctx.now() - start;
        self.session.start_time = None;
        self.session.state = LevelState::Paused;
    }

    pub fn resume(&mut self, ctx: &Context) {
        if self.session.state != LevelState::Paused {
            tracing::warn!(
                level_id = %self.level_id(),
                state = %self.session.state,
                "resume ignored: level is not paused"
            );
            return;
        }
        self.session.start_time = Some(ctx.now());
        self.session.state = LevelState::Running;
    }

    /// Seconds played in the current session, excluding paused time.
    pub fn play_duration(&self, ctx: &Context) -> f64 {
        let running = match (self.session.state, self.session.start_time) {
            (LevelState::Running, Some(start)) => ctx.now() - start,
            _ => TimeDelta::zero(),
        };
        seconds(self.session.elapsed + running)
    }

    /// End the play session.
    ///
    /// Records play statistics, saves every score of the level and, when
    /// `completed`, marks the level completed.
    pub fn end(&mut self, ctx: &Context, completed: bool) -> Result<()> {
        if !self.session.state.is_active() {
            tracing::warn!(
                level_id = %self.level_id(),
                state = %self.session.state,
                "end ignored: no active session"
            );
            return Ok(());
        }

        let duration = self.play_duration(ctx);
        self.session.state = LevelState::Ended;

        let level_id = self.world.world_id().to_string();
        let progress = ctx.progress();
        progress.inc_times_played(&level_id)?;
        if progress
            .fastest_duration(&level_id)?
            .is_none_or(|fastest| duration < fastest)
        {
            progress.set_fastest_duration(&level_id, duration)?;
        }
        if progress
            .slowest_duration(&level_id)?
            .is_none_or(|slowest| duration > slowest)
        {
            progress.set_slowest_duration(&level_id, duration)?;
        }

        for score in self.world.scores_mut() {
            score.save_and_reset(ctx)?;
        }

        tracing::debug!(level_id = %level_id, duration, "level ended");
        ctx.publish(LevelUpEvent::LevelEnded {
            level_id: level_id.clone(),
            duration,
        });

        self.session.start_time = None;
        self.session.elapsed = TimeDelta::zero();

        if completed {
            self.set_completed(ctx, true)?;
        }
        Ok(())
    }

    /// Persist the completed flag. Completing also moves to `Completed`.
    pub fn set_completed(&mut self, ctx: &Context, completed: bool) -> Result<()> {
        self.world.set_completed(ctx, completed)?;
        if completed {
            self.session.state = LevelState::Completed;
        }
        Ok(())
    }

    pub fn inc_score(&mut self, score_id: &str, amount: f64) -> Result<()> {
        self.world.score_mut(score_id)?.inc(amount);
        Ok(())
    }

    pub fn dec_score(&mut self, score_id: &str, amount: f64) -> Result<()> {
        self.world.score_mut(score_id)?.dec(amount);
        Ok(())
    }
}
