//! Status command for LevelUp.
//!
//! Shows the persisted progress of every world, level, gate and score of a
//! model: either a model document given on the command line or the model
//! stored by the last `initialize`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{LevelUpError, Result};
use crate::model::{list_gates, Model};
use crate::util::read_to_string_limited;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Progress of one world or level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStatus {
    pub world_id: String,
    /// `world` or `level`.
    pub kind: String,
    pub completed: bool,
    pub can_start: bool,
    /// Level statistics; absent for plain worlds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelStats>,
}

/// Persisted play statistics of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub times_started: u32,
    pub times_played: u32,
    pub fastest_duration: Option<f64>,
    pub slowest_duration: Option<f64>,
}

/// Open state of a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateStatus {
    pub gate_id: String,
    pub world_id: String,
    pub open: bool,
}

/// Persisted values of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatus {
    pub score_id: String,
    pub world_id: String,
    pub latest: Option<f64>,
    pub record: Option<f64>,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    pub success: bool,
    pub worlds: Vec<WorldStatus>,
    pub gates: Vec<GateStatus>,
    pub scores: Vec<ScoreStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutput {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            worlds: Vec::new(),
            gates: Vec::new(),
            scores: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The status command implementation.
#[derive(Debug)]
pub struct StatusCommand {
    ctx: Context,
}

impl StatusCommand {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Report progress for the model at `model_path`, or the stored model.
    pub fn run(&self, model_path: Option<&Path>, _options: &StatusOptions) -> StatusOutput {
        let model = match self.load_model(model_path) {
            Ok(model) => model,
            Err(e) => return StatusOutput::failure(e.to_string()),
        };

        match self.collect(&model) {
            Ok(output) => output,
            Err(e) => StatusOutput::failure(e.to_string()),
        }
    }

    fn load_model(&self, model_path: Option<&Path>) -> Result<Model> {
        let json = match model_path {
            Some(path) => read_to_string_limited(path)?,
            None => self.ctx.progress().model()?.ok_or_else(|| {
                LevelUpError::deserialize("no stored model; pass a model document")
            })?,
        };
        Model::from_json(&json)
    }

    fn collect(&self, model: &Model) -> Result<StatusOutput> {
        let ctx = &self.ctx;
        let progress = ctx.progress();
        let mut output = StatusOutput {
            success: true,
            worlds: Vec::new(),
            gates: Vec::new(),
            scores: Vec::new(),
            error: None,
        };

        for node in model.all_worlds() {
            let world = node.world();
            let world_id = world.world_id();

            let level = match node.as_level() {
                Some(_) => Some(LevelStats {
                    times_started: progress.times_started(world_id)?,
                    times_played: progress.times_played(world_id)?,
                    fastest_duration: progress.fastest_duration(world_id)?,
                    slowest_duration: progress.slowest_duration(world_id)?,
                }),
                None => None,
            };
            output.worlds.push(WorldStatus {
                world_id: world_id.to_string(),
                kind: node.type_name().to_string(),
                completed: world.is_completed(ctx)?,
                can_start: world.can_start(ctx)?,
                level,
            });

            if let Some(list) = world.gate() {
                for gate in list_gates(list) {
                    output.gates.push(GateStatus {
                        gate_id: gate.gate_id().to_string(),
                        world_id: world_id.to_string(),
                        open: gate.as_openable().is_open(ctx)?,
                    });
                }
            }

            for score in world.scores().values() {
                output.scores.push(ScoreStatus {
                    score_id: score.score_id().to_string(),
                    world_id: world_id.to_string(),
                    latest: score.latest(ctx)?,
                    record: score.record(ctx)?,
                });
            }
        }

        Ok(output)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        fn seconds(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| format!("{:.2}s", v))
        }

        fn number(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }

        let mut lines = vec!["Worlds:".to_string()];
        for world in &output.worlds {
            let mut line = format!(
                "  {} ({}) completed={} can_start={}",
                world.world_id, world.kind, world.completed, world.can_start
            );
            if let Some(level) = &world.level {
                line.push_str(&format!(
                    " started={} played={} fastest={} slowest={}",
                    level.times_started,
                    level.times_played,
                    seconds(level.fastest_duration),
                    seconds(level.slowest_duration)
                ));
            }
            lines.push(line);
        }

        if !output.gates.is_empty() {
            lines.push("Gates:".to_string());
            for gate in &output.gates {
                let state = if gate.open { "open" } else { "closed" };
                lines.push(format!("  {} [{}] {}", gate.gate_id, gate.world_id, state));
            }
        }

        if !output.scores.is_empty() {
            lines.push("Scores:".to_string());
            for score in &output.scores {
                lines.push(format!(
                    "  {} [{}] latest={} record={}",
                    score.score_id,
                    score.world_id,
                    number(score.latest),
                    number(score.record)
                ));
            }
        }

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Gate, Level, Score, World};
    use crate::registry::LevelUp;

    fn sample_model() -> Model {
        let mut lvl1 = Level::new("lvl1");
        lvl1.world_mut()
            .add_score(Score::new("points", "Points", true))
            .unwrap();
        let mut lvl2 = Level::new("lvl2");
        lvl2.world_mut()
            .add_gate(Gate::world_completion("after_lvl1", "lvl1"));

        let mut main = World::new("main");
        main.add_inner_world(lvl1).unwrap();
        main.add_inner_world(lvl2).unwrap();
        let mut model = Model::new();
        model.add_world(main).unwrap();
        model
    }

    fn played_context() -> Context {
        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(sample_model()).unwrap();
        {
            let (level, ctx) = levelup.level_with_context("lvl1").unwrap();
            level.start(ctx).unwrap();
            level.inc_score("points", 42.0).unwrap();
            level.end(ctx, true).unwrap();
        }
        levelup.try_open_gate("after_lvl1").unwrap();
        levelup.into_context()
    }

    #[test]
    fn test_status_from_stored_model() {
        let cmd = StatusCommand::new(played_context());
        let output = cmd.run(None, &StatusOptions::default());

        assert!(output.success);
        assert_eq!(output.worlds.len(), 3);

        let lvl1 = output.worlds.iter().find(|w| w.world_id == "lvl1").unwrap();
        assert!(lvl1.completed);
        assert_eq!(lvl1.level.as_ref().unwrap().times_played, 1);

        let lvl2 = output.worlds.iter().find(|w| w.world_id == "lvl2").unwrap();
        assert!(lvl2.can_start);

        assert!(output.gates.iter().all(|g| g.open));
        assert_eq!(output.scores[0].record, Some(42.0));
    }

    #[test]
    fn test_status_without_model() {
        let cmd = StatusCommand::new(Context::in_memory(Vec::<String>::new()));
        let output = cmd.run(None, &StatusOptions::default());
        assert!(!output.success);
        assert!(output.error.unwrap().contains("no stored model"));
    }

    #[test]
    fn test_status_human_output() {
        let cmd = StatusCommand::new(played_context());
        let output = cmd.run(None, &StatusOptions::default());
        let text = cmd.format_output(&output, &StatusOptions::default());

        assert!(text.contains("lvl1 (level) completed=true"));
        assert!(text.contains("after_lvl1 [lvl2] open"));
        assert!(text.contains("points [lvl1] latest=42 record=42"));
    }
}
