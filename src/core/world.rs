//! Worlds: containers of inner worlds, scores, challenges and a gate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::core::challenge::Challenge;
use crate::core::gate::{Gate, GatesList, Openable};
use crate::core::level::Level;
use crate::core::score::{Score, ScoreLookup};
use crate::error::{LevelUpError, Result};
use crate::events::LevelUpEvent;
use crate::util::{insert_keyed, keyed_map, Keyed};

/// A node of the progression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorldNode {
    #[serde(rename = "world")]
    World(World),
    #[serde(rename = "level")]
    Level(Level),
}

/// A gated container of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    world_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gate: Option<GatesList>,
    #[serde(
        default,
        with = "keyed_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    inner_worlds: BTreeMap<String, WorldNode>,
    #[serde(
        default,
        with = "keyed_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    scores: BTreeMap<String, Score>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    challenges: Vec<Challenge>,
}

impl Keyed for WorldNode {
    fn key(&self) -> &str {
        self.world_id()
    }
}

impl World {
    pub fn new(world_id: impl Into<String>) -> Self {
        Self {
            world_id: world_id.into(),
            gate: None,
            inner_worlds: BTreeMap::new(),
            scores: BTreeMap::new(),
            challenges: Vec::new(),
        }
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    pub fn gate(&self) -> Option<&GatesList> {
        self.gate.as_ref()
    }

    pub fn inner_worlds(&self) -> impl Iterator<Item = &WorldNode> {
        self.inner_worlds.values()
    }

    pub fn scores(&self) -> &BTreeMap<String, Score> {
        &self.scores
    }

    pub(crate) fn scores_mut(&mut self) -> impl Iterator<Item = &mut Score> {
        self.scores.values_mut()
    }

    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Add a gate to the world's gate list.
    ///
    /// A world without a gate gets an AND list named `{world_id}_gates`.
    pub fn add_gate(&mut self, gate: impl Into<Gate>) {
        let world_id = &self.world_id;
        self.gate
            .get_or_insert_with(|| GatesList::and(format!("{}_gates", world_id), Vec::new()))
            .push(gate);
    }

    /// Replace the world's gate list.
    pub fn set_gate(&mut self, gate: GatesList) {
        self.gate = Some(gate);
    }

    /// Add a score. Fails if the world already has a score with that id.
    pub fn add_score(&mut self, score: Score) -> Result<()> {
        insert_keyed(&mut self.scores, score)
    }

    /// Add an inner world or level. Fails on a duplicate id.
    pub fn add_inner_world(&mut self, world: impl Into<WorldNode>) -> Result<()> {
        insert_keyed(&mut self.inner_worlds, world.into())
    }

    pub fn add_challenge(&mut self, challenge: Challenge) {
        self.challenges.push(challenge);
    }

    /// Whether the world may be entered: no gate, or an open gate.
    pub fn can_start(&self, ctx: &Context) -> Result<bool> {
        match &self.gate {
            Some(gate) => gate.is_open(ctx),
            None => Ok(true),
        }
    }

    pub fn is_completed(&self, ctx: &Context) -> Result<bool> {
        ctx.progress().is_world_completed(&self.world_id)
    }

    /// Persist the completed flag.
    ///
    /// `WorldCompleted` is published only when the flag turns on.
    pub fn set_completed(&self, ctx: &Context, completed: bool) -> Result<()> {
        let was_completed = self.is_completed(ctx)?;
        ctx.progress()
            .set_world_completed(&self.world_id, completed)?;
        if completed && !was_completed {
            tracing::debug!(world_id = %self.world_id, "world completed");
            ctx.publish(LevelUpEvent::WorldCompleted {
                world_id: self.world_id.clone(),
            });
        }
        Ok(())
    }

    /// Find a descendant world or level by id.
    pub fn find_world(&self, world_id: &str) -> Option<&WorldNode> {
        if let Some(node) = self.inner_worlds.get(world_id) {
            return Some(node);
        }
        self.inner_worlds
            .values()
            .find_map(|node| node.world().find_world(world_id))
    }

    pub fn find_world_mut(&mut self, world_id: &str) -> Option<&mut WorldNode> {
        if self.inner_worlds.contains_key(world_id) {
            return self.inner_worlds.get_mut(world_id);
        }
        self.inner_worlds
            .values_mut()
            .find_map(|node| node.world_mut().find_world_mut(world_id))
    }

    /// Find a gate of this world or any descendant by id.
    pub fn find_gate(&self, gate_id: &str) -> Option<&dyn Openable> {
        self.gate
            .as_ref()
            .and_then(|gate| gate.find(gate_id))
            .or_else(|| {
                self.inner_worlds
                    .values()
                    .find_map(|node| node.world().find_gate(gate_id))
            })
    }

    /// Mutable access to a score owned directly by this world.
    pub fn score_mut(&mut self, score_id: &str) -> Result<&mut Score> {
        self.scores
            .get_mut(score_id)
            .ok_or_else(|| LevelUpError::score_not_found(score_id))
    }
}

impl ScoreLookup for World {
    fn find_score(&self, score_id: &str) -> Option<&Score> {
        self.scores.get(score_id).or_else(|| {
            self.inner_worlds
                .values()
                .find_map(|node| node.world().find_score(score_id))
        })
    }
}

impl WorldNode {
    pub fn world_id(&self) -> &str {
        self.world().world_id()
    }

    /// The world part of this node. A level is a world with a play session.
    pub fn world(&self) -> &World {
        match self {
            WorldNode::World(world) => world,
            WorldNode::Level(level) => level.world(),
        }
    }

    pub fn world_mut(&mut self) -> &mut World {
        match self {
            WorldNode::World(world) => world,
            WorldNode::Level(level) => level.world_mut(),
        }
    }

    pub fn as_level(&self) -> Option<&Level> {
        match self {
            WorldNode::Level(level) => Some(level),
            WorldNode::World(_) => None,
        }
    }

    pub fn as_level_mut(&mut self) -> Option<&mut Level> {
        match self {
            WorldNode::Level(level) => Some(level),
            WorldNode::World(_) => None,
        }
    }

    /// The `type` discriminator used in model documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            WorldNode::World(_) => "world",
            WorldNode::Level(_) => "level",
        }
    }

    /// Persist the completed flag; a level also moves to `Completed`.
    pub fn set_completed(&mut self, ctx: &Context, completed: bool) -> Result<()> {
        match self {
            WorldNode::World(world) => world.set_completed(ctx, completed),
            WorldNode::Level(level) => level.set_completed(ctx, completed),
        }
    }
}

impl From<World> for WorldNode {
    fn from(world: World) -> Self {
        WorldNode::World(world)
    }
}

impl From<Level> for WorldNode {
    fn from(level: Level) -> Self {
        WorldNode::Level(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reward::Reward;
    use crate::core::score::Range;

    fn ctx() -> Context {
        Context::in_memory(["gem"])
    }

    #[test]
    fn test_no_gate_can_start() {
        let ctx = ctx();
        assert!(World::new("w").can_start(&ctx).unwrap());
    }

    #[test]
    fn test_add_gate_creates_and_list() {
        let ctx = ctx();
        let mut world = World::new("w");
        world.add_gate(Gate::world_completion("g1", "other"));
        world.add_gate(Gate::world_completion("g2", "another"));

        let gate = world.gate().unwrap();
        assert_eq!(gate.gate_id(), "w_gates");
        assert_eq!(gate.len(), 2);
        assert!(!world.can_start(&ctx).unwrap());

        ctx.progress().set_gate_open("g1", true).unwrap();
        ctx.progress().set_gate_open("g2", true).unwrap();
        assert!(world.can_start(&ctx).unwrap());
    }

    #[test]
    fn test_set_completed_notifies_on_transition() {
        let ctx = ctx();
        let recorder = ctx.bus().record();
        let world = World::new("w");

        world.set_completed(&ctx, true).unwrap();
        world.set_completed(&ctx, true).unwrap();
        assert!(world.is_completed(&ctx).unwrap());
        assert_eq!(
            recorder.drain(),
            vec![LevelUpEvent::WorldCompleted {
                world_id: "w".to_string()
            }]
        );

        world.set_completed(&ctx, false).unwrap();
        assert!(!world.is_completed(&ctx).unwrap());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut world = World::new("w");
        world.add_score(Score::new("s", "S", true)).unwrap();
        assert!(world.add_score(Score::new("s", "S", true)).is_err());

        world.add_inner_world(World::new("inner")).unwrap();
        assert!(world.add_inner_world(Level::new("inner")).is_err());
    }

    fn tree() -> World {
        let mut level = Level::new("lvl");
        level
            .world_mut()
            .add_score(Score::new("deep_score", "Deep", true))
            .unwrap();
        level
            .world_mut()
            .add_gate(Gate::record("deep_gate", "top_score", 5.0));

        let mut middle = World::new("middle");
        middle.add_inner_world(level).unwrap();

        let mut root = World::new("root");
        root.add_score(Score::new("top_score", "Top", true)).unwrap();
        root.add_inner_world(middle).unwrap();
        root
    }

    #[test]
    fn test_recursive_lookups() {
        let mut root = tree();

        assert_eq!(root.find_world("middle").unwrap().type_name(), "world");
        assert_eq!(root.find_world("lvl").unwrap().type_name(), "level");
        assert!(root.find_world("missing").is_none());
        assert!(root.find_world_mut("lvl").unwrap().as_level_mut().is_some());

        assert!(root.find_score("top_score").is_some());
        assert!(root.find_score("deep_score").is_some());
        assert!(root.find_score("nope").is_none());

        assert_eq!(root.find_gate("deep_gate").unwrap().gate_id(), "deep_gate");
        assert_eq!(root.find_gate("lvl_gates").unwrap().gate_id(), "lvl_gates");
        assert!(root.find_gate("nope").is_none());
    }

    #[test]
    fn test_score_mut_unknown() {
        let mut world = World::new("w");
        let err = world.score_mut("nope").unwrap_err();
        assert!(matches!(err, LevelUpError::ScoreNotFound { .. }));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut root = tree();
        root.add_score(Score::range("range", "R", true, Range::new(0.0, 10.0)))
            .unwrap();
        root.add_challenge(Challenge::new("c", "C").with_reward(Reward::badge("b", "B")));

        let node = WorldNode::from(root);
        let json = serde_json::to_string(&node).unwrap();
        let back: WorldNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_json_document() {
        let json = r#"{
            "type": "world",
            "worldId": "main",
            "innerWorlds": [
                {
                    "type": "level",
                    "worldId": "lvl1",
                    "scores": [{"type": "score", "scoreId": "s1", "higherBetter": true}]
                },
                {
                    "type": "level",
                    "worldId": "lvl2",
                    "gate": {
                        "type": "listAND",
                        "gateId": "lvl2_gates",
                        "gates": [{"type": "record", "gateId": "g", "associatedScoreId": "s1", "desiredRecord": 100}]
                    }
                }
            ]
        }"#;
        let node: WorldNode = serde_json::from_str(json).unwrap();
        let world = node.world();
        assert_eq!(world.inner_worlds().count(), 2);
        assert!(world.find_score("s1").is_some());
        assert!(world.find_gate("g").is_some());
    }

    #[test]
    fn test_json_duplicate_inner_world() {
        let json = r#"{
            "type": "world",
            "worldId": "main",
            "innerWorlds": [
                {"type": "level", "worldId": "dup"},
                {"type": "world", "worldId": "dup"}
            ]
        }"#;
        let err = serde_json::from_str::<WorldNode>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate id `dup`"));
    }

    #[test]
    fn test_json_unknown_node_type() {
        let err = serde_json::from_str::<WorldNode>(r#"{"type":"galaxy","worldId":"x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("galaxy"));
    }
}
