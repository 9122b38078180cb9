//! The progression registry.
//!
//! [`LevelUp`] owns the world tree and the [`Context`] it runs against. It is
//! the entry point for lookups by id and for operations that need both the
//! tree and the collaborators at once, such as opening a gate whose record
//! condition refers to a score in another world.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::core::{Challenge, Level, Openable, Score, ScoreLookup, World, WorldNode};
use crate::error::{LevelUpError, Result};
use crate::model::Model;

/// A world tree bound to its collaborators.
#[derive(Debug)]
pub struct LevelUp {
    ctx: Context,
    worlds: BTreeMap<String, WorldNode>,
}

fn find_node<'a>(worlds: &'a BTreeMap<String, WorldNode>, world_id: &str) -> Option<&'a WorldNode> {
    worlds.get(world_id).or_else(|| {
        worlds
            .values()
            .find_map(|node| node.world().find_world(world_id))
    })
}

fn find_node_mut<'a>(
    worlds: &'a mut BTreeMap<String, WorldNode>,
    world_id: &str,
) -> Option<&'a mut WorldNode> {
    if worlds.contains_key(world_id) {
        return worlds.get_mut(world_id);
    }
    worlds
        .values_mut()
        .find_map(|node| node.world_mut().find_world_mut(world_id))
}

impl LevelUp {
    /// Create an empty registry over `ctx`.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            worlds: BTreeMap::new(),
        }
    }

    /// Install the model's root worlds and persist the model document.
    pub fn initialize(&mut self, model: Model) -> Result<()> {
        model.validate()?;
        self.ctx.progress().set_model(&model.to_json()?)?;
        self.worlds = model.into_worlds();
        tracing::debug!(worlds = self.worlds.len(), "levelup initialized");
        Ok(())
    }

    /// Rebuild a registry from the model document persisted by `initialize`.
    pub fn from_stored_model(ctx: Context) -> Result<Self> {
        let json = ctx
            .progress()
            .model()?
            .ok_or_else(|| LevelUpError::deserialize("no stored model"))?;
        let model = Model::from_json(&json)?;
        Ok(Self {
            ctx,
            worlds: model.into_worlds(),
        })
    }

    /// Tear down the registry, handing back the collaborators.
    pub fn into_context(self) -> Context {
        self.ctx
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Root worlds.
    pub fn worlds(&self) -> impl Iterator<Item = &WorldNode> {
        self.worlds.values()
    }

    /// Find a world or level anywhere in the tree.
    pub fn world(&self, world_id: &str) -> Option<&WorldNode> {
        find_node(&self.worlds, world_id)
    }

    pub fn world_mut(&mut self, world_id: &str) -> Option<&mut WorldNode> {
        find_node_mut(&mut self.worlds, world_id)
    }

    pub fn level_mut(&mut self, level_id: &str) -> Option<&mut Level> {
        self.world_mut(level_id).and_then(WorldNode::as_level_mut)
    }

    /// A level together with the context its operations need.
    ///
    /// ```ignore
    /// let (level, ctx) = levelup.level_with_context("lvl1")?;
    /// level.start(ctx)?;
    /// ```
    pub fn level_with_context(&mut self, level_id: &str) -> Result<(&mut Level, &Context)> {
        let level = find_node_mut(&mut self.worlds, level_id)
            .and_then(WorldNode::as_level_mut)
            .ok_or_else(|| LevelUpError::world_not_found(level_id))?;
        Ok((level, &self.ctx))
    }

    pub fn score(&self, score_id: &str) -> Option<&Score> {
        self.find_score(score_id)
    }

    /// Find a gate or gate list anywhere in the tree.
    pub fn gate(&self, gate_id: &str) -> Option<&dyn Openable> {
        self.worlds
            .values()
            .find_map(|node| node.world().find_gate(gate_id))
    }

    /// Find a challenge anywhere in the tree.
    pub fn challenge(&self, challenge_id: &str) -> Option<&Challenge> {
        fn search<'a>(world: &'a World, challenge_id: &str) -> Option<&'a Challenge> {
            world
                .challenges()
                .iter()
                .find(|c| c.challenge_id() == challenge_id)
                .or_else(|| {
                    world
                        .inner_worlds()
                        .find_map(|node| search(node.world(), challenge_id))
                })
        }
        self.worlds
            .values()
            .find_map(|node| search(node.world(), challenge_id))
    }

    /// Try to open a gate, resolving scores across the whole tree.
    pub fn try_open_gate(&self, gate_id: &str) -> Result<bool> {
        let gate = self
            .gate(gate_id)
            .ok_or_else(|| LevelUpError::gate_not_found(gate_id))?;
        gate.try_open(&self.ctx, self)
    }

    /// Whether a gate can open now, resolving scores across the whole tree.
    pub fn can_open_gate(&self, gate_id: &str) -> Result<bool> {
        let gate = self
            .gate(gate_id)
            .ok_or_else(|| LevelUpError::gate_not_found(gate_id))?;
        gate.can_open(&self.ctx, self)
    }

    /// Start a level. See [`Level::start`].
    pub fn start_level(&mut self, level_id: &str) -> Result<bool> {
        let (level, ctx) = self.level_with_context(level_id)?;
        level.start(ctx)
    }

    /// End a level. See [`Level::end`].
    pub fn end_level(&mut self, level_id: &str, completed: bool) -> Result<()> {
        let (level, ctx) = self.level_with_context(level_id)?;
        level.end(ctx, completed)
    }

    /// Complete a challenge, giving its rewards.
    pub fn complete_challenge(&self, challenge_id: &str) -> Result<bool> {
        let challenge = self
            .challenge(challenge_id)
            .ok_or_else(|| LevelUpError::challenge_not_found(challenge_id))?;
        challenge.complete(&self.ctx)
    }

    /// Clear every persisted progress key, keeping the stored model.
    ///
    /// In-session values (level sessions, temp scores) are untouched.
    pub fn reset_progress(&self) -> Result<usize> {
        let removed = self.ctx.progress().clear()?;
        tracing::info!(removed, "progress reset");
        Ok(removed)
    }
}

impl ScoreLookup for LevelUp {
    fn find_score(&self, score_id: &str) -> Option<&Score> {
        self.worlds
            .values()
            .find_map(|node| node.world().find_score(score_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Gate, LevelState, Range, Reward};
    use crate::events::LevelUpEvent;
    use crate::inventory::MemoryInventory;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn record_gate_model(desired: f64) -> Model {
        let mut lvl1 = Level::new("lvl1");
        lvl1.world_mut()
            .add_score(Score::range("range_score", "Range", true, Range::new(0.0, 100.0)))
            .unwrap();
        lvl1.world_mut()
            .add_score(Score::new("points", "Points", true))
            .unwrap();

        let mut lvl2 = Level::new("lvl2");
        lvl2.world_mut()
            .add_gate(Gate::record("lvl2_record", "points", desired));

        let mut main = World::new("main");
        main.add_inner_world(lvl1).unwrap();
        main.add_inner_world(lvl2).unwrap();

        let mut model = Model::new();
        model.add_world(main).unwrap();
        model
    }

    fn play_lvl1(levelup: &mut LevelUp, points: f64) {
        let (level, ctx) = levelup.level_with_context("lvl1").unwrap();
        assert!(level.start(ctx).unwrap());
        for _ in 0..150 {
            level.inc_score("range_score", 1.0).unwrap();
        }
        level.inc_score("points", points).unwrap();
        assert_eq!(level.world().scores()["range_score"].temp_score(), 100.0);
        level.end(ctx, true).unwrap();
    }

    #[test]
    fn test_record_gate_reached() {
        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(record_gate_model(100.0)).unwrap();

        assert!(!levelup.start_level("lvl2").unwrap());
        assert!(!levelup.try_open_gate("lvl2_record").unwrap());

        play_lvl1(&mut levelup, 100.0);
        assert_eq!(
            levelup.score("range_score").unwrap().record(levelup.context()).unwrap(),
            Some(100.0)
        );

        assert!(levelup.can_open_gate("lvl2_gates").unwrap());
        assert!(levelup.try_open_gate("lvl2_gates").unwrap());
        assert!(levelup.start_level("lvl2").unwrap());
        assert_eq!(
            levelup.world("lvl2").unwrap().as_level().unwrap().state(),
            LevelState::Running
        );
    }

    #[test]
    fn test_record_gate_not_reached() {
        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(record_gate_model(101.0)).unwrap();

        play_lvl1(&mut levelup, 100.0);
        assert!(!levelup.try_open_gate("lvl2_record").unwrap());
        assert!(!levelup.start_level("lvl2").unwrap());
    }

    #[test]
    fn test_balance_gate_scenario() {
        let ctx = Context::in_memory(["coin"]);
        let recorder = ctx.bus().record();
        let mut level = Level::new("shop_level");
        level.world_mut().add_gate(Gate::balance("pay", "coin", 10));
        let mut model = Model::new();
        model.add_world(level).unwrap();

        let mut levelup = LevelUp::new(ctx);
        levelup.initialize(model).unwrap();

        levelup.context().inventory().give("coin", 7).unwrap();
        assert!(!levelup.try_open_gate("pay").unwrap());
        levelup.context().inventory().give("coin", 5).unwrap();
        assert!(levelup.try_open_gate("pay").unwrap());
        assert_eq!(levelup.context().inventory().balance("coin").unwrap(), 2);
        assert!(levelup.start_level("shop_level").unwrap());

        let opened: Vec<_> = recorder
            .drain()
            .into_iter()
            .filter(|e| matches!(e, LevelUpEvent::GateOpened { .. }))
            .collect();
        assert_eq!(opened.len(), 1);
    }

    #[test]
    fn test_item_score_scenario() {
        let mut level = Level::new("mine");
        level
            .world_mut()
            .add_score(Score::virtual_item("gems_found", "Gems", "gem"))
            .unwrap();
        let mut model = Model::new();
        model.add_world(level).unwrap();

        let mut levelup = LevelUp::new(Context::in_memory(["gem"]));
        levelup.initialize(model).unwrap();

        for found in [3.0, 4.0] {
            let (level, ctx) = levelup.level_with_context("mine").unwrap();
            level.start(ctx).unwrap();
            level.inc_score("gems_found", found).unwrap();
            level.end(ctx, false).unwrap();
        }
        assert_eq!(levelup.context().inventory().balance("gem").unwrap(), 7);
    }

    #[test]
    fn test_challenge_rewards() {
        let mut world = World::new("w");
        world.add_challenge(
            Challenge::new("first_steps", "First steps").with_reward(Reward::badge("b", "B")),
        );
        let mut model = Model::new();
        model.add_world(world).unwrap();

        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(model).unwrap();

        assert!(levelup.complete_challenge("first_steps").unwrap());
        assert!(!levelup.complete_challenge("first_steps").unwrap());
        assert!(levelup.context().progress().is_reward_owned("b").unwrap());
        assert!(levelup.complete_challenge("nope").unwrap_err().is_lookup());
    }

    #[test]
    fn test_stored_model_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let ctx = Context::new(store.clone(), Arc::new(MemoryInventory::new()));
        let mut levelup = LevelUp::new(ctx);
        levelup.initialize(record_gate_model(100.0)).unwrap();
        play_lvl1(&mut levelup, 120.0);

        let ctx = levelup.into_context();
        let reloaded = LevelUp::from_stored_model(ctx).unwrap();
        assert!(reloaded.world("lvl2").is_some());
        assert!(reloaded.gate("lvl2_record").is_some());
        // Persisted progress survives, runtime state does not
        assert_eq!(
            reloaded.score("points").unwrap().record(reloaded.context()).unwrap(),
            Some(120.0)
        );
        assert_eq!(
            reloaded.world("lvl1").unwrap().as_level().unwrap().state(),
            LevelState::Idle
        );
        assert!(store.exists("levelup.model").unwrap());
    }

    #[test]
    fn test_from_stored_model_missing() {
        let err = LevelUp::from_stored_model(Context::in_memory(Vec::<String>::new())).unwrap_err();
        assert!(matches!(err, LevelUpError::Deserialize { .. }));
    }

    #[test]
    fn test_reset_progress() {
        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(record_gate_model(100.0)).unwrap();
        play_lvl1(&mut levelup, 100.0);
        levelup.try_open_gate("lvl2_record").unwrap();

        assert!(levelup.reset_progress().unwrap() > 0);
        assert!(!levelup.gate("lvl2_record").unwrap().is_open(levelup.context()).unwrap());
        assert!(levelup.score("points").unwrap().record(levelup.context()).unwrap().is_none());
        assert!(!levelup
            .world("lvl1")
            .unwrap()
            .world()
            .is_completed(levelup.context())
            .unwrap());

        // The model is kept
        let ctx = levelup.into_context();
        assert!(LevelUp::from_stored_model(ctx).is_ok());
    }

    #[test]
    fn test_lookups() {
        let mut levelup = LevelUp::new(Context::in_memory(Vec::<String>::new()));
        levelup.initialize(record_gate_model(100.0)).unwrap();

        assert!(levelup.world("main").is_some());
        assert!(levelup.world("lvl1").is_some());
        assert!(levelup.world_mut("lvl2").is_some());
        assert!(levelup.level_mut("main").is_none());
        assert!(levelup.level_mut("lvl1").is_some());
        assert!(levelup.score("points").is_some());
        assert!(levelup.gate("lvl2_gates").is_some());
        assert!(matches!(
            levelup.try_open_gate("nope").unwrap_err(),
            LevelUpError::GateNotFound { .. }
        ));
        assert!(matches!(
            levelup.start_level("nope").unwrap_err(),
            LevelUpError::WorldNotFound { .. }
        ));
    }
}
