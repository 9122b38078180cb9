//! The model document: every root world of a game.
//!
//! ```json
//! {"worlds": [{"type": "world", "worldId": "main", "innerWorlds": [...]}]}
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::{Gate, GatesList, Openable, Reward, RewardKind, World, WorldNode};
use crate::error::{LevelUpError, Result};
use crate::util::{insert_keyed, keyed_map};

/// Root worlds keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default, with = "keyed_map")]
    worlds: BTreeMap<String, WorldNode>,
}

/// Entity counts of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub worlds: usize,
    pub levels: usize,
    pub scores: usize,
    pub gates: usize,
    pub challenges: usize,
    pub rewards: usize,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root world. Fails on a duplicate id.
    pub fn add_world(&mut self, world: impl Into<WorldNode>) -> Result<()> {
        insert_keyed(&mut self.worlds, world.into())
    }

    /// Parse and validate a model document.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Model = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn worlds(&self) -> &BTreeMap<String, WorldNode> {
        &self.worlds
    }

    pub(crate) fn into_worlds(self) -> BTreeMap<String, WorldNode> {
        self.worlds
    }

    /// Every world and level, depth first.
    pub fn all_worlds(&self) -> Vec<&WorldNode> {
        let mut out = Vec::new();
        for node in self.worlds.values() {
            collect_worlds(node, &mut out);
        }
        out
    }

    /// Check cross-references and tree-wide id uniqueness.
    ///
    /// World, score and gate ids must be unique across the whole tree.
    /// Record gates must name a known score and world-completion gates a
    /// known world.
    pub fn validate(&self) -> Result<()> {
        let nodes = self.all_worlds();

        let mut world_ids = HashSet::new();
        let mut score_ids = HashSet::new();
        let mut gate_ids = HashSet::new();
        for node in &nodes {
            unique(&mut world_ids, node.world_id(), "world")?;
            for score_id in node.world().scores().keys() {
                unique(&mut score_ids, score_id, "score")?;
            }
            if let Some(list) = node.world().gate() {
                for gate in list_gates(list) {
                    unique(&mut gate_ids, gate.gate_id(), "gate")?;
                }
            }
        }

        for node in &nodes {
            let Some(list) = node.world().gate() else {
                continue;
            };
            for gate in list_gates(list) {
                match gate {
                    GateRef::Leaf(Gate::Record(g))
                        if !score_ids.contains(g.associated_score_id.as_str()) =>
                    {
                        return Err(LevelUpError::score_not_found(&g.associated_score_id));
                    }
                    GateRef::Leaf(Gate::WorldCompletion(g))
                        if !world_ids.contains(g.associated_world_id.as_str()) =>
                    {
                        return Err(LevelUpError::world_not_found(&g.associated_world_id));
                    }
                    GateRef::Leaf(Gate::Balance(g)) if g.desired_balance < 0 => {
                        return Err(LevelUpError::deserialize(format!(
                            "gate `{}`: desiredBalance must not be negative, got {}",
                            g.gate_id, g.desired_balance
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> ModelSummary {
        let mut summary = ModelSummary::default();
        for node in self.all_worlds() {
            match node {
                WorldNode::World(_) => summary.worlds += 1,
                WorldNode::Level(_) => summary.levels += 1,
            }
            let world: &World = node.world();
            summary.scores += world.scores().len();
            summary.challenges += world.challenges().len();
            if let Some(list) = world.gate() {
                summary.gates += list_gates(list).len();
            }
            for challenge in world.challenges() {
                for reward in challenge.rewards() {
                    summary.rewards += count_rewards(reward);
                }
            }
        }
        summary
    }
}

fn unique<'a>(seen: &mut HashSet<&'a str>, id: &'a str, what: &str) -> Result<()> {
    if !seen.insert(id) {
        return Err(LevelUpError::deserialize(format!(
            "duplicate {} id `{}`",
            what, id
        )));
    }
    Ok(())
}

fn collect_worlds<'a>(node: &'a WorldNode, out: &mut Vec<&'a WorldNode>) {
    out.push(node);
    for inner in node.world().inner_worlds() {
        collect_worlds(inner, out);
    }
}

/// A gate list or one of its descendants.
pub(crate) enum GateRef<'a> {
    List(&'a GatesList),
    Leaf(&'a Gate),
}

impl<'a> GateRef<'a> {
    pub(crate) fn gate_id(&self) -> &'a str {
        match *self {
            GateRef::List(list) => list.gate_id(),
            GateRef::Leaf(gate) => gate.gate_id(),
        }
    }

    pub(crate) fn as_openable(&self) -> &'a dyn Openable {
        match *self {
            GateRef::List(list) => list as &dyn Openable,
            GateRef::Leaf(gate) => gate as &dyn Openable,
        }
    }
}

/// The list itself followed by every descendant gate, depth first.
pub(crate) fn list_gates(list: &GatesList) -> Vec<GateRef<'_>> {
    let mut out = vec![GateRef::List(list)];
    for gate in list.gates() {
        match gate {
            Gate::List(inner) => out.extend(list_gates(inner)),
            leaf => out.push(GateRef::Leaf(leaf)),
        }
    }
    out
}

fn count_rewards(reward: &Reward) -> usize {
    match reward.kind() {
        RewardKind::Random { rewards } | RewardKind::Sequence { rewards } => {
            1 + rewards.iter().map(count_rewards).sum::<usize>()
        }
        _ => 1,
    }
}
