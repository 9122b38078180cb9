//! Gates guarding access to worlds and levels.
//!
//! Primitive gates (record, balance, world completion) persist a monotonic
//! open flag. A [`GatesList`] combines child gates with AND/OR and derives
//! its own state from them; only primitive gates ever write to storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::core::score::ScoreLookup;
use crate::error::{LevelUpError, Result};
use crate::events::LevelUpEvent;

/// Behavior shared by primitive gates and gate lists.
pub trait Openable {
    fn gate_id(&self) -> &str;

    /// Whether the gate is open. Never writes.
    fn is_open(&self, ctx: &Context) -> Result<bool>;

    /// Whether the gate's condition currently holds. Never writes.
    fn can_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool>;

    /// Open the gate if its condition holds.
    ///
    /// Returns `true` when the gate is open afterwards. An already-open gate
    /// returns `true` without touching storage.
    fn try_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool>;
}

/// Opens when a score's record reaches `desired_record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordGate {
    pub gate_id: String,
    pub associated_score_id: String,
    pub desired_record: f64,
}

/// Opens when an inventory balance reaches `desired_balance`.
///
/// Opening takes `desired_balance` units of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceGate {
    pub gate_id: String,
    pub associated_item_id: String,
    pub desired_balance: i64,
}

/// Opens once another world has been completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldCompletionGate {
    pub gate_id: String,
    pub associated_world_id: String,
}

/// How a [`GatesList`] combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperator {
    And,
    Or,
}

/// A composite gate over ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GateDocument", into = "GateDocument")]
pub struct GatesList {
    gate_id: String,
    operator: ListOperator,
    gates: Vec<Gate>,
}

/// Any gate, as found in a model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GateDocument", into = "GateDocument")]
pub enum Gate {
    List(GatesList),
    Record(RecordGate),
    Balance(BalanceGate),
    WorldCompletion(WorldCompletionGate),
}

/// Wire form of gates, dispatched on `type`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum GateDocument {
    #[serde(rename = "listAND")]
    ListAnd(ListDocument),
    #[serde(rename = "listOR")]
    ListOr(ListDocument),
    #[serde(rename = "record")]
    Record(RecordGate),
    #[serde(rename = "balance")]
    Balance(BalanceGate),
    #[serde(rename = "worldCompletion")]
    WorldCompletion(WorldCompletionGate),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocument {
    gate_id: String,
    #[serde(default)]
    gates: Vec<Gate>,
}

impl From<GateDocument> for Gate {
    fn from(doc: GateDocument) -> Self {
        match doc {
            GateDocument::ListAnd(list) => Gate::List(GatesList::and(list.gate_id, list.gates)),
            GateDocument::ListOr(list) => Gate::List(GatesList::or(list.gate_id, list.gates)),
            GateDocument::Record(gate) => Gate::Record(gate),
            GateDocument::Balance(gate) => Gate::Balance(gate),
            GateDocument::WorldCompletion(gate) => Gate::WorldCompletion(gate),
        }
    }
}

impl From<Gate> for GateDocument {
    fn from(gate: Gate) -> Self {
        match gate {
            Gate::List(list) => list.into(),
            Gate::Record(gate) => GateDocument::Record(gate),
            Gate::Balance(gate) => GateDocument::Balance(gate),
            Gate::WorldCompletion(gate) => GateDocument::WorldCompletion(gate),
        }
    }
}

impl TryFrom<GateDocument> for GatesList {
    type Error = String;

    fn try_from(doc: GateDocument) -> std::result::Result<Self, Self::Error> {
        match Gate::from(doc) {
            Gate::List(list) => Ok(list),
            other => Err(format!(
                "expected a gate list (listAND or listOR), found `{}` gate `{}`",
                other.type_name(),
                other.gate_id()
            )),
        }
    }
}

impl From<GatesList> for GateDocument {
    fn from(list: GatesList) -> Self {
        let doc = ListDocument {
            gate_id: list.gate_id,
            gates: list.gates,
        };
        match list.operator {
            ListOperator::And => GateDocument::ListAnd(doc),
            ListOperator::Or => GateDocument::ListOr(doc),
        }
    }
}

impl From<GatesList> for Gate {
    fn from(list: GatesList) -> Self {
        Gate::List(list)
    }
}

impl Gate {
    pub fn record(
        gate_id: impl Into<String>,
        score_id: impl Into<String>,
        desired_record: f64,
    ) -> Self {
        Gate::Record(RecordGate {
            gate_id: gate_id.into(),
            associated_score_id: score_id.into(),
            desired_record,
        })
    }

    pub fn balance(
        gate_id: impl Into<String>,
        item_id: impl Into<String>,
        desired_balance: i64,
    ) -> Self {
        Gate::Balance(BalanceGate {
            gate_id: gate_id.into(),
            associated_item_id: item_id.into(),
            desired_balance,
        })
    }

    pub fn world_completion(gate_id: impl Into<String>, world_id: impl Into<String>) -> Self {
        Gate::WorldCompletion(WorldCompletionGate {
            gate_id: gate_id.into(),
            associated_world_id: world_id.into(),
        })
    }

    /// The `type` discriminator used in model documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Gate::List(list) => match list.operator {
                ListOperator::And => "listAND",
                ListOperator::Or => "listOR",
            },
            Gate::Record(_) => "record",
            Gate::Balance(_) => "balance",
            Gate::WorldCompletion(_) => "worldCompletion",
        }
    }

    /// Find this gate or a descendant by id.
    pub fn find(&self, gate_id: &str) -> Option<&dyn Openable> {
        match self {
            Gate::List(list) => list.find(gate_id),
            leaf if leaf.gate_id() == gate_id => Some(leaf as &dyn Openable),
            _ => None,
        }
    }

    /// `can_open` as seen by a list that pays for its children in order.
    ///
    /// `spent` holds the balance already claimed by earlier siblings, per
    /// item. A closed balance gate that can still be paid adds its cost.
    fn can_open_after(
        &self,
        ctx: &Context,
        scores: &dyn ScoreLookup,
        spent: &mut BTreeMap<String, i64>,
    ) -> Result<bool> {
        match self {
            Gate::List(list) => list.can_open_after(ctx, scores, spent),
            Gate::Balance(gate) => {
                if self.is_open(ctx)? {
                    return Ok(true);
                }
                let claimed = spent.get(&gate.associated_item_id).copied().unwrap_or(0);
                let available = ctx
                    .inventory()
                    .balance(&gate.associated_item_id)?
                    .saturating_sub(claimed);
                if available < gate.desired_balance {
                    return Ok(false);
                }
                spent.insert(
                    gate.associated_item_id.clone(),
                    claimed.saturating_add(gate.desired_balance),
                );
                Ok(true)
            }
            leaf => Ok(leaf.is_open(ctx)? || leaf.can_open(ctx, scores)?),
        }
    }

    fn open_leaf(&self, ctx: &Context) -> Result<()> {
        if let Gate::Balance(gate) = self {
            ctx.inventory()
                .take(&gate.associated_item_id, gate.desired_balance)?;
        }

        let gate_id = self.gate_id();
        ctx.progress().set_gate_open(gate_id, true)?;
        tracing::debug!(gate_id = %gate_id, kind = self.type_name(), "gate opened");
        ctx.publish(LevelUpEvent::GateOpened {
            gate_id: gate_id.to_string(),
        });
        Ok(())
    }
}

impl Openable for Gate {
    fn gate_id(&self) -> &str {
        match self {
            Gate::List(list) => &list.gate_id,
            Gate::Record(gate) => &gate.gate_id,
            Gate::Balance(gate) => &gate.gate_id,
            Gate::WorldCompletion(gate) => &gate.gate_id,
        }
    }

    fn is_open(&self, ctx: &Context) -> Result<bool> {
        match self {
            Gate::List(list) => list.is_open(ctx),
            leaf => ctx.progress().is_gate_open(leaf.gate_id()),
        }
    }

    fn can_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool> {
        match self {
            Gate::List(list) => list.can_open(ctx, scores),
            Gate::Record(gate) => {
                let score = scores
                    .find_score(&gate.associated_score_id)
                    .ok_or_else(|| LevelUpError::score_not_found(&gate.associated_score_id))?;
                score.has_record_reached(gate.desired_record, ctx)
            }
            Gate::Balance(gate) => {
                Ok(ctx.inventory().balance(&gate.associated_item_id)? >= gate.desired_balance)
            }
            Gate::WorldCompletion(gate) => {
                ctx.progress().is_world_completed(&gate.associated_world_id)
            }
        }
    }

    fn try_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool> {
        if let Gate::List(list) = self {
            return list.try_open(ctx, scores);
        }
        if self.is_open(ctx)? {
            return Ok(true);
        }
        if !self.can_open(ctx, scores)? {
            return Ok(false);
        }
        self.open_leaf(ctx)?;
        Ok(true)
    }
}

impl GatesList {
    /// A list that is open when every child is open.
    pub fn and(gate_id: impl Into<String>, gates: Vec<Gate>) -> Self {
        Self {
            gate_id: gate_id.into(),
            operator: ListOperator::And,
            gates,
        }
    }

    /// A list that is open when any child is open.
    pub fn or(gate_id: impl Into<String>, gates: Vec<Gate>) -> Self {
        Self {
            gate_id: gate_id.into(),
            operator: ListOperator::Or,
            gates,
        }
    }

    pub fn operator(&self) -> ListOperator {
        self.operator
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Append a child gate.
    pub fn push(&mut self, gate: impl Into<Gate>) {
        self.gates.push(gate.into());
    }

    /// Find this list or a descendant by id.
    pub fn find(&self, gate_id: &str) -> Option<&dyn Openable> {
        if self.gate_id == gate_id {
            return Some(self as &dyn Openable);
        }
        self.gates.iter().find_map(|gate| gate.find(gate_id))
    }

    /// Mirror of `try_open` that only tracks what opening would cost.
    ///
    /// AND needs every closed child payable after its earlier siblings. OR
    /// tries each closed child on its own copy of `spent` and keeps the
    /// claims of those that succeed, like `try_open` opening all of them.
    fn can_open_after(
        &self,
        ctx: &Context,
        scores: &dyn ScoreLookup,
        spent: &mut BTreeMap<String, i64>,
    ) -> Result<bool> {
        if self.is_open(ctx)? {
            return Ok(true);
        }
        match self.operator {
            ListOperator::And => {
                for gate in &self.gates {
                    if !gate.can_open_after(ctx, scores, spent)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ListOperator::Or => {
                let mut any = false;
                for gate in &self.gates {
                    let mut claims = spent.clone();
                    if gate.can_open_after(ctx, scores, &mut claims)? {
                        *spent = claims;
                        any = true;
                    }
                }
                Ok(any)
            }
        }
    }

    /// Combine child results with the list operator, short-circuiting.
    fn combine(&self, mut check: impl FnMut(&Gate) -> Result<bool>) -> Result<bool> {
        match self.operator {
            ListOperator::And => {
                for gate in &self.gates {
                    if !check(gate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ListOperator::Or => {
                for gate in &self.gates {
                    if check(gate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl Openable for GatesList {
    fn gate_id(&self) -> &str {
        &self.gate_id
    }

    fn is_open(&self, ctx: &Context) -> Result<bool> {
        self.combine(|gate| gate.is_open(ctx))
    }

    /// Balance gates on the same item are charged together, so a list only
    /// reports `true` when the inventory covers every payment it would make.
    fn can_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool> {
        self.can_open_after(ctx, scores, &mut BTreeMap::new())
    }

    fn try_open(&self, ctx: &Context, scores: &dyn ScoreLookup) -> Result<bool> {
        if self.is_open(ctx)? {
            return Ok(true);
        }
        if !self.can_open(ctx, scores)? {
            return Ok(false);
        }
        for gate in &self.gates {
            if !gate.is_open(ctx)? {
                gate.try_open(ctx, scores)?;
            }
        }
        self.is_open(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::score::Score;
    use std::collections::BTreeMap;

    fn ctx() -> Context {
        Context::in_memory(["gem"])
    }

    fn no_scores() -> BTreeMap<String, Score> {
        BTreeMap::new()
    }

    #[test]
    fn test_empty_lists() {
        let ctx = ctx();
        assert!(GatesList::and("and", vec![]).is_open(&ctx).unwrap());
        assert!(!GatesList::or("or", vec![]).is_open(&ctx).unwrap());
    }

    #[test]
    fn test_world_completion_gate() {
        let ctx = ctx();
        let scores = no_scores();
        let gate = Gate::world_completion("wc", "world_a");

        assert!(!gate.can_open(&ctx, &scores).unwrap());
        assert!(!gate.try_open(&ctx, &scores).unwrap());
        assert!(!gate.is_open(&ctx).unwrap());

        ctx.progress().set_world_completed("world_a", true).unwrap();
        assert!(gate.try_open(&ctx, &scores).unwrap());
        assert!(gate.is_open(&ctx).unwrap());
    }

    #[test]
    fn test_try_open_is_idempotent_and_notifies_once() {
        let ctx = ctx();
        let recorder = ctx.bus().record();
        let scores = no_scores();
        let gate = Gate::world_completion("wc", "world_a");
        ctx.progress().set_world_completed("world_a", true).unwrap();

        assert!(gate.try_open(&ctx, &scores).unwrap());
        assert!(gate.try_open(&ctx, &scores).unwrap());
        assert_eq!(
            recorder.drain(),
            vec![LevelUpEvent::GateOpened {
                gate_id: "wc".to_string()
            }]
        );
    }

    #[test]
    fn test_open_flag_is_monotonic() {
        let ctx = ctx();
        let scores = no_scores();
        let gate = Gate::world_completion("wc", "world_a");
        ctx.progress().set_world_completed("world_a", true).unwrap();
        gate.try_open(&ctx, &scores).unwrap();

        // The condition no longer holding does not close the gate
        ctx.progress().set_world_completed("world_a", false).unwrap();
        assert!(gate.is_open(&ctx).unwrap());
        assert!(!gate.can_open(&ctx, &scores).unwrap());
    }

    #[test]
    fn test_record_gate() {
        let ctx = ctx();
        let mut score = Score::new("s1", "S1", true);
        let gate = Gate::record("rg", "s1", 100.0);

        score.set_temp_score(99.0);
        score.save_and_reset(&ctx).unwrap();
        let mut scores = BTreeMap::new();
        scores.insert("s1".to_string(), score.clone());
        assert!(!gate.can_open(&ctx, &scores).unwrap());

        score.set_temp_score(100.0);
        score.save_and_reset(&ctx).unwrap();
        assert!(gate.can_open(&ctx, &scores).unwrap());
        assert!(gate.try_open(&ctx, &scores).unwrap());
    }

    #[test]
    fn test_record_gate_unknown_score() {
        let ctx = ctx();
        let gate = Gate::record("rg", "missing", 1.0);
        let err = gate.can_open(&ctx, &no_scores()).unwrap_err();
        assert!(matches!(err, LevelUpError::ScoreNotFound { .. }));
    }

    #[test]
    fn test_balance_gate_consumes_items() {
        let ctx = ctx();
        let scores = no_scores();
        let gate = Gate::balance("bg", "gem", 5);

        ctx.inventory().give("gem", 4).unwrap();
        assert!(!gate.try_open(&ctx, &scores).unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 4);

        ctx.inventory().give("gem", 3).unwrap();
        assert!(gate.try_open(&ctx, &scores).unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 2);

        // Already open: no second payment
        assert!(gate.try_open(&ctx, &scores).unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 2);
    }

    #[test]
    fn test_balance_gate_unknown_item() {
        let ctx = ctx();
        let gate = Gate::balance("bg", "unknown", 1);
        let err = gate.try_open(&ctx, &no_scores()).unwrap_err();
        assert!(matches!(err, LevelUpError::ItemNotFound { .. }));
        assert!(!ctx.progress().is_gate_open("bg").unwrap());
    }

    #[test]
    fn test_and_list_charges_shared_item_once_per_gate() {
        let ctx = ctx();
        let scores = no_scores();
        let list = GatesList::and(
            "list",
            vec![Gate::balance("a", "gem", 5), Gate::balance("b", "gem", 5)],
        );

        ctx.inventory().give("gem", 5).unwrap();
        assert!(!list.can_open(&ctx, &scores).unwrap());
        assert!(!list.try_open(&ctx, &scores).unwrap());
        assert!(!ctx.progress().is_gate_open("a").unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 5);

        ctx.inventory().give("gem", 6).unwrap();
        assert!(list.can_open(&ctx, &scores).unwrap());
        assert!(list.try_open(&ctx, &scores).unwrap());
        assert!(ctx.progress().is_gate_open("b").unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 1);
    }

    #[test]
    fn test_nested_or_claims_count_against_and_siblings() {
        let ctx = ctx();
        let scores = no_scores();
        let inner = GatesList::or("inner", vec![Gate::balance("a", "gem", 3)]);
        let list = GatesList::and("list", vec![inner.into(), Gate::balance("b", "gem", 3)]);

        ctx.inventory().give("gem", 4).unwrap();
        assert!(!list.can_open(&ctx, &scores).unwrap());

        // Once the inner gate is paid for, only the outer payment remains
        ctx.inventory().give("gem", 2).unwrap();
        assert!(Gate::balance("a", "gem", 3).try_open(&ctx, &scores).unwrap());
        assert!(list.can_open(&ctx, &scores).unwrap());
        assert!(list.try_open(&ctx, &scores).unwrap());
        assert_eq!(ctx.inventory().balance("gem").unwrap(), 0);
    }

    #[test]
    fn test_and_list_requires_all() {
        let ctx = ctx();
        let scores = no_scores();
        let list = GatesList::and(
            "list",
            vec![
                Gate::world_completion("g1", "w1"),
                Gate::world_completion("g2", "w2"),
            ],
        );

        ctx.progress().set_world_completed("w1", true).unwrap();
        assert!(!list.can_open(&ctx, &scores).unwrap());
        // No partial opening when the list cannot open
        assert!(!list.try_open(&ctx, &scores).unwrap());
        assert!(!ctx.progress().is_gate_open("g1").unwrap());

        ctx.progress().set_world_completed("w2", true).unwrap();
        assert!(list.try_open(&ctx, &scores).unwrap());
        assert!(ctx.progress().is_gate_open("g1").unwrap());
        assert!(ctx.progress().is_gate_open("g2").unwrap());
    }

    #[test]
    fn test_or_list_opens_satisfiable_children() {
        let ctx = ctx();
        let scores = no_scores();
        let list = GatesList::or(
            "list",
            vec![
                Gate::world_completion("g1", "w1"),
                Gate::world_completion("g2", "w2"),
            ],
        );

        assert!(!list.is_open(&ctx).unwrap());
        ctx.progress().set_world_completed("w2", true).unwrap();
        assert!(list.try_open(&ctx, &scores).unwrap());
        assert!(!ctx.progress().is_gate_open("g1").unwrap());
        assert!(ctx.progress().is_gate_open("g2").unwrap());
    }

    #[test]
    fn test_list_never_persists_own_state() {
        let ctx = ctx();
        let scores = no_scores();
        let list = GatesList::and("list", vec![Gate::world_completion("g1", "w1")]);
        ctx.progress().set_world_completed("w1", true).unwrap();
        list.try_open(&ctx, &scores).unwrap();
        assert!(!ctx.progress().is_gate_open("list").unwrap());
    }

    #[test]
    fn test_find_nested() {
        let inner = GatesList::or("inner", vec![Gate::record("rg", "s", 1.0)]);
        let outer = GatesList::and("outer", vec![inner.into(), Gate::balance("bg", "gem", 1)]);

        assert_eq!(outer.find("outer").unwrap().gate_id(), "outer");
        assert_eq!(outer.find("inner").unwrap().gate_id(), "inner");
        assert_eq!(outer.find("rg").unwrap().gate_id(), "rg");
        assert!(outer.find("nope").is_none());
    }

    #[test]
    fn test_json_dispatch() {
        let json = r#"{
            "type": "listOR",
            "gateId": "top",
            "gates": [
                {"type": "record", "gateId": "rg", "associatedScoreId": "s", "desiredRecord": 10.0},
                {"type": "balance", "gateId": "bg", "associatedItemId": "gem", "desiredBalance": 3},
                {"type": "worldCompletion", "gateId": "wc", "associatedWorldId": "w"},
                {"type": "listAND", "gateId": "nested"}
            ]
        }"#;
        let list: GatesList = serde_json::from_str(json).unwrap();
        assert_eq!(list.operator(), ListOperator::Or);
        assert_eq!(list.len(), 4);
        assert_eq!(list.gates()[1].type_name(), "balance");
        assert!(matches!(&list.gates()[3], Gate::List(l) if l.is_empty()));

        let back: GatesList = serde_json::from_str(&serde_json::to_string(&list).unwrap()).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn test_json_unknown_type() {
        let err = serde_json::from_str::<Gate>(r#"{"type":"magic","gateId":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_json_leaf_is_not_a_list() {
        let json = r#"{"type":"worldCompletion","gateId":"wc","associatedWorldId":"w"}"#;
        assert!(serde_json::from_str::<GatesList>(json).is_err());
        assert!(serde_json::from_str::<Gate>(json).is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn list_with_open_children(
            ctx: &Context,
            open: &[bool],
            operator: ListOperator,
        ) -> GatesList {
            let gates = open
                .iter()
                .enumerate()
                .map(|(i, is_open)| {
                    let id = format!("g{}", i);
                    if *is_open {
                        ctx.progress().set_gate_open(&id, true).unwrap();
                    }
                    Gate::world_completion(id, format!("w{}", i))
                })
                .collect();
            match operator {
                ListOperator::And => GatesList::and("list", gates),
                ListOperator::Or => GatesList::or("list", gates),
            }
        }

        proptest! {
            // Property: AND is open iff every child is open
            #[test]
            fn prop_and_is_all(open in proptest::collection::vec(any::<bool>(), 0..8)) {
                let ctx = Context::in_memory(Vec::<String>::new());
                let list = list_with_open_children(&ctx, &open, ListOperator::And);
                prop_assert_eq!(list.is_open(&ctx).unwrap(), open.iter().all(|o| *o));
            }

            // Property: OR is open iff some child is open
            #[test]
            fn prop_or_is_any(open in proptest::collection::vec(any::<bool>(), 0..8)) {
                let ctx = Context::in_memory(Vec::<String>::new());
                let list = list_with_open_children(&ctx, &open, ListOperator::Or);
                prop_assert_eq!(list.is_open(&ctx).unwrap(), open.iter().any(|o| *o));
            }

            // Property: try_open never closes anything and reports the derived state
            #[test]
            fn prop_try_open_reports_state(
                open in proptest::collection::vec(any::<bool>(), 0..8),
                completed in proptest::collection::vec(any::<bool>(), 8),
                and in any::<bool>(),
            ) {
                let ctx = Context::in_memory(Vec::<String>::new());
                let operator = if and { ListOperator::And } else { ListOperator::Or };
                let list = list_with_open_children(&ctx, &open, operator);
                for (i, done) in completed.iter().enumerate() {
                    ctx.progress().set_world_completed(&format!("w{}", i), *done).unwrap();
                }
                let scores = BTreeMap::<String, Score>::new();

                let result = list.try_open(&ctx, &scores).unwrap();
                prop_assert_eq!(result, list.is_open(&ctx).unwrap());
                for (i, was_open) in open.iter().enumerate() {
                    if *was_open {
                        let gate_id = format!("g{}", i);
                        prop_assert!(ctx.progress().is_gate_open(&gate_id).unwrap());
                    }
                }
            }
        }
    }
}
