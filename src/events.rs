//! Progression notifications and the synchronous event bus.
//!
//! Events are delivered in-process, synchronously and in the order the
//! triggering state changes happen, before the triggering call returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

/// A notification emitted by the engine or by the in-memory inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LevelUpEvent {
    /// A primitive gate was opened by `try_open`.
    GateOpened { gate_id: String },

    /// A level play session started.
    LevelStarted { level_id: String },

    /// A level play session ended.
    LevelEnded {
        level_id: String,
        /// Play duration in seconds.
        duration: f64,
    },

    /// A world (or level) was marked completed.
    WorldCompleted { world_id: String },

    /// A score's record improved.
    ScoreRecordChanged { score_id: String, record: f64 },

    /// A reward was granted.
    RewardGiven { reward_id: String },

    /// A reward was revoked.
    RewardTaken { reward_id: String },

    /// An inventory balance changed.
    InventoryBalanceChanged {
        item_id: String,
        amount_added: i64,
        balance: i64,
    },
}

impl LevelUpEvent {
    /// Short snake_case name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GateOpened { .. } => "gate_opened",
            Self::LevelStarted { .. } => "level_started",
            Self::LevelEnded { .. } => "level_ended",
            Self::WorldCompleted { .. } => "world_completed",
            Self::ScoreRecordChanged { .. } => "score_record_changed",
            Self::RewardGiven { .. } => "reward_given",
            Self::RewardTaken { .. } => "reward_taken",
            Self::InventoryBalanceChanged { .. } => "inventory_balance_changed",
        }
    }
}

type Listener = Arc<dyn Fn(&LevelUpEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous publish/subscribe channel.
///
/// Cloning the bus yields another handle to the same listener list.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<(SubscriptionId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener called for every published event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&LevelUpEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().len()
    }

    /// Deliver an event to every listener, in subscription order.
    pub fn publish(&self, event: LevelUpEvent) {
        tracing::debug!(event = event.kind(), "publishing {:?}", event);

        // Snapshot so listeners may subscribe or unsubscribe while handling.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }

    /// Subscribe a recorder that keeps every event for the host to drain.
    pub fn record(&self) -> EventRecorder {
        let recorder = EventRecorder::default();
        let sink = recorder.clone();
        self.subscribe(move |event| sink.push(event.clone()));
        recorder
    }
}

/// Event queue filled by the bus and drained by the host.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<LevelUpEvent>>>,
}

impl EventRecorder {
    fn push(&self, event: LevelUpEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<LevelUpEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Copy of the queued events without draining them.
    pub fn events(&self) -> Vec<LevelUpEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}
