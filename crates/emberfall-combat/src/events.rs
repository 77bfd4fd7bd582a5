//! Outbound combat events.
//!
//! Collaborators (rendering, audio, network) drain these after each tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use emberfall_common::{EntityId, SkillId};

use crate::buffs::BuffKind;
use crate::monster::AiState;
use crate::player::GatherKind;
use crate::skills::Element;
use crate::stats::Job;

/// Default bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Events emitted by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    /// A hostile entity took damage
    EntityDamaged {
        /// Entity ID
        entity_id: EntityId,
        /// HP after the hit
        new_hp: u32,
        /// Damage removed
        damage: u32,
        /// Whether the hit was critical
        was_critical: bool,
        /// Element tag of the hit
        element: Element,
    },
    /// A hostile entity died
    EntityKilled {
        /// Entity ID
        entity_id: EntityId,
        /// Experience awarded to the local player
        exp_reward: u64,
    },
    /// A hostile entity came back at its spawn anchor
    EntityRespawned {
        /// Entity ID
        entity_id: EntityId,
        /// Spawn X
        x: f32,
        /// Spawn Y
        y: f32,
    },
    /// A hostile entity changed AI state
    EntityStateChanged {
        /// Entity ID
        entity_id: EntityId,
        /// New state
        new_state: AiState,
    },
    /// A monster attack on the player resolved
    PlayerDamaged {
        /// HP after the hit
        new_hp: u32,
        /// Damage taken
        damage: u32,
        /// Whether the hit was evaded
        evaded: bool,
        /// Attacking entity
        source: EntityId,
    },
    /// The player's HP reached zero
    PlayerDefeated,
    /// The player restored HP
    PlayerHealed {
        /// HP after healing
        new_hp: u32,
        /// Amount restored
        amount: u32,
    },
    /// The player restored MP
    PlayerManaRestored {
        /// MP after restoring
        new_mp: u32,
        /// Amount restored
        amount: u32,
    },
    /// The player cast a skill
    SkillUsed {
        /// Skill ID
        skill_id: SkillId,
        /// Aim point X
        target_x: f32,
        /// Aim point Y
        target_y: f32,
    },
    /// The player started a basic attack
    BasicAttackStarted {
        /// Aim heading in radians
        aim: f32,
    },
    /// The player started a dash
    DashStarted {
        /// Direction X
        dir_x: f32,
        /// Direction Y
        dir_y: f32,
    },
    /// A buff was applied
    BuffApplied {
        /// Buff kind
        kind: BuffKind,
        /// Fractional bonus
        magnitude: f32,
        /// Expiry timestamp (ms)
        expires_at_ms: u64,
    },
    /// A buff ran out
    BuffExpired {
        /// Buff kind
        kind: BuffKind,
    },
    /// The player leveled up
    LeveledUp {
        /// New level
        level: u32,
    },
    /// The player changed job
    JobAdvanced {
        /// New job
        job: Job,
    },
    /// A gathering channel finished
    GatheringCompleted {
        /// Channel kind
        kind: GatherKind,
        /// Resource node ID
        node: u64,
    },
    /// A gathering channel was interrupted
    GatheringCancelled {
        /// Channel kind
        kind: GatherKind,
        /// Resource node ID
        node: u64,
    },
}

/// Bounded event channel between the simulation and its readers.
#[derive(Debug)]
pub struct CombatEventBus {
    /// Sender for publishing events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for CombatEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl CombatEventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Drops it with a warning when the bus is full.
    pub fn publish(&self, event: CombatEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            warn!("Combat event bus full, dropping {:?}", event);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new receiver handle for a reader on another thread.
    #[must_use]
    pub fn subscriber(&self) -> Receiver<CombatEvent> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain_in_order() {
        let bus = CombatEventBus::new(8);
        bus.publish(CombatEvent::PlayerDefeated);
        bus.publish(CombatEvent::LeveledUp { level: 2 });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(
            events,
            vec![CombatEvent::PlayerDefeated, CombatEvent::LeveledUp { level: 2 }]
        );
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = CombatEventBus::new(1);
        bus.publish(CombatEvent::PlayerDefeated);
        bus.publish(CombatEvent::LeveledUp { level: 3 });
        assert_eq!(bus.drain(), vec![CombatEvent::PlayerDefeated]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = CombatEvent::EntityKilled {
            entity_id: EntityId::from_raw(4),
            exp_reward: 10,
        };
        let json = serde_json::to_string(&event).expect("serializable");
        assert!(json.contains("\"type\":\"entity_killed\""));
        assert!(json.contains("\"exp_reward\":10"));

        let back: CombatEvent = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, event);
    }
}
