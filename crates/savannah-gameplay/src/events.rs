//! Event bus for presentation-layer notifications.
//!
//! The combat core publishes what happened (state changes, hits, deaths,
//! respawns) for animation, audio and UI to react to. Publishing never
//! blocks and works with no consumer attached.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use savannah_common::{ActorId, RegionKey, Vec2};

use crate::charger::ChargerState;

/// Events published by the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A charger changed FSM state
    StateChanged {
        /// Charger
        actor: ActorId,
        /// Previous state
        from: ChargerState,
        /// New state
        to: ChargerState,
    },
    /// A defender lost health
    Damaged {
        /// Who was hit
        target: ActorId,
        /// Who dealt the damage (if known)
        source: Option<ActorId>,
        /// Damage amount
        amount: f32,
        /// Health left
        remaining: f32,
    },
    /// A defender was knocked back
    KnockedBack {
        /// Who was pushed
        target: ActorId,
        /// Unit push direction
        direction: Vec2,
    },
    /// A charger died
    Died {
        /// Charger
        actor: ActorId,
        /// Region it belonged to
        region: Option<RegionKey>,
    },
    /// A dead charger was removed from the world
    Despawned {
        /// Charger
        actor: ActorId,
    },
    /// The player died
    PlayerDied {
        /// Player
        player: ActorId,
    },
    /// The player was moved back to the last checkpoint
    PlayerRespawned {
        /// Player
        player: ActorId,
        /// Respawn position
        position: Vec2,
        /// Region whose enemies were reset
        region: RegionKey,
    },
    /// The actors of a region were reset
    RegionReset {
        /// Region reset, or `None` for the global fallback
        region: Option<RegionKey>,
        /// Number of actors revived or reset
        actors: usize,
    },
    /// A new checkpoint was reached
    CheckpointReached {
        /// Region entered
        region: RegionKey,
        /// New respawn position
        position: Vec2,
    },
    /// A breakable prop broke
    PropBroken {
        /// Prop
        prop: ActorId,
        /// Whether it drops a potion
        drops_potion: bool,
    },
    /// A broken prop left a potion on the ground
    PotionDropped {
        /// Pickup
        potion: ActorId,
        /// Where it lies
        position: Vec2,
    },
    /// The player picked up a potion
    PotionCollected {
        /// Player
        player: ActorId,
        /// Pickup
        potion: ActorId,
        /// Potions now carried
        carried: u8,
    },
    /// The player drank a potion
    PotionUsed {
        /// Player
        player: ActorId,
        /// Health restored
        healed: f32,
        /// Potions left
        carried: u8,
    },
    /// The player started a dodge dash
    Dashed {
        /// Player
        player: ActorId,
        /// Unit dash direction
        direction: Vec2,
    },
    /// A player attack hitbox was spawned
    HitboxSpawned {
        /// Attacker
        owner: ActorId,
        /// Damage the hitbox deals
        damage: f32,
        /// Hitbox center at spawn
        center: Vec2,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Publishes an event. Dropped if the bus is full.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
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

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}
