//! # Savannah Gameplay
//!
//! Enemy combat core for the Savannah action game.
//!
//! This crate provides the simulation layer behind the Crimson Charger and
//! the player it hunts:
//! - Detection sensor (roaming and target tracking)
//! - Pathfinding driver and kinematic bodies
//! - Charger FSM (roaming, charging, attacking, stunned, dead)
//! - Damage exchange and knockback protocol
//! - Player light combo, heavy attack, dodge dash and hitboxes
//! - Breakable props, potion drops and region triggers
//! - Region registry with checkpoints
//! - Respawn coordinator
//! - Game session and event bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod charger;
pub mod damage;
pub mod detection;
pub mod events;
pub mod hitbox;
pub mod movement;
pub mod player;
pub mod profile;
pub mod props;
pub mod region;
pub mod respawn;
pub mod session;
pub mod spatial;
pub mod timer;
pub mod triggers;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::charger::*;
    pub use crate::damage::*;
    pub use crate::detection::*;
    pub use crate::events::*;
    pub use crate::hitbox::*;
    pub use crate::movement::*;
    pub use crate::player::*;
    pub use crate::profile::*;
    pub use crate::props::*;
    pub use crate::region::*;
    pub use crate::respawn::*;
    pub use crate::session::*;
    pub use crate::spatial::*;
    pub use crate::timer::*;
    pub use crate::triggers::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use savannah_common::{ActorId, RegionKey, Vec2};

    #[test]
    fn test_vitals_damage_and_restore() {
        let mut vitals = Vitals::new(5.0);
        assert_eq!(vitals.apply(2.0), DamageOutcome::Wounded { remaining: 3.0 });
        assert_eq!(vitals.apply(10.0), DamageOutcome::Killed);
        assert!(vitals.is_dead());

        vitals.restore_full();
        assert_eq!(vitals.health(), 5.0);
    }

    #[test]
    fn test_countdown_fires_once() {
        let mut timer = Countdown::running(0.1);
        assert!(!timer.tick(0.05));
        assert!(timer.tick(0.05));
        assert!(!timer.tick(0.05));
        assert!(!timer.is_running());
    }

    #[test]
    fn test_registry_tracks_defeat() {
        let mut registry = RegionRegistry::default();
        let id = ActorId::new();
        registry.register_actor(id, RegionKey::new("Savannah"));

        assert_eq!(registry.record_death(id), Some(RegionKey::new("Savannah")));
        assert!(registry.is_defeated(id));
    }

    #[test]
    fn test_session_starts_clean() {
        let session = GameSession::new(SessionConfig::default(), Vec2::ZERO);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.tick, 0);
        assert!(snapshot.player.alive);
        assert_eq!(snapshot.current_region, RegionKey::new(DEFAULT_START_REGION));
        assert_eq!(snapshot.respawn_point, Vec2::ZERO);
    }
}
