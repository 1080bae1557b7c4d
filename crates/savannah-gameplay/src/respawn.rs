//! Delayed player respawn.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::timer::Countdown;

/// Default delay between player death and respawn (seconds).
pub const DEFAULT_RESPAWN_DELAY: f32 = 2.5;

/// Schedules the respawn sequence after the player dies.
///
/// The coordinator only owns the timing. When [`RespawnCoordinator::tick`]
/// reports the delay elapsed, the session moves the player to the
/// registry's respawn point, restores health and resets the current region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespawnCoordinator {
    /// Delay between death and respawn (seconds)
    pub delay: f32,
    pending: Countdown,
    respawns: u32,
}

impl Default for RespawnCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_RESPAWN_DELAY)
    }
}

impl RespawnCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub const fn new(delay: f32) -> Self {
        Self {
            delay,
            pending: Countdown::idle(),
            respawns: 0,
        }
    }

    /// Schedules a respawn. A death reported while one is already pending is
    /// ignored and returns false.
    pub fn on_player_death(&mut self) -> bool {
        if self.pending.is_running() {
            debug!("respawn already pending, death ignored");
            return false;
        }
        info!("player died, respawning in {:.1}s", self.delay);
        self.pending.start(self.delay);
        true
    }

    /// Whether a respawn is scheduled.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_running()
    }

    /// Time until the pending respawn, or zero.
    #[must_use]
    pub fn time_remaining(&self) -> f32 {
        self.pending.remaining()
    }

    /// Number of completed respawns.
    #[must_use]
    pub const fn respawn_count(&self) -> u32 {
        self.respawns
    }

    /// Advances the delay. Returns true on the tick the respawn is due.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.pending.tick(dt) {
            self.respawns += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut respawn = RespawnCoordinator::default();
        assert!(respawn.on_player_death());
        for _ in 0..49 {
            assert!(!respawn.tick(0.05));
        }
        assert!(respawn.tick(0.05));
        assert!(!respawn.is_pending());
        assert_eq!(respawn.respawn_count(), 1);
    }

    #[test]
    fn test_second_death_while_pending_ignored() {
        let mut respawn = RespawnCoordinator::new(1.0);
        assert!(respawn.on_player_death());
        respawn.tick(0.5);
        assert!(!respawn.on_player_death());
        assert!((respawn.time_remaining() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_idle_never_fires() {
        let mut respawn = RespawnCoordinator::default();
        assert!(!respawn.tick(10.0));
        assert_eq!(respawn.respawn_count(), 0);
    }
}
