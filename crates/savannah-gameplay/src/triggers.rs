//! Region-boundary trigger volumes.

use serde::{Deserialize, Serialize};

use savannah_common::{RegionKey, Vec2};

use crate::spatial::Aabb;

/// A volume that announces entry into a region.
///
/// Fires once each time the player crosses into it, not while standing
/// inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionTrigger {
    /// Region being entered
    pub region: RegionKey,
    /// Trigger volume
    pub bounds: Aabb,
    /// Respawn position to record; the volume's center when absent
    pub checkpoint: Option<Vec2>,
    #[serde(skip)]
    occupied: bool,
}

impl RegionTrigger {
    /// Creates a trigger that records its own center as the checkpoint.
    #[must_use]
    pub fn new(region: RegionKey, bounds: Aabb) -> Self {
        Self {
            region,
            bounds,
            checkpoint: None,
            occupied: false,
        }
    }

    /// Uses an explicit checkpoint position.
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Vec2) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Respawn position this trigger records.
    #[must_use]
    pub fn checkpoint_position(&self) -> Vec2 {
        self.checkpoint.unwrap_or_else(|| self.bounds.center())
    }

    /// Updates occupancy for a player box. Returns true on entry.
    pub fn observe(&mut self, player_bounds: &Aabb) -> bool {
        let inside = self.bounds.overlaps(player_bounds);
        let entered = inside && !self.occupied;
        self.occupied = inside;
        entered
    }

    /// Forgets occupancy, so the next observation inside counts as entry.
    pub fn clear_occupancy(&mut self) {
        self.occupied = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_at(x: f32) -> Aabb {
        Aabb::from_center(Vec2::new(x, 0.0), Vec2::splat(0.4))
    }

    #[test]
    fn test_fires_on_entry_edge_only() {
        let mut trigger = RegionTrigger::new(
            RegionKey::new("Canyon"),
            Aabb::from_center(Vec2::new(10.0, 0.0), Vec2::splat(1.0)),
        );
        assert!(!trigger.observe(&player_at(0.0)));
        assert!(trigger.observe(&player_at(10.0)));
        assert!(!trigger.observe(&player_at(10.2)));
        assert!(!trigger.observe(&player_at(0.0)));
        assert!(trigger.observe(&player_at(9.5)));
    }

    #[test]
    fn test_checkpoint_defaults_to_center() {
        let bounds = Aabb::from_center(Vec2::new(4.0, 2.0), Vec2::ONE);
        let trigger = RegionTrigger::new(RegionKey::new("Canyon"), bounds);
        assert_eq!(trigger.checkpoint_position(), Vec2::new(4.0, 2.0));
        let trigger = trigger.with_checkpoint(Vec2::new(3.0, 3.0));
        assert_eq!(trigger.checkpoint_position(), Vec2::new(3.0, 3.0));
    }
}
