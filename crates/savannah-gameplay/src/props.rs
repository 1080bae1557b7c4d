//! Breakable props (pots, crates) and the potions they drop.

use serde::{Deserialize, Serialize};

use savannah_common::{ActorId, Vec2};

use crate::damage::{DamageOutcome, Defender};
use crate::spatial::Aabb;

/// A prop that breaks after enough hits.
///
/// Hit points are whole numbers; incoming damage is rounded up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakable {
    /// Prop ID
    pub id: ActorId,
    /// World position
    pub position: Vec2,
    /// Collider half-extents
    pub half_extents: Vec2,
    /// Whether breaking it drops a potion
    pub drops_potion: bool,
    hit_points: i32,
    broken: bool,
}

impl Breakable {
    /// Creates a prop with one hit point.
    #[must_use]
    pub fn new(position: Vec2, drops_potion: bool) -> Self {
        Self {
            id: ActorId::new(),
            position,
            half_extents: Vec2::splat(0.4),
            drops_potion,
            hit_points: 1,
            broken: false,
        }
    }

    /// Sets starting hit points.
    #[must_use]
    pub fn with_hit_points(mut self, hit_points: i32) -> Self {
        self.hit_points = hit_points.max(1);
        self
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn hit_points(&self) -> i32 {
        self.hit_points
    }

    /// Whether the prop has broken.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }

    /// Collider bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }
}

/// A potion lying on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotionPickup {
    /// Pickup ID
    pub id: ActorId,
    /// World position
    pub position: Vec2,
}

impl PotionPickup {
    /// Drops a potion at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            id: ActorId::new(),
            position,
        }
    }

    /// Whether a collector at `center` reaches this potion.
    #[must_use]
    pub fn within(&self, center: Vec2, radius: f32) -> bool {
        self.position.distance_squared(center) <= radius * radius
    }
}

impl Defender for Breakable {
    fn actor_id(&self) -> ActorId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.broken
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.broken {
            return DamageOutcome::Ignored;
        }
        let whole = amount.ceil().min(i32::MAX as f32) as i32;
        self.hit_points = self.hit_points.saturating_sub(whole);
        if self.hit_points <= 0 {
            self.hit_points = 0;
            self.broken = true;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded {
                remaining: self.hit_points as f32,
            }
        }
    }

    fn receive_knockback(&mut self, _direction: Vec2) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::{apply_damage, apply_knockback};

    #[test]
    fn test_fractional_damage_rounds_up() {
        let mut pot = Breakable::new(Vec2::ZERO, true).with_hit_points(3);
        assert_eq!(
            apply_damage(&mut pot, 0.5),
            DamageOutcome::Wounded { remaining: 2.0 }
        );
        assert_eq!(apply_damage(&mut pot, 1.2), DamageOutcome::Killed);
        assert!(pot.is_broken());
        assert_eq!(pot.hit_points(), 0);
    }

    #[test]
    fn test_broken_prop_ignores_hits() {
        let mut pot = Breakable::new(Vec2::ZERO, false);
        assert_eq!(apply_damage(&mut pot, 1.0), DamageOutcome::Killed);
        assert_eq!(apply_damage(&mut pot, 1.0), DamageOutcome::Ignored);
    }

    #[test]
    fn test_props_cannot_be_pushed() {
        let mut pot = Breakable::new(Vec2::ZERO, false);
        assert!(!apply_knockback(&mut pot, Vec2::X));
    }

    #[test]
    fn test_potion_reach_is_inclusive() {
        let potion = PotionPickup::new(Vec2::new(2.0, 0.0));
        assert!(potion.within(Vec2::ZERO, 2.0));
        assert!(!potion.within(Vec2::new(-0.1, 0.0), 2.0));
    }
}
