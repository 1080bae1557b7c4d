//! Transient attack hitboxes.
//!
//! A hitbox is a trigger rectangle spawned by a player attack. It optionally
//! sweeps forward for a short time, strikes each overlapping defender on its
//! mask once, and expires after its lifetime.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use savannah_common::{ActorId, Vec2};

use crate::spatial::{LayerMask, Shape, SpatialQuery};
use crate::timer::Countdown;

/// Default lifetime of a hitbox (seconds).
pub const DEFAULT_HITBOX_LIFETIME: f32 = 1.0;

/// A damage trigger volume.
#[derive(Debug, Clone)]
pub struct AttackHitbox {
    /// Attacker that spawned the hitbox
    pub owner: ActorId,
    /// Damage dealt to each defender struck
    pub damage: f32,
    center: Vec2,
    half_extents: Vec2,
    mask: LayerMask,
    sweep_velocity: Vec2,
    sweep: Countdown,
    lifetime: Countdown,
    struck: AHashSet<ActorId>,
}

/// Serializable view of a hitbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitboxSnapshot {
    /// Attacker
    pub owner: ActorId,
    /// Current center
    pub center: Vec2,
    /// Damage per strike
    pub damage: f32,
}

impl AttackHitbox {
    /// Creates a stationary hitbox of full size `size` centered on `center`.
    /// Targets enemies and breakables by default.
    #[must_use]
    pub fn new(owner: ActorId, center: Vec2, size: Vec2, damage: f32) -> Self {
        Self {
            owner,
            damage,
            center,
            half_extents: size.abs() * 0.5,
            mask: LayerMask::ENEMY | LayerMask::BREAKABLE,
            sweep_velocity: Vec2::ZERO,
            sweep: Countdown::idle(),
            lifetime: Countdown::running(DEFAULT_HITBOX_LIFETIME),
            struck: AHashSet::new(),
        }
    }

    /// Moves the hitbox by `offset` spread over `duration` seconds.
    #[must_use]
    pub fn with_sweep(mut self, offset: Vec2, duration: f32) -> Self {
        if duration > 0.0 {
            self.sweep_velocity = offset / duration;
            self.sweep.start(duration);
        } else {
            self.center += offset;
        }
        self
    }

    /// Sets the lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime.start(seconds);
        self
    }

    /// Sets which layers the hitbox strikes.
    #[must_use]
    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    /// Current center.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Current trigger shape.
    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::rect(self.center, self.half_extents)
    }

    /// Whether the lifetime ran out.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        !self.lifetime.is_running()
    }

    /// Whether `id` has already been struck.
    #[must_use]
    pub fn has_struck(&self, id: ActorId) -> bool {
        self.struck.contains(&id)
    }

    /// Serializable view.
    #[must_use]
    pub fn snapshot(&self) -> HitboxSnapshot {
        HitboxSnapshot {
            owner: self.owner,
            center: self.center,
            damage: self.damage,
        }
    }

    /// Advances the hitbox. Returns the defenders entered this tick; each
    /// defender is returned at most once over the hitbox's life.
    pub fn tick<S: SpatialQuery>(&mut self, dt: f32, spatial: &S) -> Vec<ActorId> {
        if self.is_expired() {
            return Vec::new();
        }

        let mut entered = Vec::new();
        for id in spatial.query_area(&self.shape(), self.mask) {
            if id != self.owner && self.struck.insert(id) {
                entered.push(id);
            }
        }

        if self.sweep.is_running() {
            let step = dt.min(self.sweep.remaining());
            self.center += self.sweep_velocity * step;
            self.sweep.tick(dt);
        }
        self.lifetime.tick(dt);
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::OverlapWorld;

    #[test]
    fn test_strikes_each_target_once() {
        let owner = ActorId::new();
        let enemy = ActorId::new();
        let mut world = OverlapWorld::new();
        world.insert_at(enemy, LayerMask::ENEMY, Vec2::new(1.0, 0.0), Vec2::splat(0.4));

        let mut hitbox = AttackHitbox::new(owner, Vec2::new(1.0, 0.0), Vec2::new(1.5, 1.0), 2.0);
        assert_eq!(hitbox.tick(0.1, &world), vec![enemy]);
        assert!(hitbox.tick(0.1, &world).is_empty());
        assert!(hitbox.has_struck(enemy));
    }

    #[test]
    fn test_ignores_owner_and_other_layers() {
        let owner = ActorId::new();
        let mut world = OverlapWorld::new();
        world.insert_at(owner, LayerMask::PLAYER, Vec2::ZERO, Vec2::splat(0.4));
        world.insert_at(ActorId::new(), LayerMask::OBSTACLE, Vec2::ZERO, Vec2::splat(0.4));

        let mut hitbox = AttackHitbox::new(owner, Vec2::ZERO, Vec2::new(1.5, 1.0), 1.0)
            .with_mask(LayerMask::ENEMY | LayerMask::BREAKABLE | LayerMask::PLAYER);
        assert!(hitbox.tick(0.1, &world).is_empty());
    }

    #[test]
    fn test_sweep_reaches_far_target() {
        let enemy = ActorId::new();
        let mut world = OverlapWorld::new();
        world.insert_at(enemy, LayerMask::ENEMY, Vec2::new(2.5, 0.0), Vec2::splat(0.4));

        let mut hitbox = AttackHitbox::new(ActorId::new(), Vec2::ZERO, Vec2::new(1.5, 1.0), 1.0)
            .with_sweep(Vec2::new(2.0, 0.0), 0.2);
        let mut hits = Vec::new();
        for _ in 0..6 {
            hits.extend(hitbox.tick(0.05, &world));
        }
        assert_eq!(hits, vec![enemy]);
        assert!((hitbox.center().x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_expires_after_lifetime() {
        let mut hitbox = AttackHitbox::new(ActorId::new(), Vec2::ZERO, Vec2::ONE, 1.0).with_lifetime(0.5);
        let world = OverlapWorld::new();
        for _ in 0..9 {
            hitbox.tick(0.05, &world);
        }
        assert!(!hitbox.is_expired());
        hitbox.tick(0.05, &world);
        assert!(hitbox.is_expired());
    }
}
