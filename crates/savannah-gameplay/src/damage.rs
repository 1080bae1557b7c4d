//! Damage exchange protocol shared by every combatant.
//!
//! This module provides:
//! - [`Vitals`]: clamped health bookkeeping
//! - [`KnockbackState`]: impulse plus cooldown window
//! - [`Defender`]: the capability chargers, the player and props implement
//! - [`apply_damage`] / [`apply_knockback`]: the guarded entry points
//!
//! Nothing here fails. Bad input degrades to a no-op.

use serde::{Deserialize, Serialize};
use tracing::trace;

use savannah_common::{ActorId, Vec2};

use crate::movement::Body;
use crate::timer::Countdown;

/// Result of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Nothing happened (dead defender or zero damage)
    Ignored,
    /// Health went down but stayed above zero
    Wounded {
        /// Health left after the hit
        remaining: f32,
    },
    /// This hit brought health to zero
    Killed,
}

impl DamageOutcome {
    /// Whether this outcome killed the defender.
    #[must_use]
    pub const fn is_killed(self) -> bool {
        matches!(self, Self::Killed)
    }

    /// Whether any health was removed.
    #[must_use]
    pub const fn landed(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Clamps raw damage input: negative and NaN count as zero.
#[must_use]
pub fn sanitize_damage(amount: f32) -> f32 {
    if amount.is_nan() || amount <= 0.0 {
        0.0
    } else {
        amount
    }
}

/// Health of a combatant. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Current health
    health: f32,
    /// Maximum health
    max_health: f32,
}

impl Vitals {
    /// Creates full vitals.
    #[must_use]
    pub fn new(max_health: f32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            health: max_health,
            max_health,
        }
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Whether health reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.max_health
        }
    }

    /// Removes health. `health = max(0, health - amount)`.
    pub fn apply(&mut self, amount: f32) -> DamageOutcome {
        let amount = sanitize_damage(amount);
        if self.is_dead() || amount == 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        if self.is_dead() {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded {
                remaining: self.health,
            }
        }
    }

    /// Restores health to maximum.
    pub fn restore_full(&mut self) {
        self.health = self.max_health;
    }
}

/// Knockback impulse and its cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackState {
    /// Impulse magnitude (unit mass, so this is the resulting speed)
    pub force: f32,
    /// Cooldown length (seconds)
    pub duration: f32,
    cooldown: Countdown,
}

impl KnockbackState {
    /// Creates an idle knockback state.
    #[must_use]
    pub const fn new(force: f32, duration: f32) -> Self {
        Self {
            force,
            duration,
            cooldown: Countdown::idle(),
        }
    }

    /// Whether the cooldown window is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cooldown.is_running()
    }

    /// Applies an impulse unless already cooling down.
    ///
    /// Velocity is zeroed first, then set to `direction * force`.
    pub fn begin(&mut self, body: &mut Body, direction: Vec2) -> bool {
        if self.is_active() {
            return false;
        }
        body.halt();
        body.velocity = direction.normalize_or_zero() * self.force;
        self.cooldown.start(self.duration);
        true
    }

    /// Advances the cooldown. Zeroes velocity and returns true on the tick it
    /// clears.
    pub fn tick(&mut self, dt: f32, body: &mut Body) -> bool {
        if self.cooldown.tick(dt) {
            body.halt();
            true
        } else {
            false
        }
    }

    /// Drops any running cooldown.
    pub fn clear(&mut self) {
        self.cooldown.cancel();
    }
}

/// Anything that can receive damage and knockback.
pub trait Defender {
    /// Identity of the defender.
    fn actor_id(&self) -> ActorId;

    /// Whether the defender is already dead or broken.
    fn is_dead(&self) -> bool;

    /// Removes health. Called with sanitized, positive amounts only.
    fn take_damage(&mut self, amount: f32) -> DamageOutcome;

    /// Applies a knockback impulse along a unit direction. Returns whether it
    /// was accepted. Defenders that cannot be moved return false.
    fn receive_knockback(&mut self, direction: Vec2) -> bool;
}

/// Deals damage to a defender.
///
/// Negative or NaN damage is treated as zero. Dead defenders are untouched.
pub fn apply_damage<D: Defender + ?Sized>(defender: &mut D, amount: f32) -> DamageOutcome {
    let amount = sanitize_damage(amount);
    if defender.is_dead() || amount == 0.0 {
        return DamageOutcome::Ignored;
    }
    let outcome = defender.take_damage(amount);
    trace!("{} took {amount} damage: {outcome:?}", defender.actor_id());
    outcome
}

/// Knocks a defender back along `direction` (normalized here).
///
/// Rejected while the defender is dead or still cooling down from a previous
/// knockback.
pub fn apply_knockback<D: Defender + ?Sized>(defender: &mut D, direction: Vec2) -> bool {
    if defender.is_dead() {
        return false;
    }
    let accepted = defender.receive_knockback(direction.normalize_or_zero());
    trace!("{} knockback {direction} accepted={accepted}", defender.actor_id());
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal defender for exercising the protocol.
    struct Dummy {
        id: ActorId,
        vitals: Vitals,
        body: Body,
        knockback: KnockbackState,
    }

    impl Dummy {
        fn new(health: f32) -> Self {
            Self {
                id: ActorId::new(),
                vitals: Vitals::new(health),
                body: Body::default(),
                knockback: KnockbackState::new(5.0, 0.5),
            }
        }
    }

    impl Defender for Dummy {
        fn actor_id(&self) -> ActorId {
            self.id
        }

        fn is_dead(&self) -> bool {
            self.vitals.is_dead()
        }

        fn take_damage(&mut self, amount: f32) -> DamageOutcome {
            self.vitals.apply(amount)
        }

        fn receive_knockback(&mut self, direction: Vec2) -> bool {
            self.knockback.begin(&mut self.body, direction)
        }
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut dummy = Dummy::new(5.0);
        assert_eq!(
            apply_damage(&mut dummy, 3.0),
            DamageOutcome::Wounded { remaining: 2.0 }
        );
        assert_eq!(apply_damage(&mut dummy, 10.0), DamageOutcome::Killed);
        assert_eq!(dummy.vitals.health(), 0.0);
        assert_eq!(apply_damage(&mut dummy, 1.0), DamageOutcome::Ignored);
    }

    #[test]
    fn test_negative_and_nan_ignored() {
        let mut dummy = Dummy::new(5.0);
        assert_eq!(apply_damage(&mut dummy, -4.0), DamageOutcome::Ignored);
        assert_eq!(apply_damage(&mut dummy, f32::NAN), DamageOutcome::Ignored);
        assert_eq!(dummy.vitals.health(), 5.0);
    }

    #[test]
    fn test_knockback_rejected_during_cooldown() {
        let mut dummy = Dummy::new(5.0);
        assert!(apply_knockback(&mut dummy, Vec2::new(3.0, 0.0)));
        assert_eq!(dummy.body.velocity, Vec2::new(5.0, 0.0));

        assert!(!apply_knockback(&mut dummy, Vec2::Y));
        assert_eq!(dummy.body.velocity, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_knockback_clears_after_exact_window() {
        let mut dummy = Dummy::new(5.0);
        assert!(apply_knockback(&mut dummy, Vec2::X));

        for _ in 0..9 {
            assert!(!dummy.knockback.tick(0.05, &mut dummy.body));
            assert!(dummy.knockback.is_active());
        }
        assert!(dummy.knockback.tick(0.05, &mut dummy.body));
        assert!(!dummy.knockback.is_active());
        assert_eq!(dummy.body.velocity, Vec2::ZERO);
        assert!(apply_knockback(&mut dummy, Vec2::Y));
    }

    #[test]
    fn test_dead_defender_not_pushed() {
        let mut dummy = Dummy::new(1.0);
        apply_damage(&mut dummy, 1.0);
        assert!(!apply_knockback(&mut dummy, Vec2::X));
        assert_eq!(dummy.body.velocity, Vec2::ZERO);
    }

    proptest! {
        #[test]
        fn prop_health_is_clamped(health in 0.1f32..500.0, hits in proptest::collection::vec(-10.0f32..50.0, 0..20)) {
            let mut vitals = Vitals::new(health);
            for hit in hits {
                let before = vitals.health();
                let outcome = vitals.apply(hit);
                let expected = if before <= 0.0 { before } else { (before - hit.max(0.0)).max(0.0) };
                prop_assert!((vitals.health() - expected).abs() < 1e-4);
                prop_assert!(vitals.health() >= 0.0);
                prop_assert_eq!(outcome.is_killed(), before > 0.0 && vitals.is_dead());
            }
        }
    }
}
