//! Player combatant: health, knockback, the light/heavy attack chain, the
//! dodge dash and the potion pouch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use savannah_common::{ActorId, Vec2};

use crate::damage::{DamageOutcome, Defender, KnockbackState, Vitals};
use crate::hitbox::AttackHitbox;
use crate::movement::Body;
use crate::profile::PlayerProfile;
use crate::spatial::Aabb;
use crate::timer::Countdown;

/// Number of hits in a light combo.
pub const COMBO_LENGTH: u8 = 3;

/// Which attack a hitbox came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    /// Light attack at a combo step (0-based; the last step is the finisher)
    Light {
        /// Step within the combo
        step: u8,
    },
    /// Charged heavy attack
    Heavy,
}

/// Why an attack request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackRefusal {
    /// The player is dead
    Dead,
    /// The player is being knocked back
    KnockedBack,
    /// Another attack is still playing
    Busy,
    /// Heavy attack released before it was fully charged
    Undercharged,
    /// Heavy attack released without charging
    NotCharging,
}

/// Why a dash request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DashRefusal {
    /// The player is dead
    Dead,
    /// The player is being knocked back
    KnockedBack,
    /// A dash is already under way
    Dashing,
    /// The previous dash is still cooling down
    CoolingDown,
}

/// Why a potion could not be drunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PotionRefusal {
    /// The player is dead
    Dead,
    /// The pouch is empty
    NoPotions,
    /// Health is already full
    FullHealth,
}

/// Combo and heavy-charge bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerCombat {
    combo_step: u8,
    /// Running while an attack animation plays
    attack_lock: Countdown,
    /// Whether the combo advances when the lock ends
    advance_on_unlock: bool,
    /// Time left to chain the next combo hit
    combo_window: Countdown,
    /// Seconds the heavy attack has been held
    heavy_charge: Option<f32>,
}

impl PlayerCombat {
    /// Step the next light attack will use.
    #[must_use]
    pub const fn combo_step(&self) -> u8 {
        self.combo_step
    }

    /// Whether an attack is playing.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.attack_lock.is_running()
    }

    /// Whether the heavy attack is being held.
    #[must_use]
    pub const fn is_charging_heavy(&self) -> bool {
        self.heavy_charge.is_some()
    }

    fn tick(&mut self, dt: f32, combo_window: f32) {
        if self.attack_lock.tick(dt) && self.advance_on_unlock {
            self.advance_on_unlock = false;
            self.combo_step = (self.combo_step + 1) % COMBO_LENGTH;
            self.combo_window.start(combo_window);
        } else if !self.attack_lock.is_running() && self.combo_window.tick(dt) {
            self.combo_step = 0;
        }
        if let Some(held) = self.heavy_charge.as_mut() {
            *held += dt;
        }
    }

    fn interrupt(&mut self) {
        self.attack_lock.cancel();
        self.advance_on_unlock = false;
        self.heavy_charge = None;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The player character as seen by the combat core.
#[derive(Debug, Clone)]
pub struct Player {
    id: ActorId,
    profile: PlayerProfile,
    body: Body,
    vitals: Vitals,
    knockback: KnockbackState,
    combat: PlayerCombat,
    move_input: Vec2,
    /// Last attack direction; dashes fall back to it when standing still
    aim: Vec2,
    dash_timer: Countdown,
    dash_cooldown: Countdown,
    potions: u8,
}

impl Player {
    /// Creates a player at full health.
    #[must_use]
    pub fn new(profile: PlayerProfile, position: Vec2) -> Self {
        let vitals = Vitals::new(profile.max_health);
        let knockback = KnockbackState::new(profile.knockback_force, profile.knockback_duration);
        Self {
            id: ActorId::new(),
            profile,
            body: Body::at(position),
            vitals,
            knockback,
            combat: PlayerCombat::default(),
            move_input: Vec2::ZERO,
            aim: Vec2::X,
            dash_timer: Countdown::idle(),
            dash_cooldown: Countdown::idle(),
            potions: 0,
        }
    }

    /// Player ID.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Tunables in use.
    #[must_use]
    pub const fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.body.velocity
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.vitals.health()
    }

    /// Health bookkeeping.
    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Whether the player is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.vitals.is_dead()
    }

    /// Whether the knockback window is running.
    #[must_use]
    pub const fn is_knocked_back(&self) -> bool {
        self.knockback.is_active()
    }

    /// Combo state.
    #[must_use]
    pub const fn combat(&self) -> &PlayerCombat {
        &self.combat
    }

    /// Whether a dodge dash is under way.
    #[must_use]
    pub const fn is_dashing(&self) -> bool {
        self.dash_timer.is_running()
    }

    /// Seconds until the next dash is allowed.
    #[must_use]
    pub fn dash_cooldown_remaining(&self) -> f32 {
        self.dash_cooldown.remaining()
    }

    /// Potions carried.
    #[must_use]
    pub const fn potions(&self) -> u8 {
        self.potions
    }

    /// Collider bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.body.position, self.profile.body_half_extents)
    }

    /// Sets the walking direction. Clamped to unit length.
    pub fn set_move_input(&mut self, input: Vec2) {
        self.move_input = if input.is_finite() {
            input.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
    }

    /// Sets the facing used by dashes started from a standstill.
    pub fn set_aim(&mut self, direction: Vec2) {
        let direction = direction.normalize_or_zero();
        if direction != Vec2::ZERO {
            self.aim = direction;
        }
    }

    /// Advances timers: knockback window, dash, attack lock, combo window,
    /// heavy charge.
    pub fn tick(&mut self, dt: f32) {
        self.knockback.tick(dt, &mut self.body);
        if self.dash_timer.tick(dt) {
            self.body.halt();
        }
        self.dash_cooldown.tick(dt);
        self.combat.tick(dt, self.profile.combo_window);
    }

    /// Applies movement for `dt`. Walking is suppressed while dead, dashing
    /// or knocked back; dash and knockback velocity still carry the body.
    pub fn integrate(&mut self, dt: f32) {
        if !self.is_alive() {
            return;
        }
        if !self.knockback.is_active() && !self.dash_timer.is_running() {
            self.body.velocity = self.move_input * self.profile.move_speed;
        }
        self.body.integrate(dt, Vec2::ZERO);
    }

    fn can_attack(&self) -> Result<(), AttackRefusal> {
        if !self.is_alive() {
            Err(AttackRefusal::Dead)
        } else if self.knockback.is_active() {
            Err(AttackRefusal::KnockedBack)
        } else if self.combat.is_attacking() {
            Err(AttackRefusal::Busy)
        } else {
            Ok(())
        }
    }

    /// Dashes along `direction` and spawns a hitbox at the dash midpoint.
    fn strike(&mut self, direction: Vec2, dash: f32, damage: f32) -> AttackHitbox {
        self.set_aim(direction);
        let direction = self.aim;
        let start = self.body.position;
        let midpoint = start + direction * (dash * 0.5);
        self.body.teleport(start + direction * dash);
        AttackHitbox::new(self.id, midpoint, self.profile.attack_size, damage)
            .with_sweep(
                direction * self.profile.attack_dash_distance,
                self.profile.hitbox_sweep_time,
            )
            .with_lifetime(self.profile.hitbox_lifetime)
    }

    /// Performs the next light attack in the combo.
    pub fn light_attack(&mut self, direction: Vec2) -> Result<(AttackKind, AttackHitbox), AttackRefusal> {
        self.can_attack()?;
        let step = self.combat.combo_step;
        let finisher = step + 1 >= COMBO_LENGTH;
        let (dash, damage) = if finisher {
            (
                self.profile.attack_dash_distance * self.profile.finisher_dash_multiplier,
                self.profile.finisher_damage,
            )
        } else {
            (self.profile.attack_dash_distance, self.profile.basic_damage)
        };
        self.combat.combo_window.cancel();
        self.combat.attack_lock.start(self.profile.light_attack_duration);
        self.combat.advance_on_unlock = true;
        debug!("{} light attack step {step}", self.id);
        Ok((AttackKind::Light { step }, self.strike(direction, dash, damage)))
    }

    /// Starts holding the heavy attack.
    pub fn begin_heavy_charge(&mut self) -> Result<(), AttackRefusal> {
        self.can_attack()?;
        self.combat.heavy_charge = Some(0.0);
        Ok(())
    }

    /// Releases the heavy attack. Fires only when held long enough.
    pub fn release_heavy(&mut self, direction: Vec2) -> Result<(AttackKind, AttackHitbox), AttackRefusal> {
        let held = self.combat.heavy_charge.take().ok_or(AttackRefusal::NotCharging)?;
        self.can_attack()?;
        if held + 1e-4 < self.profile.heavy_charge_time {
            debug!("{} heavy attack released early ({held:.2}s)", self.id);
            return Err(AttackRefusal::Undercharged);
        }
        self.combat.attack_lock.start(self.profile.heavy_attack_duration);
        self.combat.advance_on_unlock = false;
        debug!("{} heavy attack", self.id);
        Ok((
            AttackKind::Heavy,
            self.strike(direction, self.profile.heavy_dash_distance, self.profile.heavy_damage),
        ))
    }

    /// Starts a dodge dash along the walking direction, or along the aim when
    /// standing still. Cancels any attack in progress. Returns the dash
    /// direction.
    pub fn dash(&mut self) -> Result<Vec2, DashRefusal> {
        if !self.is_alive() {
            return Err(DashRefusal::Dead);
        }
        if self.knockback.is_active() {
            return Err(DashRefusal::KnockedBack);
        }
        if self.dash_timer.is_running() {
            return Err(DashRefusal::Dashing);
        }
        if self.dash_cooldown.is_running() {
            return Err(DashRefusal::CoolingDown);
        }
        let mut direction = self.move_input.normalize_or_zero();
        if direction == Vec2::ZERO {
            direction = self.aim;
        }
        self.combat.interrupt();
        self.body.velocity = direction * self.profile.dash_speed;
        self.dash_timer.start(self.profile.dash_duration);
        self.dash_cooldown.start(self.profile.dash_cooldown);
        debug!("{} dashes towards {direction}", self.id);
        Ok(direction)
    }

    /// Puts one potion in the pouch. Returns false when the pouch is full.
    pub fn add_potion(&mut self) -> bool {
        if self.potions >= self.profile.max_potions {
            return false;
        }
        self.potions += 1;
        true
    }

    /// Drinks a potion, restoring full health. Returns the health gained.
    pub fn use_potion(&mut self) -> Result<f32, PotionRefusal> {
        if !self.is_alive() {
            return Err(PotionRefusal::Dead);
        }
        if self.potions == 0 {
            return Err(PotionRefusal::NoPotions);
        }
        let missing = self.vitals.max_health() - self.vitals.health();
        if missing <= 0.0 {
            return Err(PotionRefusal::FullHealth);
        }
        self.potions -= 1;
        self.vitals.restore_full();
        debug!("{} drinks a potion (+{missing}), {} left", self.id, self.potions);
        Ok(missing)
    }

    /// Cancels any attack or heavy charge in progress.
    pub fn interrupt_attack(&mut self) {
        self.combat.interrupt();
    }

    /// Places the player without touching health, velocity or timers.
    pub fn set_position(&mut self, position: Vec2) {
        self.body.teleport(position);
    }

    /// Moves the player to `position` with full health and clean state.
    pub fn respawn_at(&mut self, position: Vec2) {
        self.body = Body::at(position);
        self.vitals.restore_full();
        self.knockback.clear();
        self.combat.reset();
        self.move_input = Vec2::ZERO;
        self.dash_timer.cancel();
        self.dash_cooldown.cancel();
    }
}

impl Defender for Player {
    fn actor_id(&self) -> ActorId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.vitals.is_dead()
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let outcome = self.vitals.apply(amount);
        if outcome.is_killed() {
            self.body.halt();
            self.combat.interrupt();
            self.dash_timer.cancel();
        }
        outcome
    }

    fn receive_knockback(&mut self, direction: Vec2) -> bool {
        let began = self.knockback.begin(&mut self.body, direction);
        if began {
            self.dash_timer.cancel();
        }
        began
    }
}
