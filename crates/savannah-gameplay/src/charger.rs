//! Crimson Charger combat state machine.
//!
//! A charger roams until its sensor spots the player, winds up a charge,
//! dashes along the locked direction, and stuns itself on any contact. A
//! landed charge damages and knocks back the player once per attack. Two
//! chargers colliding mid-dash both take damage and are pushed apart.
//!
//! Each call to [`Charger::update`] consumes the sensor's event for that tick
//! and returns the [`CombatCommand`]s the owner must resolve against other
//! actors. Everything that happened is queued as [`GameEvent`]s and drained by
//! the owner with [`Charger::drain_events`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savannah_common::{heading_towards, knockback_direction, ActorId, Vec2};

use crate::damage::{apply_damage, DamageOutcome, Defender, KnockbackState, Vitals};
use crate::detection::{DetectionSensor, SensorEvent};
use crate::events::GameEvent;
use crate::movement::{Body, PathfindingDriver};
use crate::profile::ChargerProfile;
use crate::spatial::{Aabb, LayerMask, Shape, SpatialQuery};
use crate::timer::Countdown;

/// Charger FSM state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargerState {
    /// Wandering, sensor looking for the player
    #[default]
    Roaming,
    /// Winding up a charge at a locked target
    Charging,
    /// Dashing along the attack direction
    Attacking,
    /// Recovering from a contact
    Stunned,
    /// Health reached zero
    Dead,
}

/// Work a charger asks its owner to carry out on other actors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatCommand {
    /// A charge landed on the player
    Strike {
        /// Charger that landed the hit
        attacker: ActorId,
        /// Player that was hit
        defender: ActorId,
        /// Damage to deal
        damage: f32,
        /// Unit knockback direction, away from the attacker
        knockback: Vec2,
    },
    /// Two chargers collided mid-attack
    PeerClash {
        /// Charger that initiated the clash
        attacker: ActorId,
        /// The other charger
        other: ActorId,
        /// Damage the other charger takes
        damage: f32,
        /// Unit knockback direction for the other charger
        knockback: Vec2,
    },
}

/// Knockback scheduled for later in this charger's own timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingKnockback {
    timer: Countdown,
    direction: Vec2,
}

/// Serializable view of a charger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSnapshot {
    /// Charger ID
    pub id: ActorId,
    /// FSM state
    pub state: ChargerState,
    /// World position
    pub position: Vec2,
    /// Current health
    pub health: f32,
    /// Whether it is still present in the world
    pub active: bool,
}

/// A Crimson Charger.
#[derive(Debug, Clone)]
pub struct Charger {
    id: ActorId,
    profile: ChargerProfile,
    state: ChargerState,
    spawn_point: Vec2,
    body: Body,
    vitals: Vitals,
    knockback: KnockbackState,
    driver: PathfindingDriver,
    sensor: DetectionSensor,
    /// Weak reference, resolved through the spatial query every use
    target: Option<ActorId>,
    attack_direction: Vec2,
    /// Set once a hit has been applied during the current attack
    has_dealt_damage: bool,

    // Timers. Death cancels all of them.
    charge_timer: Countdown,
    attack_timer: Countdown,
    stun_timer: Countdown,
    recovery_timer: Countdown,
    despawn_timer: Countdown,
    pending_knockback: Option<PendingKnockback>,

    active: bool,
    events: Vec<GameEvent>,
}

impl Charger {
    /// Spawns a roaming charger at `spawn_point`.
    #[must_use]
    pub fn new(profile: ChargerProfile, spawn_point: Vec2, seed: u64) -> Self {
        let vitals = Vitals::new(profile.health);
        let knockback = KnockbackState::new(profile.knockback_force, profile.knockback_duration);
        let driver = PathfindingDriver::new(profile.move_speed);
        let sensor = DetectionSensor::new(profile.detection_range, profile.roam_interval, seed);
        Self {
            id: ActorId::new(),
            profile,
            state: ChargerState::Roaming,
            spawn_point,
            body: Body::at(spawn_point),
            vitals,
            knockback,
            driver,
            sensor,
            target: None,
            attack_direction: Vec2::ZERO,
            has_dealt_damage: false,
            charge_timer: Countdown::idle(),
            attack_timer: Countdown::idle(),
            stun_timer: Countdown::idle(),
            recovery_timer: Countdown::idle(),
            despawn_timer: Countdown::idle(),
            pending_knockback: None,
            active: true,
            events: Vec::new(),
        }
    }

    /// Uses a fixed ID instead of a freshly allocated one.
    #[must_use]
    pub fn with_id(mut self, id: ActorId) -> Self {
        self.id = id;
        self
    }

    /// Charger ID.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Current FSM state.
    #[must_use]
    pub const fn state(&self) -> ChargerState {
        self.state
    }

    /// Tunables in use.
    #[must_use]
    pub const fn profile(&self) -> &ChargerProfile {
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

    /// Spawn position restored on reset.
    #[must_use]
    pub const fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    /// Health bookkeeping.
    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.vitals.health()
    }

    /// Whether the charger is still present in the world.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a hit has been applied during the current attack.
    #[must_use]
    pub const fn has_dealt_damage(&self) -> bool {
        self.has_dealt_damage
    }

    /// Whether the knockback cooldown is running.
    #[must_use]
    pub const fn is_knocked_back(&self) -> bool {
        self.knockback.is_active()
    }

    /// Locked target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<ActorId> {
        self.target
    }

    /// Direction locked when the current attack launched.
    #[must_use]
    pub const fn attack_direction(&self) -> Vec2 {
        self.attack_direction
    }

    /// Pathfinding driver.
    #[must_use]
    pub const fn driver(&self) -> &PathfindingDriver {
        &self.driver
    }

    /// Detection sensor.
    #[must_use]
    pub const fn sensor(&self) -> &DetectionSensor {
        &self.sensor
    }

    /// Collider bounds at the current position.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.body.position, self.profile.body_half_extents)
    }

    /// Serializable view.
    #[must_use]
    pub fn snapshot(&self) -> ChargerSnapshot {
        ChargerSnapshot {
            id: self.id,
            state: self.state,
            position: self.body.position,
            health: self.vitals.health(),
            active: self.active,
        }
    }

    /// Takes every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Marks the current attack as spent. Used when another charger
    /// initiates a clash with this one.
    pub fn mark_clashed(&mut self) {
        self.has_dealt_damage = true;
    }

    fn transition(&mut self, to: ChargerState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!("{} {from:?} -> {to:?}", self.id);
        self.events.push(GameEvent::StateChanged {
            actor: self.id,
            from,
            to,
        });
    }

    /// Advances the charger by `dt`.
    ///
    /// Runs the sensor, consumes its event, advances the FSM and returns the
    /// commands to resolve against other actors.
    pub fn update<S: SpatialQuery>(&mut self, dt: f32, spatial: &S) -> Vec<CombatCommand> {
        let mut commands = Vec::new();
        if !self.active {
            return commands;
        }

        if self.state == ChargerState::Dead {
            if self.despawn_timer.tick(dt) {
                self.active = false;
                debug!("{} despawned", self.id);
                self.events.push(GameEvent::Despawned { actor: self.id });
            }
            return commands;
        }

        self.knockback.tick(dt, &mut self.body);
        self.tick_pending_knockback(dt);

        let origin = self.body.position;
        match self.sensor.tick(dt, origin, spatial, &mut self.driver) {
            Some(SensorEvent::Acquired(id)) => self.on_target_acquired(id),
            Some(SensorEvent::Lost) => self.on_target_lost(),
            None => {}
        }

        match self.state {
            ChargerState::Roaming | ChargerState::Dead => {}
            ChargerState::Charging => {
                if self.charge_timer.tick(dt) {
                    self.launch_attack(spatial);
                }
            }
            ChargerState::Attacking => self.tick_attack(dt, spatial, &mut commands),
            ChargerState::Stunned => {
                if self.stun_timer.tick(dt) {
                    self.exit_stunned(spatial);
                }
            }
        }

        if self.recovery_timer.tick(dt) {
            self.driver.set_enabled(true);
        }

        commands
    }

    /// Moves the body by its velocity and the driver's heading.
    pub fn integrate(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        let drive = self.driver.step(dt);
        self.body.integrate(dt, drive);
    }

    fn tick_pending_knockback(&mut self, dt: f32) {
        let Some(pending) = self.pending_knockback.as_mut() else {
            return;
        };
        if pending.timer.tick(dt) {
            let direction = pending.direction;
            self.pending_knockback = None;
            if self.knockback.begin(&mut self.body, direction) {
                self.events.push(GameEvent::KnockedBack {
                    target: self.id,
                    direction,
                });
            }
        }
    }

    fn on_target_acquired(&mut self, target: ActorId) {
        if self.state == ChargerState::Roaming {
            self.start_charging(target);
        }
    }

    fn on_target_lost(&mut self) {
        if matches!(self.state, ChargerState::Charging | ChargerState::Attacking) {
            self.reset_to_roaming();
        }
    }

    fn start_charging(&mut self, target: ActorId) {
        self.target = Some(target);
        self.driver.stop();
        self.charge_timer.start(self.profile.charge_time);
        self.transition(ChargerState::Charging);
    }

    fn launch_attack<S: SpatialQuery>(&mut self, spatial: &S) {
        let Some(target_pos) = self.target.and_then(|id| spatial.position_of(id)) else {
            self.reset_to_roaming();
            return;
        };
        self.attack_direction = heading_towards(self.body.position, target_pos);
        self.has_dealt_damage = false;
        self.recovery_timer.cancel();
        self.driver.set_enabled(false);
        self.attack_timer.start(self.profile.attack_duration);
        self.body.velocity = self.attack_direction * self.profile.attack_speed;
        self.transition(ChargerState::Attacking);
    }

    fn tick_attack<S: SpatialQuery>(
        &mut self,
        dt: f32,
        spatial: &S,
        commands: &mut Vec<CombatCommand>,
    ) {
        let position = self.body.position;
        let area = Shape::rect(position, self.profile.attack_half_extents);

        if !self.has_dealt_damage {
            if let Some(player) = spatial.query_area(&area, LayerMask::PLAYER).first().copied() {
                self.has_dealt_damage = true;
                let player_pos = spatial.position_of(player).unwrap_or(position);
                commands.push(CombatCommand::Strike {
                    attacker: self.id,
                    defender: player,
                    damage: self.profile.damage,
                    knockback: knockback_direction(position, player_pos),
                });
                self.enter_stunned();
                return;
            }
        }

        if spatial.overlaps_any(&area, LayerMask::OBSTACLE | LayerMask::GAP) {
            debug!("{} charged into terrain", self.id);
            self.enter_stunned();
            return;
        }

        let peer = spatial
            .query_area(&area, LayerMask::ENEMY)
            .into_iter()
            .find(|id| *id != self.id);
        if let Some(other) = peer {
            if !self.has_dealt_damage {
                self.has_dealt_damage = true;
                let other_pos = spatial.position_of(other).unwrap_or(position);
                let away = knockback_direction(other_pos, position);
                commands.push(CombatCommand::PeerClash {
                    attacker: self.id,
                    other,
                    damage: self.profile.peer_clash_damage,
                    knockback: -away,
                });
                self.pending_knockback = Some(PendingKnockback {
                    timer: Countdown::running(self.profile.peer_knockback_delay),
                    direction: away,
                });
                let clash_damage = self.profile.peer_clash_damage;
                let outcome = apply_damage(self, clash_damage);
                if outcome.landed() {
                    self.events.push(GameEvent::Damaged {
                        target: self.id,
                        source: Some(other),
                        amount: clash_damage,
                        remaining: self.vitals.health(),
                    });
                }
                if self.state == ChargerState::Dead {
                    return;
                }
            }
            self.enter_stunned();
            return;
        }

        self.body.velocity = self.attack_direction * self.profile.attack_speed;
        if self.attack_timer.tick(dt) {
            debug!("{} charge found nothing", self.id);
            self.body.halt();
            self.recovery_timer.start(self.profile.recovery_time);
            self.target = None;
            self.sensor.start_roaming(&mut self.driver);
            self.transition(ChargerState::Roaming);
        }
    }

    fn enter_stunned(&mut self) {
        self.attack_timer.cancel();
        self.recovery_timer.cancel();
        if !self.knockback.is_active() {
            self.body.halt();
        }
        self.driver.set_enabled(false);
        self.stun_timer.start(self.profile.stun_time);
        self.transition(ChargerState::Stunned);
    }

    fn exit_stunned<S: SpatialQuery>(&mut self, spatial: &S) {
        self.body.halt();
        self.driver.set_enabled(true);

        let origin = self.body.position;
        let reengage = self.target.filter(|id| {
            spatial
                .position_of(*id)
                .is_some_and(|pos| pos.distance(origin) <= self.profile.detection_range)
        });
        match reengage {
            Some(target) => {
                self.sensor.track(target, &mut self.driver);
                self.start_charging(target);
            }
            None => self.reset_to_roaming(),
        }
    }

    fn reset_to_roaming(&mut self) {
        self.charge_timer.cancel();
        self.attack_timer.cancel();
        self.body.halt();
        self.driver.set_enabled(true);
        self.target = None;
        self.sensor.start_roaming(&mut self.driver);
        self.transition(ChargerState::Roaming);
    }

    fn die(&mut self) {
        self.charge_timer.cancel();
        self.attack_timer.cancel();
        self.stun_timer.cancel();
        self.recovery_timer.cancel();
        self.pending_knockback = None;
        self.knockback.clear();
        self.body.halt();
        self.driver.set_enabled(false);
        self.target = None;
        self.despawn_timer.start(self.profile.despawn_delay);
        info!("{} died", self.id);
        self.transition(ChargerState::Dead);
    }

    /// Restores the charger to a fresh roaming state at its spawn point.
    /// Revives dead chargers.
    pub fn reset(&mut self) {
        self.vitals.restore_full();
        self.has_dealt_damage = false;
        self.charge_timer.cancel();
        self.attack_timer.cancel();
        self.stun_timer.cancel();
        self.recovery_timer.cancel();
        self.despawn_timer.cancel();
        self.pending_knockback = None;
        self.knockback.clear();
        self.body = Body::at(self.spawn_point);
        self.driver.set_enabled(true);
        self.target = None;
        self.attack_direction = Vec2::ZERO;
        self.sensor.start_roaming(&mut self.driver);
        self.active = true;
        self.transition(ChargerState::Roaming);
    }
}

impl Defender for Charger {
    fn actor_id(&self) -> ActorId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.state == ChargerState::Dead || self.vitals.is_dead()
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let outcome = self.vitals.apply(amount);
        if outcome.is_killed() {
            self.die();
        }
        outcome
    }

    fn receive_knockback(&mut self, direction: Vec2) -> bool {
        self.knockback.begin(&mut self.body, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::apply_knockback;
    use crate::spatial::OverlapWorld;

    const DT: f32 = 0.05;

    fn profile() -> ChargerProfile {
        ChargerProfile::default()
    }

    fn world_with(charger: &Charger, player: Option<(ActorId, Vec2)>) -> OverlapWorld {
        let mut world = OverlapWorld::new();
        world.insert(charger.id(), LayerMask::ENEMY, charger.bounds());
        if let Some((id, pos)) = player {
            world.insert_at(id, LayerMask::PLAYER, pos, Vec2::splat(0.4));
        }
        world
    }

    fn run(charger: &mut Charger, world: &OverlapWorld, seconds: f32) -> Vec<CombatCommand> {
        let steps = (seconds / DT).round() as usize;
        let mut commands = Vec::new();
        for _ in 0..steps {
            commands.extend(charger.update(DT, world));
        }
        commands
    }

    #[test]
    fn test_starts_roaming() {
        let charger = Charger::new(profile(), Vec2::ZERO, 1);
        assert_eq!(charger.state(), ChargerState::Roaming);
        assert_eq!(charger.health(), 5.0);
        assert!(charger.is_active());
    }

    #[test]
    fn test_charges_then_attacks_toward_player() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        // Player far enough that the attack rectangle does not touch it.
        let world = world_with(&charger, Some((player, Vec2::new(0.0, 4.5))));

        charger.update(DT, &world);
        assert_eq!(charger.state(), ChargerState::Charging);
        assert_eq!(charger.target(), Some(player));
        assert_eq!(charger.driver().heading(), Vec2::ZERO);

        run(&mut charger, &world, 1.9);
        assert_eq!(charger.state(), ChargerState::Charging);
        run(&mut charger, &world, 0.1);
        assert_eq!(charger.state(), ChargerState::Attacking);
        assert_eq!(charger.attack_direction(), Vec2::Y);
        assert_eq!(charger.velocity(), Vec2::new(0.0, 10.0));
        assert!(!charger.driver().is_enabled());
    }

    #[test]
    fn test_strike_once_then_stun() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(1.0, 0.0))));

        charger.update(DT, &world);
        let commands = run(&mut charger, &world, 2.0);
        assert_eq!(commands.len(), 1);
        match commands[0] {
            CombatCommand::Strike {
                defender,
                damage,
                knockback,
                ..
            } => {
                assert_eq!(defender, player);
                assert_eq!(damage, 1.0);
                assert_eq!(knockback, Vec2::X);
            }
            CombatCommand::PeerClash { .. } => panic!("unexpected clash"),
        }
        assert_eq!(charger.state(), ChargerState::Stunned);
        assert!(charger.has_dealt_damage());
        assert_eq!(charger.velocity(), Vec2::ZERO);

        // Player still in range after the stun: charge again.
        let more = run(&mut charger, &world, 2.0);
        assert!(more.is_empty());
        assert_eq!(charger.state(), ChargerState::Charging);
    }

    #[test]
    fn test_stun_exit_without_player_roams() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(1.0, 0.0))));
        charger.update(DT, &world);
        run(&mut charger, &world, 2.0);
        assert_eq!(charger.state(), ChargerState::Stunned);

        let empty = world_with(&charger, None);
        run(&mut charger, &empty, 2.0);
        assert_eq!(charger.state(), ChargerState::Roaming);
        assert!(charger.driver().is_enabled());
        assert_eq!(charger.target(), None);
    }

    #[test]
    fn test_obstacle_stuns_without_damage() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let mut world = world_with(&charger, Some((player, Vec2::new(0.0, 4.5))));
        world.insert_at(ActorId::new(), LayerMask::OBSTACLE, Vec2::new(-1.5, 0.0), Vec2::splat(0.4));

        charger.update(DT, &world);
        let commands = run(&mut charger, &world, 2.0);
        assert!(commands.is_empty());
        assert_eq!(charger.state(), ChargerState::Stunned);
        assert_eq!(charger.health(), 5.0);
    }

    #[test]
    fn test_whiffed_charge_returns_to_roaming() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(0.0, 4.5))));

        charger.update(DT, &world);
        run(&mut charger, &world, 2.0);
        assert_eq!(charger.state(), ChargerState::Attacking);

        // The snapshot never moves, so the dash never reaches the player.
        run(&mut charger, &world, 1.95);
        assert_eq!(charger.state(), ChargerState::Roaming);
        assert_eq!(charger.velocity(), Vec2::ZERO);
        assert!(!charger.driver().is_enabled());

        // Driver comes back after the recovery delay. The sensor may already
        // have re-acquired the player, which is fine.
        run(&mut charger, &world, 0.5);
        assert!(charger.driver().is_enabled());
    }

    #[test]
    fn test_lost_during_charge_resets() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(3.0, 0.0))));
        charger.update(DT, &world);
        assert_eq!(charger.state(), ChargerState::Charging);

        let empty = world_with(&charger, None);
        charger.update(DT, &empty);
        assert_eq!(charger.state(), ChargerState::Roaming);

        // No stale charge timer fires later.
        run(&mut charger, &empty, 3.0);
        assert_eq!(charger.state(), ChargerState::Roaming);
    }

    #[test]
    fn test_death_cancels_timers_and_despawns() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(3.0, 0.0))));
        charger.update(DT, &world);
        assert_eq!(charger.state(), ChargerState::Charging);

        assert_eq!(apply_damage(&mut charger, 10.0), DamageOutcome::Killed);
        assert_eq!(charger.state(), ChargerState::Dead);
        assert_eq!(charger.health(), 0.0);

        let commands = run(&mut charger, &world, 1.9);
        assert!(commands.is_empty());
        assert_eq!(charger.state(), ChargerState::Dead);
        assert!(charger.is_active());
        run(&mut charger, &world, 0.1);
        assert!(!charger.is_active());

        let events = charger.drain_events();
        assert!(events.contains(&GameEvent::Despawned { actor: charger.id() }));
    }

    #[test]
    fn test_reset_revives() {
        let mut charger = Charger::new(profile(), Vec2::new(2.0, 2.0), 1);
        apply_damage(&mut charger, 5.0);
        assert_eq!(charger.state(), ChargerState::Dead);

        charger.reset();
        assert_eq!(charger.state(), ChargerState::Roaming);
        assert_eq!(charger.health(), 5.0);
        assert!(charger.is_active());
        assert!(!charger.has_dealt_damage());
        assert!(charger.driver().is_enabled());
        assert_eq!(charger.position(), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_dead_charger_ignores_knockback() {
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        apply_damage(&mut charger, 5.0);
        assert!(!apply_knockback(&mut charger, Vec2::X));
        assert_eq!(charger.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_state_changes_are_recorded() {
        let player = ActorId::new();
        let mut charger = Charger::new(profile(), Vec2::ZERO, 1);
        let world = world_with(&charger, Some((player, Vec2::new(3.0, 0.0))));
        charger.update(DT, &world);
        let events = charger.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::StateChanged {
                actor: charger.id(),
                from: ChargerState::Roaming,
                to: ChargerState::Charging,
            }]
        );
        assert!(charger.drain_events().is_empty());
    }
}
