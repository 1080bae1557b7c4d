//! Game session: the single owner of every combat system.
//!
//! This module handles:
//! - Spawning chargers, props, terrain and region triggers
//! - The fixed-step tick that drives sensors, FSMs, hitboxes and movement
//! - Resolving combat commands through the damage exchange
//! - Potion drops, pickups and the player's dodge dash
//! - Death reporting, player respawn and region resets

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use savannah_common::{ActorId, RegionKey, Vec2};

use crate::charger::{Charger, ChargerSnapshot, ChargerState, CombatCommand};
use crate::damage::{apply_damage, apply_knockback, DamageOutcome};
use crate::events::{EventBus, GameEvent};
use crate::hitbox::{AttackHitbox, HitboxSnapshot};
use crate::player::{AttackKind, AttackRefusal, DashRefusal, Player, PotionRefusal};
use crate::profile::{ChargerProfile, PlayerProfile};
use crate::props::{Breakable, PotionPickup};
use crate::region::{ActorRoster, RegionRegistry, RegionResetReport, DEFAULT_START_REGION};
use crate::respawn::{RespawnCoordinator, DEFAULT_RESPAWN_DELAY};
use crate::spatial::{Aabb, Collider, LayerMask, OverlapWorld};
use crate::triggers::RegionTrigger;

/// Multiplier spreading per-charger RNG seeds apart.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

// ============================================================================
// Session Config
// ============================================================================

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Region the player starts in
    pub start_region: RegionKey,
    /// Delay between player death and respawn (seconds)
    pub respawn_delay: f32,
    /// Event bus capacity; events beyond it are dropped until drained
    pub event_capacity: usize,
    /// Base seed for roaming randomness
    pub seed: u64,
    /// Default charger tunables
    pub charger: ChargerProfile,
    /// Player tunables
    pub player: PlayerProfile,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_region: RegionKey::new(DEFAULT_START_REGION),
            respawn_delay: DEFAULT_RESPAWN_DELAY,
            event_capacity: 4096,
            seed: 0x5A7A_4E4E,
            charger: ChargerProfile::default(),
            player: PlayerProfile::default(),
        }
    }
}

impl SessionConfig {
    /// Sets the starting region.
    #[must_use]
    pub fn with_start_region(mut self, region: impl Into<RegionKey>) -> Self {
        self.start_region = region.into();
        self
    }

    /// Sets the roaming seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the default charger profile.
    #[must_use]
    pub fn with_charger_profile(mut self, profile: ChargerProfile) -> Self {
        self.charger = profile;
        self
    }

    /// Sets the player profile.
    #[must_use]
    pub fn with_player_profile(mut self, profile: PlayerProfile) -> Self {
        self.player = profile;
        self
    }
}

// ============================================================================
// Charger Pool
// ============================================================================

/// Every charger in the session, in spawn order.
#[derive(Debug, Default, Clone)]
pub struct ChargerPool {
    chargers: Vec<Charger>,
    index: AHashMap<ActorId, usize>,
}

impl ChargerPool {
    /// Adds a charger.
    pub fn push(&mut self, charger: Charger) {
        self.index.insert(charger.id(), self.chargers.len());
        self.chargers.push(charger);
    }

    /// Looks up a charger.
    #[must_use]
    pub fn get(&self, id: ActorId) -> Option<&Charger> {
        self.index.get(&id).map(|&i| &self.chargers[i])
    }

    /// Looks up a charger mutably.
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Charger> {
        self.index.get(&id).map(|&i| &mut self.chargers[i])
    }

    /// Iterates in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Charger> {
        self.chargers.iter()
    }

    /// Iterates mutably in spawn order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Charger> {
        self.chargers.iter_mut()
    }

    /// Number of chargers, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chargers.len()
    }

    /// Whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chargers.is_empty()
    }
}

impl ActorRoster for ChargerPool {
    fn reset_actor(&mut self, id: ActorId) -> bool {
        match self.get_mut(id) {
            Some(charger) => {
                charger.reset();
                true
            }
            None => false,
        }
    }

    fn actor_ids(&self) -> Vec<ActorId> {
        self.chargers.iter().map(Charger::id).collect()
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Serializable view of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Player ID
    pub id: ActorId,
    /// World position
    pub position: Vec2,
    /// Current health
    pub health: f32,
    /// Whether the player is alive
    pub alive: bool,
    /// Potions carried
    pub potions: u8,
}

/// Serializable view of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Ticks run so far
    pub tick: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Player state
    pub player: PlayerSnapshot,
    /// Charger states in spawn order
    pub chargers: Vec<ChargerSnapshot>,
    /// Live hitboxes
    pub hitboxes: Vec<HitboxSnapshot>,
    /// Region of the current checkpoint
    pub current_region: RegionKey,
    /// Current respawn point
    pub respawn_point: Vec2,
    /// Defeated chargers across all regions
    pub defeated: usize,
    /// Unbroken props
    pub props_standing: usize,
    /// Potions lying on the ground
    pub potions_on_ground: usize,
    /// Completed respawns
    pub respawns: u32,
}

// ============================================================================
// Game Session
// ============================================================================

/// Owns the player, chargers, props, terrain, regions and event bus.
#[derive(Debug)]
pub struct GameSession {
    config: SessionConfig,
    player: Player,
    chargers: ChargerPool,
    props: Vec<Breakable>,
    potions: Vec<PotionPickup>,
    hitboxes: Vec<AttackHitbox>,
    terrain: Vec<Collider>,
    triggers: Vec<RegionTrigger>,
    registry: RegionRegistry,
    respawn: RespawnCoordinator,
    bus: EventBus,
    tick_count: u64,
    elapsed: f32,
    spawn_count: u64,
}

impl GameSession {
    /// Creates a session with the player at `player_start`, which is also the
    /// first respawn point.
    #[must_use]
    pub fn new(config: SessionConfig, player_start: Vec2) -> Self {
        let player = Player::new(config.player.clone(), player_start);
        let registry = RegionRegistry::new(config.start_region.clone(), player_start);
        let respawn = RespawnCoordinator::new(config.respawn_delay);
        let bus = EventBus::new(config.event_capacity);
        info!(
            "session started in {} at {player_start}",
            config.start_region
        );
        Self {
            config,
            player,
            chargers: ChargerPool::default(),
            props: Vec::new(),
            potions: Vec::new(),
            hitboxes: Vec::new(),
            terrain: Vec::new(),
            triggers: Vec::new(),
            registry,
            respawn,
            bus,
            tick_count: 0,
            elapsed: 0.0,
            spawn_count: 0,
        }
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Spawns a charger with the session's default profile.
    pub fn spawn_charger(&mut self, region: impl Into<RegionKey>, position: Vec2) -> ActorId {
        let profile = self.config.charger.clone();
        self.spawn_charger_with(profile, region, position)
    }

    /// Spawns a charger with a custom profile.
    pub fn spawn_charger_with(
        &mut self,
        profile: ChargerProfile,
        region: impl Into<RegionKey>,
        position: Vec2,
    ) -> ActorId {
        self.spawn_count += 1;
        let seed = self
            .config
            .seed
            .wrapping_add(self.spawn_count.wrapping_mul(SEED_STRIDE));
        let charger = Charger::new(profile, position, seed);
        let id = charger.id();
        let region = region.into();
        debug!("spawned charger {id} in {region} at {position}");
        self.registry.register_actor(id, region);
        self.chargers.push(charger);
        id
    }

    /// Adds a static obstacle.
    pub fn add_obstacle(&mut self, bounds: Aabb) -> ActorId {
        self.add_terrain(LayerMask::OBSTACLE, bounds)
    }

    /// Adds a gap (pit or ledge).
    pub fn add_gap(&mut self, bounds: Aabb) -> ActorId {
        self.add_terrain(LayerMask::GAP, bounds)
    }

    fn add_terrain(&mut self, layer: LayerMask, bounds: Aabb) -> ActorId {
        let id = ActorId::new();
        self.terrain.push(Collider { id, layer, bounds });
        id
    }

    /// Adds a breakable prop.
    pub fn add_breakable(&mut self, prop: Breakable) -> ActorId {
        let id = prop.id;
        self.props.push(prop);
        id
    }

    /// Adds a region-boundary trigger.
    pub fn add_trigger(&mut self, trigger: RegionTrigger) {
        self.registry.ensure_region(trigger.region.clone());
        self.triggers.push(trigger);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// The player, mutably (movement input, scripted placement).
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Looks up a charger.
    #[must_use]
    pub fn charger(&self, id: ActorId) -> Option<&Charger> {
        self.chargers.get(id)
    }

    /// All chargers.
    #[must_use]
    pub const fn chargers(&self) -> &ChargerPool {
        &self.chargers
    }

    /// Breakable props.
    #[must_use]
    pub fn props(&self) -> &[Breakable] {
        &self.props
    }

    /// Potions waiting to be picked up.
    #[must_use]
    pub fn potions(&self) -> &[PotionPickup] {
        &self.potions
    }

    /// Live hitboxes.
    #[must_use]
    pub fn hitboxes(&self) -> &[AttackHitbox] {
        &self.hitboxes
    }

    /// Region registry.
    #[must_use]
    pub const fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Respawn coordinator.
    #[must_use]
    pub const fn respawn(&self) -> &RespawnCoordinator {
        &self.respawn
    }

    /// Event bus.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.bus.drain()
    }

    /// Simulated seconds.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ------------------------------------------------------------------
    // Player actions
    // ------------------------------------------------------------------

    fn spawn_hitbox(&mut self, hitbox: AttackHitbox) {
        self.bus.publish(GameEvent::HitboxSpawned {
            owner: hitbox.owner,
            damage: hitbox.damage,
            center: hitbox.center(),
        });
        self.hitboxes.push(hitbox);
    }

    /// Performs the player's next light attack toward `direction`.
    pub fn player_light_attack(&mut self, direction: Vec2) -> Result<AttackKind, AttackRefusal> {
        let (kind, hitbox) = self.player.light_attack(direction)?;
        self.spawn_hitbox(hitbox);
        Ok(kind)
    }

    /// Starts charging the player's heavy attack.
    pub fn player_begin_heavy(&mut self) -> Result<(), AttackRefusal> {
        self.player.begin_heavy_charge()
    }

    /// Releases the player's heavy attack toward `direction`.
    pub fn player_release_heavy(&mut self, direction: Vec2) -> Result<AttackKind, AttackRefusal> {
        let (kind, hitbox) = self.player.release_heavy(direction)?;
        self.spawn_hitbox(hitbox);
        Ok(kind)
    }

    /// Starts the player's dodge dash.
    pub fn player_dash(&mut self) -> Result<Vec2, DashRefusal> {
        let direction = self.player.dash()?;
        self.bus.publish(GameEvent::Dashed {
            player: self.player.id(),
            direction,
        });
        Ok(direction)
    }

    /// Picks up every potion within reach of the player until the pouch is
    /// full. Returns how many were taken.
    pub fn player_collect_potions(&mut self) -> usize {
        if !self.player.is_alive() {
            return 0;
        }
        let center = self.player.position();
        let radius = self.player.profile().potion_pickup_radius;
        let mut collected = 0;
        let mut i = 0;
        while i < self.potions.len() {
            if !self.potions[i].within(center, radius) {
                i += 1;
                continue;
            }
            if !self.player.add_potion() {
                debug!("potion pouch full");
                break;
            }
            let potion = self.potions.swap_remove(i);
            collected += 1;
            self.bus.publish(GameEvent::PotionCollected {
                player: self.player.id(),
                potion: potion.id,
                carried: self.player.potions(),
            });
        }
        collected
    }

    /// Drinks one of the player's potions.
    pub fn player_use_potion(&mut self) -> Result<f32, PotionRefusal> {
        let healed = self.player.use_potion()?;
        self.bus.publish(GameEvent::PotionUsed {
            player: self.player.id(),
            healed,
            carried: self.player.potions(),
        });
        Ok(healed)
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Records entry into a region with its checkpoint. No-op for a
    /// checkpoint already reached.
    pub fn enter_new_region(&mut self, region: impl Into<RegionKey>, checkpoint: Vec2) -> bool {
        let region = region.into();
        let updated = self.registry.enter_new_region(region.clone(), checkpoint);
        if updated {
            self.bus.publish(GameEvent::CheckpointReached {
                region,
                position: checkpoint,
            });
        }
        updated
    }

    /// Revives and resets every charger of `region`. Unknown regions reset
    /// every charger.
    pub fn reset_region(&mut self, region: &RegionKey) -> RegionResetReport {
        let report = self.registry.reset_region(region, &mut self.chargers);
        self.flush_charger_events();
        self.bus.publish(GameEvent::RegionReset {
            region: report.region.clone(),
            actors: report.actors_reset,
        });
        report
    }

    // ------------------------------------------------------------------
    // Damage routing
    // ------------------------------------------------------------------

    /// Deals damage to any actor by ID: player, charger or prop.
    pub fn damage_actor(
        &mut self,
        target: ActorId,
        amount: f32,
        source: Option<ActorId>,
    ) -> DamageOutcome {
        if target == self.player.id() {
            return self.damage_player(amount, source);
        }
        if let Some(charger) = self.chargers.get_mut(target) {
            let outcome = apply_damage(charger, amount);
            let remaining = charger.health();
            let events = charger.drain_events();
            self.publish_damage(target, source, amount, remaining, outcome);
            self.publish_charger_events(events);
            return outcome;
        }
        if let Some(prop) = self.props.iter_mut().find(|p| p.id == target) {
            let outcome = apply_damage(prop, amount);
            let remaining = prop.hit_points() as f32;
            let drops_potion = prop.drops_potion;
            let position = prop.position;
            self.publish_damage(target, source, amount, remaining, outcome);
            if outcome.is_killed() {
                info!("prop {target} broke");
                self.bus.publish(GameEvent::PropBroken {
                    prop: target,
                    drops_potion,
                });
                if drops_potion {
                    let potion = PotionPickup::new(position);
                    self.bus.publish(GameEvent::PotionDropped {
                        potion: potion.id,
                        position,
                    });
                    self.potions.push(potion);
                }
            }
            return outcome;
        }
        debug!("damage to unknown actor {target} ignored");
        DamageOutcome::Ignored
    }

    fn damage_player(&mut self, amount: f32, source: Option<ActorId>) -> DamageOutcome {
        let outcome = apply_damage(&mut self.player, amount);
        let remaining = self.player.health();
        self.publish_damage(self.player.id(), source, amount, remaining, outcome);
        if outcome.is_killed() {
            self.player.interrupt_attack();
            self.bus.publish(GameEvent::PlayerDied {
                player: self.player.id(),
            });
            self.respawn.on_player_death();
        }
        outcome
    }

    fn publish_damage(
        &self,
        target: ActorId,
        source: Option<ActorId>,
        amount: f32,
        remaining: f32,
        outcome: DamageOutcome,
    ) {
        if outcome.landed() {
            self.bus.publish(GameEvent::Damaged {
                target,
                source,
                amount,
                remaining,
            });
        }
    }

    /// Forwards charger events to the bus; deaths are reported to the
    /// registry first.
    fn publish_charger_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            let died = match &event {
                GameEvent::StateChanged {
                    actor,
                    to: ChargerState::Dead,
                    ..
                } => Some(*actor),
                _ => None,
            };
            self.bus.publish(event);
            if let Some(actor) = died {
                let region = self.registry.record_death(actor);
                self.bus.publish(GameEvent::Died { actor, region });
            }
        }
    }

    fn flush_charger_events(&mut self) {
        let events: Vec<GameEvent> = self
            .chargers
            .iter_mut()
            .flat_map(Charger::drain_events)
            .collect();
        self.publish_charger_events(events);
    }

    fn resolve(&mut self, command: CombatCommand) {
        match command {
            CombatCommand::Strike {
                attacker,
                defender,
                damage,
                knockback,
            } => {
                if defender != self.player.id() {
                    return;
                }
                if apply_knockback(&mut self.player, knockback) {
                    self.bus.publish(GameEvent::KnockedBack {
                        target: defender,
                        direction: knockback,
                    });
                }
                self.damage_player(damage, Some(attacker));
            }
            CombatCommand::PeerClash {
                attacker,
                other,
                damage,
                knockback,
            } => {
                let Some(charger) = self.chargers.get_mut(other) else {
                    return;
                };
                if charger.state() == ChargerState::Dead {
                    debug!("{attacker} clashed with the corpse of {other}");
                    return;
                }
                charger.mark_clashed();
                let outcome = apply_damage(charger, damage);
                let remaining = charger.health();
                let pushed = apply_knockback(charger, knockback);
                let events = charger.drain_events();
                self.publish_damage(other, Some(attacker), damage, remaining, outcome);
                if pushed {
                    self.bus.publish(GameEvent::KnockedBack {
                        target: other,
                        direction: knockback,
                    });
                }
                self.publish_charger_events(events);
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Builds the overlap world for this tick.
    fn build_world(&self) -> OverlapWorld {
        let mut world = OverlapWorld::new();
        if self.player.is_alive() {
            world.insert(self.player.id(), LayerMask::PLAYER, self.player.bounds());
        }
        for charger in self.chargers.iter() {
            if charger.is_active() && charger.state() != ChargerState::Dead {
                world.insert(charger.id(), LayerMask::ENEMY, charger.bounds());
            }
        }
        for prop in &self.props {
            if !prop.is_broken() {
                world.insert(prop.id, LayerMask::BREAKABLE, prop.bounds());
            }
        }
        for collider in &self.terrain {
            world.insert(collider.id, collider.layer, collider.bounds);
        }
        world
    }

    /// Advances the whole session by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let mut world = self.build_world();

        self.player.tick(dt);

        // Each charger's commands are resolved before the next charger
        // updates, so a clash flags the other side in time. Chargers killed
        // along the way leave the world before anyone else queries it.
        for i in 0..self.chargers.len() {
            let charger = &mut self.chargers.chargers[i];
            let commands = charger.update(dt, &world);
            let events = charger.drain_events();
            let mut touched = vec![charger.id()];
            self.publish_charger_events(events);
            for command in commands {
                if let CombatCommand::PeerClash { other, .. } = command {
                    touched.push(other);
                }
                self.resolve(command);
            }
            for id in touched {
                if self.chargers.get(id).is_some_and(|c| c.state() == ChargerState::Dead) {
                    world.remove(id);
                }
            }
        }

        let mut hitboxes = std::mem::take(&mut self.hitboxes);
        for hitbox in &mut hitboxes {
            for target in hitbox.tick(dt, &world) {
                self.damage_actor(target, hitbox.damage, Some(hitbox.owner));
            }
        }
        hitboxes.retain(|h| !h.is_expired());
        self.hitboxes = hitboxes;

        self.player.integrate(dt);
        for charger in self.chargers.iter_mut() {
            charger.integrate(dt);
        }

        if self.player.is_alive() {
            let bounds = self.player.bounds();
            let mut entered = Vec::new();
            for trigger in &mut self.triggers {
                if trigger.observe(&bounds) {
                    entered.push((trigger.region.clone(), trigger.checkpoint_position()));
                }
            }
            for (region, checkpoint) in entered {
                self.enter_new_region(region, checkpoint);
            }
        }

        if self.respawn.tick(dt) {
            self.respawn_player();
        }

        self.tick_count += 1;
        self.elapsed += dt;
    }

    fn respawn_player(&mut self) {
        let position = self.registry.respawn_point();
        let region = self.registry.current_region().clone();
        self.player.respawn_at(position);
        for trigger in &mut self.triggers {
            trigger.clear_occupancy();
        }
        info!("player respawned at {position} in {region}");
        self.reset_region(&region);
        self.bus.publish(GameEvent::PlayerRespawned {
            player: self.player.id(),
            position,
            region,
        });
    }

    /// Serializable view.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.tick_count,
            elapsed: self.elapsed,
            player: PlayerSnapshot {
                id: self.player.id(),
                position: self.player.position(),
                health: self.player.health(),
                alive: self.player.is_alive(),
                potions: self.player.potions(),
            },
            chargers: self.chargers.iter().map(Charger::snapshot).collect(),
            hitboxes: self.hitboxes.iter().map(AttackHitbox::snapshot).collect(),
            current_region: self.registry.current_region().clone(),
            respawn_point: self.registry.respawn_point(),
            defeated: self.registry.defeated_total(),
            props_standing: self.props.iter().filter(|p| !p.is_broken()).count(),
            potions_on_ground: self.potions.len(),
            respawns: self.respawn.respawn_count(),
        }
    }
}
