//! Region bookkeeping: which enemies live where, which are defeated, and
//! where the player respawns.
//!
//! The registry is owned by the session and only mutated from there (death
//! reports and resets on respawn). Actors are referenced by ID; the
//! [`ActorRoster`] seam lets the registry reset them without owning them.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use savannah_common::{ActorId, CheckpointKey, RegionKey, Vec2};

/// Name of the region the player starts in.
pub const DEFAULT_START_REGION: &str = "Savannah";

/// Access to the actors a registry can reset.
pub trait ActorRoster {
    /// Revives and resets one actor. Returns false if the ID is unknown.
    fn reset_actor(&mut self, id: ActorId) -> bool;

    /// Every actor the roster owns, in a stable order.
    fn actor_ids(&self) -> Vec<ActorId>;
}

/// Outcome of a region reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionResetReport {
    /// Region that was reset, or `None` when the global fallback ran
    pub region: Option<RegionKey>,
    /// Number of actors reset
    pub actors_reset: usize,
}

#[derive(Debug, Default, Clone)]
struct RegionEntry {
    actors: Vec<ActorId>,
    defeated: AHashSet<ActorId>,
}

// ============================================================================
// Checkpoints
// ============================================================================

/// Respawn point and checkpoint history.
#[derive(Debug, Clone)]
pub struct CheckpointState {
    respawn_point: Vec2,
    current_region: RegionKey,
    last_checkpoint_region: RegionKey,
    /// Only grows
    triggered: AHashSet<CheckpointKey>,
    cleared_regions: AHashSet<RegionKey>,
}

impl CheckpointState {
    /// Starts at `start_position` in `start_region`. The start position is
    /// already marked as triggered.
    #[must_use]
    pub fn new(start_region: RegionKey, start_position: Vec2) -> Self {
        let mut triggered = AHashSet::new();
        triggered.insert(CheckpointKey::from(start_position));
        Self {
            respawn_point: start_position,
            last_checkpoint_region: start_region.clone(),
            current_region: start_region,
            triggered,
            cleared_regions: AHashSet::new(),
        }
    }

    /// Records a checkpoint. No-op if this exact position was already used.
    pub fn update_respawn_point(&mut self, position: Vec2, region: RegionKey) -> bool {
        if !self.triggered.insert(CheckpointKey::from(position)) {
            return false;
        }
        self.last_checkpoint_region = std::mem::replace(&mut self.current_region, region.clone());
        self.respawn_point = position;
        self.cleared_regions.insert(region);
        true
    }

    /// Where the player respawns.
    #[must_use]
    pub const fn respawn_point(&self) -> Vec2 {
        self.respawn_point
    }

    /// Region of the current checkpoint.
    #[must_use]
    pub const fn current_region(&self) -> &RegionKey {
        &self.current_region
    }

    /// Region of the checkpoint before the current one.
    #[must_use]
    pub const fn last_checkpoint_region(&self) -> &RegionKey {
        &self.last_checkpoint_region
    }

    /// Whether a checkpoint in `region` has been reached.
    #[must_use]
    pub fn is_region_cleared(&self, region: &RegionKey) -> bool {
        self.cleared_regions.contains(region)
    }

    /// Whether `position` was already used as a checkpoint.
    #[must_use]
    pub fn is_triggered(&self, position: Vec2) -> bool {
        self.triggered.contains(&CheckpointKey::from(position))
    }

    /// Number of distinct checkpoints reached, including the start.
    #[must_use]
    pub fn triggered_count(&self) -> usize {
        self.triggered.len()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Region membership, defeated sets and checkpoints.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    regions: AHashMap<RegionKey, RegionEntry>,
    membership: AHashMap<ActorId, RegionKey>,
    checkpoints: CheckpointState,
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new(RegionKey::new(DEFAULT_START_REGION), Vec2::ZERO)
    }
}

impl RegionRegistry {
    /// Creates a registry whose first respawn point is `start_position`.
    #[must_use]
    pub fn new(start_region: RegionKey, start_position: Vec2) -> Self {
        let mut regions = AHashMap::new();
        regions.insert(start_region.clone(), RegionEntry::default());
        Self {
            regions,
            membership: AHashMap::new(),
            checkpoints: CheckpointState::new(start_region, start_position),
        }
    }

    /// Declares a region, possibly empty.
    pub fn ensure_region(&mut self, region: RegionKey) {
        self.regions.entry(region).or_default();
    }

    /// Adds `id` to `region`. Registering twice is a no-op; registering in a
    /// different region moves the actor.
    pub fn register_actor(&mut self, id: ActorId, region: RegionKey) -> bool {
        if self.membership.get(&id) == Some(&region) {
            return false;
        }
        self.unregister_actor(id);
        let entry = self.regions.entry(region.clone()).or_default();
        entry.actors.push(id);
        debug!("registered {id} in {region}");
        self.membership.insert(id, region);
        true
    }

    /// Adds `id` to the region the player is currently in.
    pub fn register_in_current_region(&mut self, id: ActorId) -> bool {
        let region = self.checkpoints.current_region().clone();
        self.register_actor(id, region)
    }

    /// Removes `id` from its region.
    pub fn unregister_actor(&mut self, id: ActorId) -> Option<RegionKey> {
        let region = self.membership.remove(&id)?;
        if let Some(entry) = self.regions.get_mut(&region) {
            entry.actors.retain(|a| *a != id);
            entry.defeated.remove(&id);
        }
        Some(region)
    }

    /// Marks `id` as defeated in its region. Unknown actors are ignored.
    pub fn record_death(&mut self, id: ActorId) -> Option<RegionKey> {
        let Some(region) = self.membership.get(&id) else {
            warn!("death of unregistered actor {id} ignored");
            return None;
        };
        if let Some(entry) = self.regions.get_mut(region) {
            entry.defeated.insert(id);
        }
        info!("{id} defeated in {region}");
        Some(region.clone())
    }

    /// Revives every actor of `region` and clears its defeated set.
    ///
    /// An unknown region falls back to resetting every actor the roster
    /// owns and clearing all defeated sets. Idempotent.
    pub fn reset_region<R: ActorRoster + ?Sized>(
        &mut self,
        region: &RegionKey,
        roster: &mut R,
    ) -> RegionResetReport {
        if let Some(entry) = self.regions.get_mut(region) {
            let mut actors_reset = 0;
            for id in &entry.actors {
                entry.defeated.remove(id);
                if roster.reset_actor(*id) {
                    actors_reset += 1;
                }
            }
            info!("reset {actors_reset} actors in {region}");
            return RegionResetReport {
                region: Some(region.clone()),
                actors_reset,
            };
        }

        warn!("reset of unknown region {region}, resetting every actor");
        for entry in self.regions.values_mut() {
            entry.defeated.clear();
        }
        let actors_reset = roster
            .actor_ids()
            .into_iter()
            .filter(|id| roster.reset_actor(*id))
            .count();
        RegionResetReport {
            region: None,
            actors_reset,
        }
    }

    /// Region `id` belongs to.
    #[must_use]
    pub fn region_of(&self, id: ActorId) -> Option<&RegionKey> {
        self.membership.get(&id)
    }

    /// Whether `id` is in its region's defeated set.
    #[must_use]
    pub fn is_defeated(&self, id: ActorId) -> bool {
        self.membership
            .get(&id)
            .and_then(|region| self.regions.get(region))
            .is_some_and(|entry| entry.defeated.contains(&id))
    }

    /// Actors registered in `region`, in registration order.
    #[must_use]
    pub fn actors_in(&self, region: &RegionKey) -> &[ActorId] {
        self.regions
            .get(region)
            .map(|entry| entry.actors.as_slice())
            .unwrap_or_default()
    }

    /// Number of defeated actors in `region`.
    #[must_use]
    pub fn defeated_in(&self, region: &RegionKey) -> usize {
        self.regions.get(region).map_or(0, |entry| entry.defeated.len())
    }

    /// Total defeated actors across all regions.
    #[must_use]
    pub fn defeated_total(&self) -> usize {
        self.regions.values().map(|entry| entry.defeated.len()).sum()
    }

    /// Whether `region` is known.
    #[must_use]
    pub fn has_region(&self, region: &RegionKey) -> bool {
        self.regions.contains_key(region)
    }

    /// Known region names, sorted.
    #[must_use]
    pub fn region_names(&self) -> Vec<RegionKey> {
        let mut names: Vec<_> = self.regions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Checkpoint state.
    #[must_use]
    pub const fn checkpoints(&self) -> &CheckpointState {
        &self.checkpoints
    }

    /// Records a checkpoint. See [`CheckpointState::update_respawn_point`].
    pub fn update_respawn_point(&mut self, position: Vec2, region: RegionKey) -> bool {
        self.ensure_region(region.clone());
        let updated = self.checkpoints.update_respawn_point(position, region);
        if updated {
            info!(
                "checkpoint {position} in {}",
                self.checkpoints.current_region()
            );
        }
        updated
    }

    /// Entry point for region-boundary triggers.
    pub fn enter_new_region(&mut self, region: RegionKey, checkpoint: Vec2) -> bool {
        self.update_respawn_point(checkpoint, region)
    }

    /// Where the player respawns.
    #[must_use]
    pub const fn respawn_point(&self) -> Vec2 {
        self.checkpoints.respawn_point()
    }

    /// Region of the current checkpoint.
    #[must_use]
    pub const fn current_region(&self) -> &RegionKey {
        self.checkpoints.current_region()
    }

    /// Whether a checkpoint in `region` has been reached.
    #[must_use]
    pub fn is_region_cleared(&self, region: &RegionKey) -> bool {
        self.checkpoints.is_region_cleared(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Roster that records resets.
    #[derive(Default)]
    struct MockRoster {
        ids: Vec<ActorId>,
        resets: Vec<ActorId>,
    }

    impl ActorRoster for MockRoster {
        fn reset_actor(&mut self, id: ActorId) -> bool {
            if self.ids.contains(&id) {
                self.resets.push(id);
                true
            } else {
                false
            }
        }

        fn actor_ids(&self) -> Vec<ActorId> {
            self.ids.clone()
        }
    }

    fn key(name: &str) -> RegionKey {
        RegionKey::new(name)
    }

    #[test]
    fn test_register_dedups_and_moves() {
        let mut registry = RegionRegistry::default();
        let id = ActorId::new();
        assert!(registry.register_actor(id, key("Savannah")));
        assert!(!registry.register_actor(id, key("Savannah")));
        assert_eq!(registry.actors_in(&key("Savannah")), &[id]);

        registry.record_death(id);
        assert!(registry.register_actor(id, key("Canyon")));
        assert!(registry.actors_in(&key("Savannah")).is_empty());
        assert_eq!(registry.region_of(id), Some(&key("Canyon")));
        assert!(!registry.is_defeated(id));
    }

    #[test]
    fn test_register_in_current_region() {
        let mut registry = RegionRegistry::default();
        let id = ActorId::new();
        registry.register_in_current_region(id);
        assert_eq!(registry.region_of(id), Some(&key(DEFAULT_START_REGION)));
    }

    #[test]
    fn test_record_death_unknown_actor() {
        let mut registry = RegionRegistry::default();
        assert_eq!(registry.record_death(ActorId::new()), None);
        assert_eq!(registry.defeated_total(), 0);
    }

    #[test]
    fn test_reset_region_is_idempotent() {
        let mut registry = RegionRegistry::default();
        let a = ActorId::new();
        let b = ActorId::new();
        let other = ActorId::new();
        registry.register_actor(a, key("Savannah"));
        registry.register_actor(b, key("Savannah"));
        registry.register_actor(other, key("Canyon"));
        registry.record_death(a);
        registry.record_death(other);

        let mut roster = MockRoster {
            ids: vec![a, b, other],
            ..MockRoster::default()
        };
        let first = registry.reset_region(&key("Savannah"), &mut roster);
        let second = registry.reset_region(&key("Savannah"), &mut roster);
        assert_eq!(first, second);
        assert_eq!(first.actors_reset, 2);
        assert!(!registry.is_defeated(a));
        assert!(registry.is_defeated(other));
        assert_eq!(roster.resets, vec![a, b, a, b]);
    }

    #[test]
    fn test_unknown_region_resets_everything() {
        let mut registry = RegionRegistry::default();
        let a = ActorId::new();
        let stray = ActorId::new();
        registry.register_actor(a, key("Savannah"));
        registry.record_death(a);

        let mut roster = MockRoster {
            ids: vec![a, stray],
            ..MockRoster::default()
        };
        let report = registry.reset_region(&key("Nowhere"), &mut roster);
        assert_eq!(report.region, None);
        assert_eq!(report.actors_reset, 2);
        assert_eq!(registry.defeated_total(), 0);
    }

    #[test]
    fn test_checkpoint_updates_once() {
        let mut registry = RegionRegistry::new(key("Savannah"), Vec2::ZERO);
        let cp = Vec2::new(10.0, 5.0);
        assert!(registry.update_respawn_point(cp, key("Canyon")));
        assert!(!registry.update_respawn_point(cp, key("Jungle")));

        assert_eq!(registry.respawn_point(), cp);
        assert_eq!(registry.current_region(), &key("Canyon"));
        assert_eq!(
            registry.checkpoints().last_checkpoint_region(),
            &key("Savannah")
        );
        assert!(registry.is_region_cleared(&key("Canyon")));
        assert!(!registry.is_region_cleared(&key("Jungle")));
        assert!(registry.has_region(&key("Canyon")));
    }

    #[test]
    fn test_start_point_is_pre_triggered() {
        let start = Vec2::new(1.0, 2.0);
        let mut registry = RegionRegistry::new(key("Savannah"), start);
        assert!(!registry.enter_new_region(key("Canyon"), start));
        assert_eq!(registry.current_region(), &key("Savannah"));
        assert_eq!(registry.checkpoints().triggered_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_triggered_set_only_grows(points in proptest::collection::vec((-20i32..20, -20i32..20), 1..30)) {
            let mut registry = RegionRegistry::default();
            let mut previous = registry.checkpoints().triggered_count();
            for (x, y) in points {
                let p = Vec2::new(x as f32, y as f32);
                let was_new = !registry.checkpoints().is_triggered(p);
                let updated = registry.update_respawn_point(p, key("Canyon"));
                prop_assert_eq!(updated, was_new);
                prop_assert!(registry.checkpoints().is_triggered(p));
                let count = registry.checkpoints().triggered_count();
                prop_assert!(count >= previous);
                previous = count;
            }
        }
    }
}
