//! Player detection and roaming.
//!
//! The sensor has two modes. While roaming it periodically hands the
//! pathfinding driver a random heading and watches for the player. While
//! tracking it watches for the player leaving range. Mode changes are
//! returned from [`DetectionSensor::tick`] as [`SensorEvent`]s for the owning
//! charger to consume in the same update.

use serde::{Deserialize, Serialize};
use tracing::debug;

use savannah_common::{ActorId, Vec2};

use crate::movement::PathfindingDriver;
use crate::spatial::{LayerMask, Shape, SpatialQuery};
use crate::timer::Interval;

/// Sensor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorMode {
    /// Wandering, looking for a target
    Roaming,
    /// Locked on a target, watching for it to leave
    Tracking,
}

/// Mode change reported to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorEvent {
    /// A target entered range
    Acquired(ActorId),
    /// The tracked target left range or disappeared
    Lost,
}

/// Detection sensor attached to a charger.
#[derive(Debug, Clone)]
pub struct DetectionSensor {
    /// Detection radius
    pub radius: f32,
    mode: SensorMode,
    target: Option<ActorId>,
    roam: Interval,
    rng: fastrand::Rng,
}

impl DetectionSensor {
    /// Creates a roaming sensor. The seed drives roam headings.
    #[must_use]
    pub fn new(radius: f32, roam_interval: f32, seed: u64) -> Self {
        Self {
            radius,
            mode: SensorMode::Roaming,
            target: None,
            roam: Interval::new(roam_interval),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> SensorMode {
        self.mode
    }

    /// Tracked target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<ActorId> {
        self.target
    }

    /// Forces roaming without emitting an event. The next tick picks a
    /// fresh heading.
    pub fn start_roaming(&mut self, driver: &mut PathfindingDriver) {
        self.mode = SensorMode::Roaming;
        self.target = None;
        self.roam.fire_next_tick();
        driver.stop();
    }

    /// Forces tracking of `target` without emitting an event.
    pub fn track(&mut self, target: ActorId, driver: &mut PathfindingDriver) {
        self.mode = SensorMode::Tracking;
        self.target = Some(target);
        driver.stop();
    }

    /// Uniformly random heading, normalized.
    fn roam_heading(&mut self) -> Vec2 {
        let x = self.rng.f32() * 2.0 - 1.0;
        let y = self.rng.f32() * 2.0 - 1.0;
        Vec2::new(x, y).normalize_or_zero()
    }

    /// Nearest player within the radius, measured center to center.
    fn nearest_candidate<S: SpatialQuery>(&self, origin: Vec2, spatial: &S) -> Option<ActorId> {
        let area = Shape::circle(origin, self.radius);
        spatial
            .query_area(&area, LayerMask::PLAYER)
            .into_iter()
            .filter_map(|id| {
                let distance = spatial.position_of(id)?.distance(origin);
                (distance <= self.radius).then_some((id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Runs one detection step from `origin`.
    pub fn tick<S: SpatialQuery>(
        &mut self,
        dt: f32,
        origin: Vec2,
        spatial: &S,
        driver: &mut PathfindingDriver,
    ) -> Option<SensorEvent> {
        match self.mode {
            SensorMode::Roaming => {
                if let Some(id) = self.nearest_candidate(origin, spatial) {
                    self.track(id, driver);
                    debug!("sensor acquired {id}");
                    return Some(SensorEvent::Acquired(id));
                }
                if self.roam.tick(dt) {
                    let heading = self.roam_heading();
                    driver.move_to(heading);
                }
                None
            }
            SensorMode::Tracking => {
                let in_range = self
                    .target
                    .and_then(|id| spatial.position_of(id))
                    .is_some_and(|pos| pos.distance(origin) <= self.radius);
                if in_range {
                    return None;
                }
                self.start_roaming(driver);
                debug!("sensor lost target");
                Some(SensorEvent::Lost)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::OverlapWorld;

    fn world_with_player(at: Vec2) -> (OverlapWorld, ActorId) {
        let id = ActorId::new();
        let mut world = OverlapWorld::new();
        world.insert_at(id, LayerMask::PLAYER, at, Vec2::splat(0.4));
        (world, id)
    }

    #[test]
    fn test_acquires_player_in_range() {
        let (world, player) = world_with_player(Vec2::new(3.0, 0.0));
        let mut sensor = DetectionSensor::new(5.0, 2.0, 7);
        let mut driver = PathfindingDriver::new(2.0);

        let event = sensor.tick(0.1, Vec2::ZERO, &world, &mut driver);
        assert_eq!(event, Some(SensorEvent::Acquired(player)));
        assert_eq!(sensor.mode(), SensorMode::Tracking);
        assert_eq!(driver.heading(), Vec2::ZERO);

        // No repeated event while the player stays in range.
        assert_eq!(sensor.tick(0.1, Vec2::ZERO, &world, &mut driver), None);
    }

    #[test]
    fn test_loses_player_out_of_range() {
        let (mut world, player) = world_with_player(Vec2::new(3.0, 0.0));
        let mut sensor = DetectionSensor::new(5.0, 2.0, 7);
        let mut driver = PathfindingDriver::new(2.0);
        sensor.tick(0.1, Vec2::ZERO, &world, &mut driver);

        world.remove(player);
        world.insert_at(player, LayerMask::PLAYER, Vec2::new(9.0, 0.0), Vec2::splat(0.4));
        assert_eq!(
            sensor.tick(0.1, Vec2::ZERO, &world, &mut driver),
            Some(SensorEvent::Lost)
        );
        assert_eq!(sensor.mode(), SensorMode::Roaming);
        assert_eq!(sensor.target(), None);
        assert_eq!(sensor.tick(0.1, Vec2::ZERO, &world, &mut driver), None);
    }

    #[test]
    fn test_vanished_target_is_lost() {
        let (mut world, player) = world_with_player(Vec2::new(1.0, 0.0));
        let mut sensor = DetectionSensor::new(5.0, 2.0, 7);
        let mut driver = PathfindingDriver::new(2.0);
        sensor.tick(0.1, Vec2::ZERO, &world, &mut driver);
        world.clear();
        assert_eq!(
            sensor.tick(0.1, Vec2::ZERO, &world, &mut driver),
            Some(SensorEvent::Lost)
        );
    }

    #[test]
    fn test_roams_without_player() {
        let world = OverlapWorld::new();
        let mut sensor = DetectionSensor::new(5.0, 2.0, 42);
        let mut driver = PathfindingDriver::new(2.0);

        assert_eq!(sensor.tick(0.1, Vec2::ZERO, &world, &mut driver), None);
        let first = driver.heading();
        assert!((first.length() - 1.0).abs() < 1e-4);
        assert_eq!(sensor.mode(), SensorMode::Roaming);

        // Heading holds until the interval elapses.
        for _ in 0..5 {
            sensor.tick(0.1, Vec2::ZERO, &world, &mut driver);
        }
        assert_eq!(driver.heading(), first);
    }

    #[test]
    fn test_edge_of_range_counts() {
        let (world, player) = world_with_player(Vec2::new(5.0, 0.0));
        let mut sensor = DetectionSensor::new(5.0, 2.0, 1);
        let mut driver = PathfindingDriver::new(2.0);
        assert_eq!(
            sensor.tick(0.1, Vec2::ZERO, &world, &mut driver),
            Some(SensorEvent::Acquired(player))
        );
    }
}
