//! Kinematic movement: the pathfinding driver and the body integrator.
//!
//! A [`PathfindingDriver`] turns a desired heading into a per-tick
//! displacement. A [`Body`] carries the physics velocity that knockback and
//! attack dashes write into. Both feed [`Body::integrate`].

use serde::{Deserialize, Serialize};

use savannah_common::Vec2;

/// Converts a desired heading into continuous movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathfindingDriver {
    /// Units per second along the heading
    pub move_speed: f32,
    /// Current heading. Expected to be unit length or zero.
    heading: Vec2,
    /// Disabled drivers contribute no movement
    enabled: bool,
}

impl Default for PathfindingDriver {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl PathfindingDriver {
    /// Creates an enabled driver with no heading.
    #[must_use]
    pub const fn new(move_speed: f32) -> Self {
        Self {
            move_speed,
            heading: Vec2::ZERO,
            enabled: true,
        }
    }

    /// Sets the heading to follow. Non-finite input stops the driver.
    pub fn move_to(&mut self, heading: Vec2) {
        self.heading = if heading.is_finite() {
            heading
        } else {
            Vec2::ZERO
        };
    }

    /// Clears the heading.
    pub fn stop(&mut self) {
        self.heading = Vec2::ZERO;
    }

    /// Enables or disables the driver. The heading is kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the driver is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current heading.
    #[must_use]
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Displacement produced over `dt`.
    #[must_use]
    pub fn step(&self, dt: f32) -> Vec2 {
        if self.enabled {
            self.heading * (self.move_speed * dt)
        } else {
            Vec2::ZERO
        }
    }
}

/// Position and velocity of a moving actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// World position
    pub position: Vec2,
    /// Physics velocity (units per second)
    pub velocity: Vec2,
}

impl Body {
    /// Creates a body at rest.
    #[must_use]
    pub const fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }

    /// Advances the position by velocity plus an extra displacement.
    pub fn integrate(&mut self, dt: f32, drive: Vec2) {
        self.position += self.velocity * dt + drive;
    }

    /// Moves the body without touching velocity.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Zeroes velocity.
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_step() {
        let mut driver = PathfindingDriver::new(2.0);
        driver.move_to(Vec2::X);
        assert_eq!(driver.step(0.5), Vec2::new(1.0, 0.0));

        driver.set_enabled(false);
        assert_eq!(driver.step(0.5), Vec2::ZERO);
        assert_eq!(driver.heading(), Vec2::X);

        driver.set_enabled(true);
        driver.stop();
        assert_eq!(driver.step(0.5), Vec2::ZERO);
    }

    #[test]
    fn test_driver_rejects_nan() {
        let mut driver = PathfindingDriver::default();
        driver.move_to(Vec2::new(f32::NAN, 1.0));
        assert_eq!(driver.heading(), Vec2::ZERO);
    }

    #[test]
    fn test_body_integrate() {
        let mut body = Body::at(Vec2::ZERO);
        body.velocity = Vec2::new(10.0, 0.0);
        body.integrate(0.1, Vec2::new(0.0, 0.2));
        assert!((body.position - Vec2::new(1.0, 0.2)).length() < 1e-6);
        body.halt();
        assert_eq!(body.velocity, Vec2::ZERO);
    }
}
