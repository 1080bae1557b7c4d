//! 2D math helpers shared by the combat systems.

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// Direction that pushes `defender` away from `attacker`.
///
/// Returns zero when both stand on the same point.
#[must_use]
pub fn knockback_direction(attacker: Vec2, defender: Vec2) -> Vec2 {
    (defender - attacker).normalize_or_zero()
}

/// Unit vector from `from` towards `to`, or zero when they coincide.
#[must_use]
pub fn heading_towards(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Hashable, exact representation of a checkpoint position.
///
/// Checkpoints are compared by exact coordinates, so the raw bits are kept.
/// `-0.0` is folded into `0.0` so both spellings name the same point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    x_bits: u32,
    y_bits: u32,
}

impl CheckpointKey {
    /// Builds a key from a position.
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            x_bits: canonical_bits(position.x),
            y_bits: canonical_bits(position.y),
        }
    }

    /// Returns the position this key was built from.
    #[must_use]
    pub fn position(self) -> Vec2 {
        Vec2::new(f32::from_bits(self.x_bits), f32::from_bits(self.y_bits))
    }
}

impl From<Vec2> for CheckpointKey {
    fn from(position: Vec2) -> Self {
        Self::from_position(position)
    }
}

fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0.0_f32.to_bits()
    } else {
        value.to_bits()
    }
}
