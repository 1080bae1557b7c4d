//! Spatial queries: overlap tests between shapes and tagged colliders.
//!
//! The combat core never owns a physics engine. Everything it needs from the
//! world is behind [`SpatialQuery`]: which actors overlap a shape on a given
//! layer, and where an actor currently is. [`OverlapWorld`] is the in-memory
//! implementation the session rebuilds every tick; a host engine can provide
//! its own.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use savannah_common::{ActorId, Vec2};

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// The player character.
    pub const PLAYER: Self = Self(1);
    /// Hostile actors (chargers).
    pub const ENEMY: Self = Self(1 << 1);
    /// Static walls and rocks.
    pub const OBSTACLE: Self = Self(1 << 2);
    /// Pits and ledges.
    pub const GAP: Self = Self(1 << 3);
    /// Breakable props (pots, crates).
    pub const BREAKABLE: Self = Self(1 << 4);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Checks whether any layer is shared with `other`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Checks whether all layers of `other` are in this mask.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Returns the center of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents of the box.
    #[must_use]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Checks if this box overlaps another. Touching edges count.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Checks if a point lies inside the box (edges included).
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Closest point of the box to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Returns the box translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// Query shape for overlap tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned rectangle
    Rect {
        /// Center of the rectangle
        center: Vec2,
        /// Half width and half height
        half_extents: Vec2,
    },
    /// Circle
    Circle {
        /// Center of the circle
        center: Vec2,
        /// Radius
        radius: f32,
    },
}

impl Shape {
    /// Rectangle centered on `center`.
    #[must_use]
    pub fn rect(center: Vec2, half_extents: Vec2) -> Self {
        Self::Rect {
            center,
            half_extents,
        }
    }

    /// Circle centered on `center`.
    #[must_use]
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle { center, radius }
    }

    /// Checks whether the shape overlaps a box.
    #[must_use]
    pub fn overlaps_aabb(&self, bounds: &Aabb) -> bool {
        match *self {
            Self::Rect {
                center,
                half_extents,
            } => Aabb::from_center(center, half_extents).overlaps(bounds),
            Self::Circle { center, radius } => {
                bounds.closest_point(center).distance_squared(center) <= radius * radius
            }
        }
    }
}

/// Spatial query interface the combat core consumes.
///
/// Stands in for the host engine's physics overlap API and for resolving
/// weak actor references to live positions.
pub trait SpatialQuery {
    /// Returns every collider on a layer in `mask` that overlaps `shape`.
    fn query_area(&self, shape: &Shape, mask: LayerMask) -> Vec<ActorId>;

    /// Resolves an actor to its current position, or `None` if it is gone.
    fn position_of(&self, id: ActorId) -> Option<Vec2>;

    /// Checks whether anything on `mask` overlaps `shape`.
    fn overlaps_any(&self, shape: &Shape, mask: LayerMask) -> bool {
        !self.query_area(shape, mask).is_empty()
    }
}

/// A collider registered in an [`OverlapWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Owner of the collider
    pub id: ActorId,
    /// Layer the collider lives on (a single bit)
    pub layer: LayerMask,
    /// World-space bounds
    pub bounds: Aabb,
}

/// Brute-force overlap world.
///
/// Holds a flat list of colliders; fine for the handful of actors a region
/// contains. Insertion order is preserved so query results are deterministic.
#[derive(Debug, Default, Clone)]
pub struct OverlapWorld {
    colliders: Vec<Collider>,
}

impl OverlapWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider.
    pub fn insert(&mut self, id: ActorId, layer: LayerMask, bounds: Aabb) {
        self.colliders.push(Collider { id, layer, bounds });
    }

    /// Adds a collider centered on `center`.
    pub fn insert_at(&mut self, id: ActorId, layer: LayerMask, center: Vec2, half_extents: Vec2) {
        self.insert(id, layer, Aabb::from_center(center, half_extents));
    }

    /// Removes every collider owned by `id`.
    pub fn remove(&mut self, id: ActorId) {
        self.colliders.retain(|c| c.id != id);
    }

    /// Removes all colliders.
    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    /// Number of colliders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Checks if the world is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Iterates over all colliders.
    pub fn colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }
}

impl SpatialQuery for OverlapWorld {
    fn query_area(&self, shape: &Shape, mask: LayerMask) -> Vec<ActorId> {
        let mut hits = Vec::new();
        for collider in &self.colliders {
            if collider.layer.intersects(mask)
                && shape.overlaps_aabb(&collider.bounds)
                && !hits.contains(&collider.id)
            {
                hits.push(collider.id);
            }
        }
        hits
    }

    fn position_of(&self, id: ActorId) -> Option<Vec2> {
        self.colliders
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.bounds.center())
    }
}
