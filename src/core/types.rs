//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use glam::Vec3;

/// Unique identifier for actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a live skill cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of an ability in the catalog ("fireball", "chain_lightning", ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute game-clock time in seconds
pub type GameTime = f64;

/// Directions shorter than this are treated as zero
pub const DIRECTION_EPSILON: f32 = 1.0e-4;

/// Distance on the ground plane (y is up)
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Unit direction from `from` to `to` on the ground plane.
///
/// Returns `None` when the points coincide, so callers never divide by zero.
pub fn planar_direction(from: Vec3, to: Vec3) -> Option<Vec3> {
    let delta = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
    let len = delta.length();
    if len > DIRECTION_EPSILON && len.is_finite() {
        Some(delta / len)
    } else {
        None
    }
}

/// Yaw (radians around +y) that faces along `direction`
#[inline]
pub fn yaw_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Distance from `point` to the segment `a..b`, measured on the ground plane
pub fn planar_distance_to_segment(point: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = Vec3::new(b.x - a.x, 0.0, b.z - a.z);
    let ap = Vec3::new(point.x - a.x, 0.0, point.z - a.z);
    let len_sq = ab.length_squared();
    if len_sq <= DIRECTION_EPSILON * DIRECTION_EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / len_sq).clamp(0.0, 1.0);
    (ap - ab * t).length()
}
