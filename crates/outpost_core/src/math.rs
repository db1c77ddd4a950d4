//! Vector, angle and bounding-box helpers.
//!
//! Angles are `Vec3` triples of (pitch, yaw, roll) in degrees, with
//! positive pitch looking down, matching the engine's conventions.

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Index of pitch in an angle triple.
pub const PITCH: usize = 0;
/// Index of yaw in an angle triple.
pub const YAW: usize = 1;
/// Index of roll in an angle triple.
pub const ROLL: usize = 2;

/// World up vector.
pub const UP: Vec3 = Vec3::Z;

/// Axis-aligned bounding box in absolute or local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub mins: Vec3,
    /// Maximum corner.
    pub maxs: Vec3,
}

impl Aabb {
    /// Create a box from its corners.
    #[must_use]
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Absolute box of local bounds placed at `origin`.
    #[must_use]
    pub fn at(origin: Vec3, mins: Vec3, maxs: Vec3) -> Self {
        Self {
            mins: origin + mins,
            maxs: origin + maxs,
        }
    }

    /// Cube of half-extent `r` around `center`.
    #[must_use]
    pub fn around(center: Vec3, r: f32) -> Self {
        Self::at(center, Vec3::splat(-r), Vec3::splat(r))
    }

    /// Overlap test. Touching faces count as intersecting.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.mins.cmple(other.maxs).all() && self.maxs.cmpge(other.mins).all()
    }

    /// Whether `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        self.mins.cmple(point).all() && self.maxs.cmpge(point).all()
    }

    /// Grow the box by `amount` on every side.
    #[must_use]
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            mins: self.mins - Vec3::splat(amount),
            maxs: self.maxs + Vec3::splat(amount),
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }
}

/// Convert a direction into (pitch, yaw, 0) angles.
#[must_use]
pub fn vec_to_angles(v: Vec3) -> Vec3 {
    let (pitch, yaw) = if v.x == 0.0 && v.y == 0.0 {
        (if v.z > 0.0 { 90.0 } else { 270.0 }, 0.0)
    } else {
        let mut yaw = v.y.atan2(v.x).to_degrees();
        if yaw < 0.0 {
            yaw += 360.0;
        }
        let forward = (v.x * v.x + v.y * v.y).sqrt();
        let mut pitch = v.z.atan2(forward).to_degrees();
        if pitch < 0.0 {
            pitch += 360.0;
        }
        (pitch, yaw)
    };
    Vec3::new(-pitch, yaw, 0.0)
}

/// Forward, right and up vectors of an angle triple.
#[must_use]
pub fn angle_vectors(angles: Vec3) -> (Vec3, Vec3, Vec3) {
    let (sy, cy) = angles[YAW].to_radians().sin_cos();
    let (sp, cp) = angles[PITCH].to_radians().sin_cos();
    let (sr, cr) = angles[ROLL].to_radians().sin_cos();

    let forward = Vec3::new(cp * cy, cp * sy, -sp);
    let right = Vec3::new(
        -sr * sp * cy + cr * sy,
        -sr * sp * sy - cr * cy,
        -sr * cp,
    );
    let up = Vec3::new(cr * sp * cy + sr * sy, cr * sp * sy - sr * cy, cr * cp);
    (forward, right, up)
}

/// Shortest signed difference `a1 - a2` in `[-180, 180]`.
#[must_use]
pub fn angle_subtract(a1: f32, a2: f32) -> f32 {
    let mut a = a1 - a2;
    while a > 180.0 {
        a -= 360.0;
    }
    while a < -180.0 {
        a += 360.0;
    }
    a
}

/// Normalize an angle into `[0, 360)`.
#[must_use]
pub fn angle_normalize_360(angle: f32) -> f32 {
    angle.rem_euclid(360.0)
}

/// Normalize an angle into `(-180, 180]`.
#[must_use]
pub fn angle_normalize_180(angle: f32) -> f32 {
    let a = angle_normalize_360(angle);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

/// Rotate `point` by `degrees` around `axis`. A zero axis leaves the point unchanged.
#[must_use]
pub fn rotate_point_around_vector(axis: Vec3, point: Vec3, degrees: f32) -> Vec3 {
    match axis.try_normalize() {
        Some(axis) => glam::Quat::from_axis_angle(axis, degrees.to_radians()) * point,
        None => point,
    }
}

/// Project `point` onto the plane through the origin with the given normal.
#[must_use]
pub fn project_point_on_plane(point: Vec3, normal: Vec3) -> Vec3 {
    let len_sq = normal.length_squared();
    if len_sq == 0.0 {
        return point;
    }
    point - normal * (normal.dot(point) / len_sq)
}
