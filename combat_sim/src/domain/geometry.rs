// Domain geometry: orientation helpers and axis-aligned bounding boxes.
//
// Angles are degrees stored as (pitch, yaw, roll) in a DVec3's (x, y, z). Forward is +Z and a
// positive pitch points down, so a rotation is built as yaw about Y, then pitch about X, then roll
// about Z.

use glam::{DMat3, DVec3};

/// Builds a rotation matrix from (pitch, yaw, roll) degrees.
pub fn rotation_from_angles(angles: DVec3) -> DMat3 {
    DMat3::from_rotation_y(angles.y.to_radians())
        * DMat3::from_rotation_x(angles.x.to_radians())
        * DMat3::from_rotation_z(angles.z.to_radians())
}

/// Returns the (pitch, yaw, 0) angles that rotate +Z onto `vector`.
pub fn vector_angles(vector: DVec3) -> DVec3 {
    let length = vector.length();
    if length == 0.0 {
        return DVec3::ZERO;
    }
    let yaw = vector.x.atan2(vector.z).to_degrees();
    let pitch = -(vector.y / length).clamp(-1.0, 1.0).asin().to_degrees();
    DVec3::new(pitch, yaw, 0.0)
}

/// Orientation whose forward axis faces along `vector`. Roll is dropped.
pub fn facing(vector: DVec3) -> DMat3 {
    rotation_from_angles(vector_angles(vector))
}

/// Expresses a world-space vector in the local frame of `orientation`.
pub fn re_origin(vector: DVec3, orientation: DMat3) -> DVec3 {
    orientation.transpose() * vector
}

/// Normalizes an angle into -180..=180 degrees.
pub fn wrap_degrees(angle: f64) -> f64 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// True if `first` is strictly closer to `origin` than `second`.
pub fn is_first_closer_than_second(origin: DVec3, first: DVec3, second: DVec3) -> bool {
    origin.distance_squared(first) < origin.distance_squared(second)
}

/// Damageable group a box belongs to. A group with zero health is the owner's core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionGroupRef {
    /// Index of the group in the owner's definition.
    pub index: usize,
    /// Health of the group; 0 marks a core group that forwards hits to the owner.
    pub health: f64,
}

/// Axis-aligned box positioned relative to an owning entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Center relative to the owner, in the owner's frame.
    pub local_center: DVec3,
    /// World-space center, refreshed from the owner's pose.
    pub global_center: DVec3,
    pub width_radius: f64,
    pub height_radius: f64,
    pub depth_radius: f64,
    /// Armor against kinetic projectiles.
    pub armor_thickness: f64,
    /// Armor against heat warheads; 0 means "use `armor_thickness`".
    pub heat_armor_thickness: f64,
    pub group: Option<CollisionGroupRef>,
}

impl BoundingBox {
    pub fn new(center: DVec3, width_radius: f64, height_radius: f64, depth_radius: f64) -> Self {
        Self {
            local_center: center,
            global_center: center,
            width_radius,
            height_radius,
            depth_radius,
            armor_thickness: 0.0,
            heat_armor_thickness: 0.0,
            group: None,
        }
    }

    /// Broad-phase box spanning the segment `start..end`.
    pub fn around_segment(start: DVec3, end: DVec3) -> Self {
        let half = (end - start).abs() * 0.5;
        Self::new((start + end) * 0.5, half.x, half.y, half.z)
    }

    /// Smallest box containing every box in `boxes`, or a point box at `fallback`.
    pub fn encompassing<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>, fallback: DVec3) -> Self {
        let mut bounds: Option<(DVec3, DVec3)> = None;
        for bounding_box in boxes {
            let (min, max) = (bounding_box.min(), bounding_box.max());
            bounds = Some(match bounds {
                Some((low, high)) => (low.min(min), high.max(max)),
                None => (min, max),
            });
        }
        match bounds {
            Some((min, max)) => {
                let half = (max - min) * 0.5;
                Self::new(min + half, half.x, half.y, half.z)
            }
            None => Self::new(fallback, 0.0, 0.0, 0.0),
        }
    }

    pub fn radii(&self) -> DVec3 {
        DVec3::new(self.width_radius, self.height_radius, self.depth_radius)
    }

    pub fn min(&self) -> DVec3 {
        self.global_center - self.radii()
    }

    pub fn max(&self) -> DVec3 {
        self.global_center + self.radii()
    }

    /// Moves the box with its owner.
    pub fn update_to_entity(&mut self, position: DVec3, orientation: DMat3) {
        self.global_center = position + orientation * self.local_center;
    }

    /// Strict overlap test; touching faces do not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let (min, max) = (self.min(), self.max());
        let (other_min, other_max) = (other.min(), other.max());
        min.x < other_max.x
            && max.x > other_min.x
            && min.y < other_max.y
            && max.y > other_min.y
            && min.z < other_max.z
            && max.z > other_min.z
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        let (min, max) = (self.min(), self.max());
        point.cmpge(min).all() && point.cmple(max).all()
    }

    /// First point where the segment `start..end` enters the box.
    ///
    /// A segment starting inside the box reports `start`.
    pub fn intersection_point(&self, start: DVec3, end: DVec3) -> Option<DVec3> {
        let delta = end - start;
        let (min, max) = (self.min(), self.max());
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;
        for axis in 0..3 {
            let origin = start[axis];
            let step = delta[axis];
            if step.abs() < f64::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }
            let mut near = (min[axis] - origin) / step;
            let mut far = (max[axis] - origin) / step;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t_enter = t_enter.max(near);
            t_exit = t_exit.min(far);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(start + delta * t_enter)
    }
}
