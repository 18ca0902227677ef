//! Bounding volumes for occupancy tests and static colliders
//!
//! Cells and static colliders are axis-aligned boxes. Spheres are tested
//! against them through the closest point on the box.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box of the given full size centered on `center`
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing every point (None if empty)
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() / 2.0
    }

    /// Point on (or in) the box nearest to `point`
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Sphere/box overlap; touching counts as intersecting
    #[inline]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let closest = self.closest_point(sphere.center);
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// A sphere used only for overlap tests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_center_size(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_from_center_size() {
        let b = Aabb::from_center_size(Vec3::new(3.0, 0.0, -3.0), Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(b.min, Vec3::new(2.5, -1.0, -3.5));
        assert_eq!(b.max, Vec3::new(3.5, 1.0, -2.5));
        assert_eq!(b.center(), Vec3::new(3.0, 0.0, -3.0));
    }

    #[test]
    fn test_sphere_inside_box() {
        let sphere = BoundingSphere::new(Vec3::new(0.1, 0.0, 0.0), 0.1);
        assert!(unit_box().intersects_sphere(&sphere));
    }

    #[test]
    fn test_sphere_touching_face() {
        // Center 1.5 from origin along x, radius 1 -> touches face at x=0.5
        let sphere = BoundingSphere::new(Vec3::new(1.5, 0.0, 0.0), 1.0);
        assert!(unit_box().intersects_sphere(&sphere));
    }

    #[test]
    fn test_sphere_near_corner_misses() {
        // Corner at (0.5, 0.5, 0.5); sphere center offset diagonally by 1.0 on each axis
        let sphere = BoundingSphere::new(Vec3::splat(1.5), 1.0);
        assert!(!unit_box().intersects_sphere(&sphere));
    }

    #[test]
    fn test_from_points() {
        let b = Aabb::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 4.0, 2.0),
            Vec3::new(0.0, 0.0, -3.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 2.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_closest_point_clamps() {
        let p = unit_box().closest_point(Vec3::new(5.0, 0.2, -5.0));
        assert_eq!(p, Vec3::new(0.5, 0.2, -0.5));
        assert!(unit_box().contains_point(p));
    }
}
