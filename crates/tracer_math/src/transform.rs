// Transform utilities for Mat4
//
// Extends glam::Mat4 with convenience methods for ray tracing transformations.
// Note: glam::Mat4 already provides transform_point3() and inverse()

use crate::Aabb;
use glam::{Mat4, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a vector in 3D space (applies rotation and scale, but NOT translation).
    /// Vectors have an implicit w=0 component.
    fn transform_vector3(&self, vector: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_vector3(&self, vector: Vec3) -> Vec3 {
        // Transform as direction (w=0) - translation should not affect vectors
        let v4 = Vec4::new(vector.x, vector.y, vector.z, 0.0);
        let transformed = *self * v4;
        Vec3::new(transformed.x, transformed.y, transformed.z)
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        // Transform all 8 corners and compute new AABB (no heap allocation)
        let min_p = Vec3::new(aabb.x.min, aabb.y.min, aabb.z.min);
        let max_p = Vec3::new(aabb.x.max, aabb.y.max, aabb.z.max);

        // Transform first corner to initialize min/max
        let first = self.transform_point3(min_p);
        let mut result_min = first;
        let mut result_max = first;

        // Transform remaining 7 corners, updating min/max inline
        for corner in [
            Vec3::new(max_p.x, min_p.y, min_p.z),
            Vec3::new(min_p.x, max_p.y, min_p.z),
            Vec3::new(max_p.x, max_p.y, min_p.z),
            Vec3::new(min_p.x, min_p.y, max_p.z),
            Vec3::new(max_p.x, min_p.y, max_p.z),
            Vec3::new(min_p.x, max_p.y, max_p.z),
            Vec3::new(max_p.x, max_p.y, max_p.z),
        ] {
            let t = self.transform_point3(corner);
            result_min = result_min.min(t);
            result_max = result_max.max(t);
        }

        Aabb::from_points(result_min, result_max)
    }
}
