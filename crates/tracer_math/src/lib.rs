//! Shared math primitives: vectors/matrices (re-exported from `glam`),
//! intervals, axis-aligned bounding boxes, rays and transform helpers.
//!
//! Kept deliberately small and dependency-light, the same way the rest of
//! this lineage treats its math layer: a thin, generic foundation that the
//! tracer core builds time-sampling and motion blur on top of.

// Re-export glam for convenience — Vec3, Mat4, Quat etc. are primitives here.
pub use glam::*;

mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::Mat4Ext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        let c = a + b;
        assert_eq!(c, Vec3::new(5.0, 7.0, 9.0));
    }
}
