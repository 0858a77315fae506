//! The hit record produced by every primitive intersector and consumed by
//! shading. One `Intersection` per ray in a batch, reused across the whole
//! traversal rather than allocated per candidate hit.

use tracer_math::{Mat4, Vec3};

use crate::shading::SurfaceClosure;

/// Differential geometry and shading inputs at a ray/surface hit.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub hit: bool,
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
    /// Surface tangents.
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    /// Normal derivatives, used by shaders that need curvature (e.g. for
    /// anisotropic highlights or bump-mapping consistency checks).
    pub dndu: Vec3,
    pub dndv: Vec3,
    pub u: f32,
    pub v: f32,
    pub backfacing: bool,
    /// Offset to nudge the next ray's origin off the surface, scaled to
    /// the hit's local geometric error so it works at any scene scale.
    pub offset: Vec3,
    /// Index of the instance/object/sub-element that was hit, for shader
    /// and light lookups.
    pub element_id: u32,
    /// World-to-hit-local transform in effect at the hit (the product of
    /// every instance transform along the path), used to bring shading
    /// vectors in and out of the local frame a closure was authored in.
    pub world_to_local: Mat4,
    pub closure: SurfaceClosure,
}

impl Intersection {
    pub fn miss() -> Self {
        Self {
            hit: false,
            t: f32::INFINITY,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            dpdu: Vec3::ZERO,
            dpdv: Vec3::ZERO,
            dndu: Vec3::ZERO,
            dndv: Vec3::ZERO,
            u: 0.0,
            v: 0.0,
            backfacing: false,
            offset: Vec3::ZERO,
            element_id: u32::MAX,
            world_to_local: Mat4::IDENTITY,
            closure: SurfaceClosure::None,
        }
    }

    /// Record a hit, flipping the normal and `backfacing` if it points
    /// away from the incoming ray direction, and computing a
    /// self-intersection offset proportional to the hit distance.
    pub fn record(
        &mut self,
        t: f32,
        point: Vec3,
        mut normal: Vec3,
        dpdu: Vec3,
        dpdv: Vec3,
        dndu: Vec3,
        dndv: Vec3,
        u: f32,
        v: f32,
        incoming_dir: Vec3,
        element_id: u32,
    ) {
        let backfacing = normal.dot(incoming_dir) > 0.0;
        if backfacing {
            normal = -normal;
        }
        self.hit = true;
        self.t = t;
        self.point = point;
        self.normal = normal;
        self.dpdu = dpdu;
        self.dpdv = dpdv;
        self.dndu = dndu;
        self.dndv = dndv;
        self.u = u;
        self.v = v;
        self.backfacing = backfacing;
        self.offset = normal * (t.abs().max(1.0) * 1e-5);
        self.element_id = element_id;
    }
}

impl Default for Intersection {
    fn default() -> Self {
        Self::miss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_is_default() {
        let hit = Intersection::miss();
        assert!(!hit.hit);
        assert_eq!(hit.t, f32::INFINITY);
    }

    #[test]
    fn test_record_flips_backfacing_normal() {
        let mut hit = Intersection::miss();
        hit.record(
            2.0,
            Vec3::ZERO,
            Vec3::Z,
            Vec3::X,
            Vec3::Y,
            Vec3::ZERO,
            Vec3::ZERO,
            0.5,
            0.5,
            Vec3::Z,
            7,
        );
        assert!(hit.hit);
        assert!(hit.backfacing);
        assert_eq!(hit.normal, -Vec3::Z);
        assert_eq!(hit.element_id, 7);
    }

    #[test]
    fn test_record_keeps_front_facing_normal() {
        let mut hit = Intersection::miss();
        hit.record(
            2.0,
            Vec3::ZERO,
            Vec3::Z,
            Vec3::X,
            Vec3::Y,
            Vec3::ZERO,
            Vec3::ZERO,
            0.5,
            0.5,
            -Vec3::Z,
            3,
        );
        assert!(!hit.backfacing);
        assert_eq!(hit.normal, Vec3::Z);
    }
}
