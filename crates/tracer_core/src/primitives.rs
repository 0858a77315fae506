//! The concrete geometric variants an `Object` can hold besides the patch
//! types in `patch.rs`: analytic spheres and the two light shapes. Kept in
//! their own module since none of them need the splitting-plane machinery
//! patches do — each is a single closed-form intersection test.

use tracer_math::{Aabb, Vec3};

use crate::intersection::Intersection;
use crate::ray::Ray;
use crate::timesample::TimeSampled;

/// A time-sampled analytic sphere.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: TimeSampled<Vec3>,
    radius: f32,
}

impl Sphere {
    pub fn new(centers: Vec<Vec3>, radius: f32) -> Self {
        Self {
            center: TimeSampled::new(centers),
            radius,
        }
    }

    pub fn bounds(&self) -> Vec<Aabb> {
        self.center
            .samples()
            .iter()
            .map(|&c| Aabb::from_points(c - Vec3::splat(self.radius), c + Vec3::splat(self.radius)))
            .collect()
    }

    /// Intersect every active ray in `ray_ids` against this sphere at its
    /// own time sample, recording hits directly (no splitting needed for
    /// an analytic primitive).
    pub fn intersect_batch(
        &self,
        rays: &mut [Ray],
        hits: &mut [Intersection],
        ray_ids: &[u32],
        element_id: u32,
    ) {
        for &id in ray_ids {
            let id = id as usize;
            let ray = &mut rays[id];
            if ray.flags.is_done() {
                continue;
            }
            let center = self.center.sample(ray.time());
            let oc = ray.origin() - center;
            let d = ray.direction();
            let a = d.dot(d);
            let b = 2.0 * oc.dot(d);
            let c = oc.dot(oc) - self.radius * self.radius;
            let disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                continue;
            }
            let sqrt_disc = disc.sqrt();
            let t0 = (-b - sqrt_disc) / (2.0 * a);
            let t1 = (-b + sqrt_disc) / (2.0 * a);
            let t = if t0 > 1e-4 && t0 <= ray.max_t {
                t0
            } else if t1 > 1e-4 && t1 <= ray.max_t {
                t1
            } else {
                continue;
            };

            let point = ray.at(t);
            let normal = (point - center) / self.radius;
            // Tangent basis: any vector orthogonal to the normal works for
            // an analytic sphere since no texture parameterization is
            // specified by the closed Object variant set.
            let raw_tangent = normal.cross(Vec3::Y);
            let dpdu = if raw_tangent.length_squared() > 1e-12 {
                raw_tangent.normalize()
            } else {
                Vec3::X
            };
            let dpdv = normal.cross(dpdu);
            ray.max_t = t;
            hits[id].record(
                t,
                point,
                normal,
                dpdu,
                dpdv,
                Vec3::ZERO,
                Vec3::ZERO,
                0.0,
                0.0,
                d,
                element_id,
            );
            if ray.flags.is_occlusion() {
                ray.flags.set_done();
            }
        }
    }
}

/// An axis-local rectangle light: a flat quad spanning `half_extents` on
/// the local x/y plane, emitting `radiance` from its +z face.
#[derive(Debug, Clone)]
pub struct RectangleLight {
    pub half_extents: Vec3,
    pub radiance: [f32; 3],
}

impl RectangleLight {
    pub fn bounds(&self) -> Vec<Aabb> {
        vec![Aabb::from_points(
            Vec3::new(-self.half_extents.x, -self.half_extents.y, 0.0),
            Vec3::new(self.half_extents.x, self.half_extents.y, 0.0),
        )]
    }

    pub fn intersect_batch(
        &self,
        rays: &mut [Ray],
        hits: &mut [Intersection],
        ray_ids: &[u32],
        element_id: u32,
    ) {
        for &id in ray_ids {
            let id = id as usize;
            let ray = &mut rays[id];
            if ray.flags.is_done() || ray.direction().z.abs() < 1e-8 {
                continue;
            }
            let t = -ray.origin().z / ray.direction().z;
            if t <= 1e-4 || t > ray.max_t {
                continue;
            }
            let p = ray.at(t);
            if p.x.abs() > self.half_extents.x || p.y.abs() > self.half_extents.y {
                continue;
            }
            ray.max_t = t;
            hits[id].record(
                t,
                p,
                Vec3::Z,
                Vec3::X,
                Vec3::Y,
                Vec3::ZERO,
                Vec3::ZERO,
                p.x / self.half_extents.x.max(1e-8) * 0.5 + 0.5,
                p.y / self.half_extents.y.max(1e-8) * 0.5 + 0.5,
                ray.direction(),
                element_id,
            );
            hits[id].closure = crate::shading::SurfaceClosure::Emit {
                radiance: self.radiance,
            };
            if ray.flags.is_occlusion() {
                ray.flags.set_done();
            }
        }
    }
}

/// A sphere light: geometrically identical to `Sphere` but always an
/// emitter, kept as a distinct variant so `Assembly::finalize` can build
/// the light index by type rather than by a runtime flag.
#[derive(Debug, Clone)]
pub struct SphereLight {
    pub sphere: Sphere,
    pub radiance: [f32; 3],
}

impl SphereLight {
    pub fn bounds(&self) -> Vec<Aabb> {
        self.sphere.bounds()
    }

    pub fn intersect_batch(
        &self,
        rays: &mut [Ray],
        hits: &mut [Intersection],
        ray_ids: &[u32],
        element_id: u32,
    ) {
        self.sphere.intersect_batch(rays, hits, ray_ids, element_id);
        for &id in ray_ids {
            let id = id as usize;
            if hits[id].hit && hits[id].element_id == element_id {
                hits[id].closure = crate::shading::SurfaceClosure::Emit {
                    radiance: self.radiance,
                };
            }
        }
    }
}
