//! The top-level ray-stream entry point: owns the per-thread scratch
//! memory and, for one `trace` call, walks the scene's root assembly
//! through however many levels of nested assemblies a ray's path actually
//! touches.

use std::cell::RefCell;

use crate::arena::ScratchArena;
use crate::intersection::Intersection;
use crate::ray::Ray;
use crate::scene::Scene;

/// One `Tracer` per render-worker thread. `trace` takes `&self` rather
/// than `&mut self` so a `Tracer` can be parked behind a shared reference
/// if a caller wants to — the scratch arena's interior mutability is what
/// makes that sound, since in practice nothing calls `trace` on the same
/// `Tracer` from two threads at once.
pub struct Tracer {
    arena: RefCell<ScratchArena>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            arena: RefCell::new(ScratchArena::new()),
        }
    }

    /// Trace `rays` against `scene`, writing results into the parallel
    /// `hits` slice (same length, same indexing). The scratch arena is
    /// reset at the start of every call so a panic mid-trace on a reused
    /// `Tracer` can't leak frames into the next one.
    pub fn trace(&self, scene: &Scene, rays: &mut [Ray], hits: &mut [Intersection]) {
        assert_eq!(rays.len(), hits.len(), "rays and hits must be the same length");
        let mut arena = self.arena.borrow_mut();
        arena.reset();
        let mut ray_ids: Vec<u32> = (0..rays.len() as u32).collect();
        scene
            .root()
            .intersect_batch(rays, hits, &mut ray_ids, &mut arena, scene.config());
        for _ in rays.iter() {
            scene.stats().record_ray();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Assembly, Object};
    use crate::bvh::BvhWidth;
    use crate::camera::PinholeCamera;
    use crate::config::Config;
    use crate::intersection::Intersection;
    use crate::primitives::Sphere;
    use crate::sampler::IndependentSampler;
    use crate::shading::ShaderTable;
    use tracer_math::{Mat4, Vec3};

    fn sphere_scene() -> Scene {
        let mut root = Assembly::new();
        let sphere = root.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        root.instance_object("ball", sphere, &[], None);
        let shaders = ShaderTable::new();
        root.finalize(&shaders, BvhWidth::Two).unwrap();
        Scene::new(
            root,
            shaders,
            Config::default(),
            Box::new(PinholeCamera::new(
                Vec3::new(0.0, 0.0, -5.0),
                Vec3::ZERO,
                Vec3::Y,
                1.0,
                1.0,
            )),
            Box::new(IndependentSampler { seed: 1 }),
        )
    }

    #[test]
    fn test_trace_hits_instanced_sphere() {
        let scene = sphere_scene();
        let tracer = Tracer::new();
        let mut rays = [Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, f32::INFINITY, 0)];
        let mut hits = [Intersection::miss()];
        tracer.trace(&scene, &mut rays, &mut hits);
        assert!(hits[0].hit);
    }

    #[test]
    fn test_trace_misses_when_ray_points_away() {
        let scene = sphere_scene();
        let tracer = Tracer::new();
        let mut rays = [Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z, 0.0, f32::INFINITY, 0)];
        let mut hits = [Intersection::miss()];
        tracer.trace(&scene, &mut rays, &mut hits);
        assert!(!hits[0].hit);
    }

    #[test]
    fn test_reused_tracer_does_not_leak_arena_frames() {
        let scene = sphere_scene();
        let tracer = Tracer::new();
        for _ in 0..3 {
            let mut rays = [Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, f32::INFINITY, 0)];
            let mut hits = [Intersection::miss()];
            tracer.trace(&scene, &mut rays, &mut hits);
            assert!(hits[0].hit);
        }
    }

    #[test]
    fn test_trace_hits_only_the_left_of_two_translated_instances() {
        let mut root = Assembly::new();
        let sphere = root.add_object(Object::Sphere(Sphere::new(vec![Vec3::ZERO], 1.0)));
        root.instance_object(
            "left",
            sphere,
            &[Mat4::from_translation(Vec3::new(-2.0, 0.0, 0.0))],
            None,
        );
        root.instance_object(
            "right",
            sphere,
            &[Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))],
            None,
        );
        let shaders = ShaderTable::new();
        root.finalize(&shaders, BvhWidth::Two).unwrap();
        let scene = Scene::new(
            root,
            shaders,
            Config::default(),
            Box::new(PinholeCamera::new(
                Vec3::new(0.0, 0.0, -5.0),
                Vec3::ZERO,
                Vec3::Y,
                1.0,
                1.0,
            )),
            Box::new(IndependentSampler { seed: 1 }),
        );

        let tracer = Tracer::new();
        let mut rays = [Ray::new(Vec3::new(-2.0, 0.0, -10.0), Vec3::Z, 0.0, f32::INFINITY, 0)];
        let mut hits = [Intersection::miss()];
        tracer.trace(&scene, &mut rays, &mut hits);

        assert!(hits[0].hit);
        assert!((hits[0].t - 9.0).abs() < 1e-4);
    }
}
