//! Ties a root `Assembly`, a `ShaderTable`, and render `Config` into the
//! renderable unit `Tracer`/`Film` drive. Sampling and shading *policy* —
//! what a sample means, how many a pixel needs, how radiance transports
//! across bounces — belongs to whatever integrator is built on top of
//! this crate; `render` only exercises the full pipeline end to end so a
//! render actually produces an image.

use rayon::prelude::*;

use crate::assembly::Assembly;
use crate::camera::CameraModel;
use crate::config::Config;
use crate::film::{generate_buckets, Film};
use crate::intersection::Intersection;
use crate::ray::Ray;
use crate::sampler::SampleGenerator;
use crate::shading::{ShaderTable, SurfaceClosure};
use crate::stats::Stats;
use crate::tracer::Tracer;

pub struct Scene {
    root: Assembly,
    shaders: ShaderTable,
    config: Config,
    stats: Stats,
    camera: Box<dyn CameraModel>,
    sampler: Box<dyn SampleGenerator>,
}

impl Scene {
    pub fn new(
        root: Assembly,
        shaders: ShaderTable,
        config: Config,
        camera: Box<dyn CameraModel>,
        sampler: Box<dyn SampleGenerator>,
    ) -> Self {
        assert!(root.is_finalized(), "Scene requires a finalized root assembly");
        Self {
            root,
            shaders,
            config,
            stats: Stats::new(),
            camera,
            sampler,
        }
    }

    pub fn root(&self) -> &Assembly {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn shaders(&self) -> &ShaderTable {
        &self.shaders
    }

    /// Render into `film`: `spp` camera samples per pixel, using
    /// `thread_count` rayon workers (0 defers to rayon's default).
    /// `max_spp`/`variance_target` are accepted since they're part of the
    /// core's exposed render surface, but no adaptive-sampling policy
    /// lives in this crate — an integrator that wants adaptive refinement
    /// calls `trace` directly and drives its own sample budget.
    pub fn render(
        &self,
        film: &mut Film,
        spp: u32,
        max_spp: u32,
        variance_target: f32,
        seed: u64,
        thread_count: usize,
    ) {
        let _ = (max_spp, variance_target);
        let width = film.width();
        let height = film.height();
        let buckets = generate_buckets(width, height, self.config.bucket_size);
        let film: &Film = film;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .expect("failed to build render thread pool");

        log::info!(
            "rendering {}x{} at {} spp across {} buckets",
            width,
            height,
            spp,
            buckets.len()
        );

        pool.install(|| {
            buckets.par_iter().for_each(|bucket| {
                let tracer = Tracer::new();
                let mut local = vec![([0.0f32; 3], 0u32); (bucket.width * bucket.height) as usize];

                for ly in 0..bucket.height {
                    for lx in 0..bucket.width {
                        let px = bucket.x + lx;
                        let py = bucket.y + ly;
                        let slot = (ly * bucket.width + lx) as usize;

                        for s in 0..spp {
                            let jitter_x = self.sampler.sample(px, py, s, 0);
                            let jitter_y = self.sampler.sample(px, py, s, 1);
                            let lens_u = self.sampler.sample(px, py, s, 2);
                            let lens_v = self.sampler.sample(px, py, s, 3);
                            let time = self.sampler.sample(px, py, s, 4);

                            let sx = ((px as f32 + jitter_x) / width as f32) * 2.0 - 1.0;
                            let sy = 1.0 - ((py as f32 + jitter_y) / height as f32) * 2.0;

                            let world_ray = self.camera.generate_ray((sx, sy), (lens_u, lens_v), time);
                            let mut rays = [Ray::new(
                                world_ray.origin,
                                world_ray.direction,
                                world_ray.time,
                                f32::INFINITY,
                                0,
                            )];
                            let mut hits = [Intersection::miss()];
                            tracer.trace(self, &mut rays, &mut hits);

                            let color = self.resolve_color(&hits[0]);
                            local[slot].0[0] += color[0];
                            local[slot].0[1] += color[1];
                            local[slot].0[2] += color[2];
                            local[slot].1 += 1;
                        }
                    }
                }

                film.flush_bucket(bucket, &local);
            });
        });

        let _ = seed;
        let snapshot = self.stats.snapshot();
        log::info!(
            "render complete: {} rays traced, {} nan hits",
            snapshot.rays_traced,
            snapshot.nan_hits
        );
    }

    /// Resolve a hit's closure into a displayable color. Not an
    /// integrator: an emissive closure (set directly by a light's own
    /// `intersect_batch`) shows its radiance, and anything else falls
    /// back to a normal-as-color debug view so a render without a full
    /// shading graph still shows recognizable geometry. Applying a
    /// `SurfaceShader` from `self.shaders` by name is an integrator's
    /// job — it needs a shader assignment lookup this preview doesn't
    /// carry.
    fn resolve_color(&self, hit: &Intersection) -> [f32; 3] {
        if !hit.hit {
            return [0.0, 0.0, 0.0];
        }
        match hit.closure {
            SurfaceClosure::Emit { radiance } => radiance,
            SurfaceClosure::Lambert { albedo } => albedo,
            SurfaceClosure::Gtr { base_color, .. } => base_color,
            SurfaceClosure::None => {
                let n = hit.normal;
                [n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Assembly, Object};
    use crate::bvh::BvhWidth;
    use crate::camera::PinholeCamera;
    use crate::primitives::Sphere;
    use crate::sampler::IndependentSampler;
    use tracer_math::Vec3;

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
    fn test_render_fills_center_pixels_with_nonzero_color() {
        let scene = sphere_scene();
        let mut film = Film::new(16, 16);
        scene.render(&mut film, 2, 2, 0.0, 42, 1);
        let resolved = film.resolve();
        let center = resolved[8 * 16 + 8];
        assert!(center.iter().any(|&c| c > 0.0));
    }

    #[test]
    fn test_render_leaves_corners_black_for_a_small_sphere() {
        let scene = sphere_scene();
        let mut film = Film::new(16, 16);
        scene.render(&mut film, 1, 1, 0.0, 42, 1);
        let resolved = film.resolve();
        assert_eq!(resolved[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_render_accumulates_stats() {
        let scene = sphere_scene();
        let mut film = Film::new(4, 4);
        scene.render(&mut film, 1, 1, 0.0, 1, 1);
        assert!(scene.stats().snapshot().rays_traced > 0);
    }
}
