//! Light sampling abstraction consumed by an integrator built on top of
//! this crate. No importance-sampling strategy (light trees, power-based
//! selection) ships here — only the query/sample shapes and the trait;
//! picking which light to sample and weighting it against BSDF sampling
//! is integrator policy.

use tracer_math::Vec3;

/// What an integrator asks a light for: a point to connect to from
/// `reference_point`, using `(u, v)` as the light's own sampling
/// coordinates (e.g. rectangle-local or spherical-direction parameters).
pub struct LightQuery {
    pub reference_point: Vec3,
    pub reference_normal: Vec3,
    pub time: f32,
    pub u: f32,
    pub v: f32,
}

/// The result of sampling a light: a point on its surface, the surface
/// normal there, the radiance it emits toward `reference_point`, and the
/// solid-angle pdf of having picked this point.
pub struct LightSample {
    pub point: Vec3,
    pub normal: Vec3,
    pub radiance: [f32; 3],
    pub pdf: f32,
}

pub trait LightSampler: Send + Sync {
    fn sample(&self, query: &mut LightQuery) -> LightSample;
}
