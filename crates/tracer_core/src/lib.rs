//! A motion-blur-aware two-tier BVH and ray-stream traversal core: the
//! breadth-first bit-stack traverser in `bvh`, the splitting-plane patch
//! intersector in `patch`, and the assembly/instance scene graph that
//! ties both into one renderable scene.

pub mod arena;
pub mod assembly;
pub mod bvh;
pub mod camera;
pub mod config;
pub mod error;
pub mod film;
pub mod intersection;
pub mod light;
pub mod patch;
pub mod primitives;
pub mod ray;
pub mod rng;
pub mod sampler;
pub mod scene;
pub mod shading;
pub mod stats;
pub mod timesample;
pub mod tracer;
pub mod transform;

pub use arena::ScratchArena;
pub use assembly::{Assembly, Instance, Object, SubdivisionSurface};
pub use bvh::{traverse_stream, Bbox4, Boundable, Bvh2, Bvh4, FlatBvh};
pub use camera::{CameraModel, PinholeCamera, WorldRay};
pub use config::Config;
pub use error::BuildError;
pub use film::{generate_buckets, Bucket, Film};
pub use intersection::Intersection;
pub use light::{LightQuery, LightSample, LightSampler};
pub use patch::{BicubicBezierPatch, BicubicNet, BilinearNet, BilinearPatch, ControlNet, Patch};
pub use primitives::{RectangleLight, Sphere, SphereLight};
pub use ray::{Ray, RayFlags, BIT_STACK_DEPTH};
pub use rng::ray_rng;
pub use sampler::{IndependentSampler, SampleGenerator};
pub use scene::Scene;
pub use shading::{ShaderTable, SurfaceClosure, SurfaceShader};
pub use stats::{Stats, StatsSnapshot};
pub use timesample::{TimeLerp, TimeSampled};
pub use tracer::Tracer;
pub use transform::{MatSample, Transform};
