//! Camera abstraction: turns a screen-space sample into a world-space ray.
//! Concrete camera models (pinhole, thin-lens, orthographic) are a scene-
//! authoring decision; only the trait plus a minimal pinhole implementation
//! used by tests and as a default ship here.

use tracer_math::Vec3;

/// A ray in world space before it is assigned an id and footprint and
/// handed to a `Tracer` — the camera doesn't know about ray-batch
/// bookkeeping, only where the ray starts and points.
#[derive(Debug, Clone, Copy)]
pub struct WorldRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
}

/// Generates a world-space ray from a screen-space sample. `screen_xy` is
/// normalized device coordinates (`[-1, 1]` on each axis, +y up);
/// `lens_uv` is a `[0, 1)` sample for depth-of-field lens sampling,
/// ignored by cameras with no aperture.
pub trait CameraModel: Send + Sync {
    fn generate_ray(&self, screen_xy: (f32, f32), lens_uv: (f32, f32), time: f32) -> WorldRay;
}

/// A pinhole camera: no aperture, no depth of field. `lens_uv` is accepted
/// to satisfy the trait but unused.
#[derive(Debug, Clone, Copy)]
pub struct PinholeCamera {
    origin: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    tan_half_fov: f32,
    aspect: f32,
}

impl PinholeCamera {
    pub fn new(origin: Vec3, look_at: Vec3, up: Vec3, fov_y_radians: f32, aspect: f32) -> Self {
        let forward = (look_at - origin).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Self {
            origin,
            forward,
            right,
            up,
            tan_half_fov: (fov_y_radians * 0.5).tan(),
            aspect,
        }
    }
}

impl CameraModel for PinholeCamera {
    fn generate_ray(&self, screen_xy: (f32, f32), _lens_uv: (f32, f32), time: f32) -> WorldRay {
        let (sx, sy) = screen_xy;
        let dir = self.forward
            + self.right * (sx * self.tan_half_fov * self.aspect)
            + self.up * (sy * self.tan_half_fov);
        WorldRay {
            origin: self.origin,
            direction: dir.normalize(),
            time,
        }
    }
}
