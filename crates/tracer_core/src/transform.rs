//! Time-sampled affine transforms for instancing and transform motion blur.

use tracer_math::{Aabb, Mat4, Mat4Ext, Quat, Vec3};

use crate::timesample::{TimeLerp, TimeSampled};

/// A matrix sample that interpolates by decomposing into
/// translation/rotation/scale rather than blending matrix elements
/// directly — a naive elementwise lerp of two rotation matrices does not
/// produce a rotation matrix partway through, so decomposed interpolation
/// is the one that actually behaves like a moving object.
#[derive(Debug, Clone, Copy)]
pub struct MatSample(pub Mat4);

impl TimeLerp for MatSample {
    fn time_lerp(a: Self, b: Self, alpha: f32) -> Self {
        let (scale_a, rot_a, trans_a) = a.0.to_scale_rotation_translation();
        let (scale_b, rot_b, trans_b) = b.0.to_scale_rotation_translation();

        let scale = scale_a + (scale_b - scale_a) * alpha;
        let rot = rot_a.slerp(rot_b, alpha);
        let trans = trans_a + (trans_b - trans_a) * alpha;

        MatSample(Mat4::from_scale_rotation_translation(scale, rot, trans))
    }
}

/// A time-sampled affine transform. Length 0 (represented here as a single
/// identity sample) means identity; length 1 means static; length >= 2
/// means the transform itself is in motion.
#[derive(Debug, Clone)]
pub struct Transform {
    samples: TimeSampled<MatSample>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            samples: TimeSampled::single(MatSample(Mat4::IDENTITY)),
        }
    }

    pub fn static_transform(m: Mat4) -> Self {
        Self {
            samples: TimeSampled::single(MatSample(m)),
        }
    }

    pub fn motion(samples: Vec<Mat4>) -> Self {
        Self {
            samples: TimeSampled::new(samples.into_iter().map(MatSample).collect()),
        }
    }

    /// Build from a possibly-empty sample list: zero samples means
    /// identity, matching the `Instance` transform-range convention where
    /// a zero-length range means "no explicit transform".
    pub fn from_samples(samples: &[Mat4]) -> Self {
        match samples.len() {
            0 => Self::identity(),
            _ => Self::motion(samples.to_vec()),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Interpolated matrix at time `t`.
    pub fn sample(&self, t: f32) -> Mat4 {
        self.samples.sample(t).0
    }

    /// Inverse of the matrix interpolated at time `t`. Inversion does not
    /// commute with interpolation, so this always inverts *after*
    /// sampling rather than maintaining a separately-interpolated inverse.
    pub fn inverse_sample(&self, t: f32) -> Mat4 {
        self.sample(t).inverse()
    }

    /// Compose this transform (applied second, i.e. parent) with `child`
    /// (applied first) into the single transform an instance under both
    /// would experience. If either side is in motion, the result is
    /// sampled per time sample at the union's resolution.
    pub fn compose(&self, child: &Transform) -> Transform {
        let n = self.sample_count().max(child.sample_count());
        if n == 1 {
            return Transform::static_transform(self.sample(0.0) * child.sample(0.0));
        }
        let mats: Vec<Mat4> = (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                self.sample(t) * child.sample(t)
            })
            .collect();
        Transform::motion(mats)
    }

    pub fn transform_point(&self, t: f32, p: Vec3) -> Vec3 {
        self.sample(t).transform_point3(p)
    }

    pub fn transform_dir(&self, t: f32, d: Vec3) -> Vec3 {
        self.sample(t).transform_vector3(d)
    }

    pub fn transform_normal(&self, t: f32, n: Vec3) -> Vec3 {
        // Normals transform by the inverse transpose so non-uniform scale
        // doesn't skew them off the surface.
        self.sample(t).inverse().transpose().transform_vector3(n)
    }

    pub fn transform_bounds(&self, t: f32, bounds: Aabb) -> Aabb {
        self.sample(t).transform_aabb(&bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_identity_roundtrip() {
        let t = Transform::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(t.transform_point(0.5, p), p);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Transform::static_transform(Mat4::from_translation(Vec3::new(3.0, 4.0, 5.0))
            * Mat4::from_rotation_y(PI / 3.0));
        let p = Vec3::new(1.0, -2.0, 0.5);
        let hit = t.transform_point(0.0, p);
        let back = t.inverse_sample(0.0).transform_point3(hit);
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn test_motion_translation_interpolates() {
        let t = Transform::motion(vec![
            Mat4::from_translation(Vec3::ZERO),
            Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        ]);
        let p = Vec3::ZERO;
        assert_eq!(t.transform_point(0.0, p), Vec3::ZERO);
        assert_eq!(t.transform_point(1.0, p), Vec3::new(10.0, 0.0, 0.0));
        let mid = t.transform_point(0.5, p);
        assert!((mid - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_compose_static() {
        let parent = Transform::static_transform(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        let child = Transform::static_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        let composed = parent.compose(&child);
        let p = composed.transform_point(0.0, Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 3.0, 0.0));
    }
}
