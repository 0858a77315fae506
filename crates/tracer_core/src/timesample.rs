//! Time-sampled values: an ordered sequence of samples over the unit time
//! interval `[0, 1]`, linearly interpolated at query time.
//!
//! Every moving quantity in the core — control points, bounding boxes,
//! instance transforms — goes through this one container so motion blur is
//! handled uniformly instead of being re-derived per data type.

use tracer_math::{Aabb, Interval, Vec3};

/// A type that can be linearly blended between two samples. Distinct from a
/// generic `Lerp` trait in `tracer_math` because some types (affine
/// transforms) need to decompose before interpolating componentwise.
pub trait TimeLerp: Copy {
    fn time_lerp(a: Self, b: Self, alpha: f32) -> Self;
}

impl TimeLerp for Vec3 {
    fn time_lerp(a: Self, b: Self, alpha: f32) -> Self {
        a + (b - a) * alpha
    }
}

impl TimeLerp for Aabb {
    fn time_lerp(a: Self, b: Self, alpha: f32) -> Self {
        // A time-interpolated box is the box the primitive actually
        // occupies at that instant — not a union of the two samples.
        Aabb::new(
            Interval::new(
                a.x.min + (b.x.min - a.x.min) * alpha,
                a.x.max + (b.x.max - a.x.max) * alpha,
            ),
            Interval::new(
                a.y.min + (b.y.min - a.y.min) * alpha,
                a.y.max + (b.y.max - a.y.max) * alpha,
            ),
            Interval::new(
                a.z.min + (b.z.min - a.z.min) * alpha,
                a.z.max + (b.z.max - a.z.max) * alpha,
            ),
        )
    }
}

impl<const N: usize> TimeLerp for [Vec3; N] {
    fn time_lerp(a: Self, b: Self, alpha: f32) -> Self {
        let mut out = a;
        for i in 0..N {
            out[i] = Vec3::time_lerp(a[i], b[i], alpha);
        }
        out
    }
}

/// An ordered sequence of `N >= 1` samples of `T` over `[0, 1]`.
#[derive(Debug, Clone)]
pub struct TimeSampled<T> {
    samples: Vec<T>,
}

impl<T: TimeLerp> TimeSampled<T> {
    pub fn single(value: T) -> Self {
        Self {
            samples: vec![value],
        }
    }

    pub fn new(samples: Vec<T>) -> Self {
        assert!(!samples.is_empty(), "TimeSampled requires at least one sample");
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Sample the value at time `t`. `t` outside `[0, 1]` is clamped.
    pub fn sample(&self, t: f32) -> T {
        let n = self.samples.len();
        if n == 1 {
            return self.samples[0];
        }

        let t = t.clamp(0.0, 1.0);
        let scaled = t * (n - 1) as f32;
        let lo = scaled.floor() as usize;
        let hi = scaled.ceil() as usize;
        let lo = lo.min(n - 1);
        let hi = hi.min(n - 1);
        if lo == hi {
            return self.samples[lo];
        }
        let alpha = scaled - lo as f32;
        T::time_lerp(self.samples[lo], self.samples[hi], alpha)
    }

    /// Build a new `TimeSampled<T>` by applying `f` to every sample,
    /// preserving the sample count and timing.
    pub fn map<U: TimeLerp>(&self, mut f: impl FnMut(&T) -> U) -> TimeSampled<U> {
        TimeSampled {
            samples: self.samples.iter().map(|s| f(s)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sample_returns_constant() {
        let ts = TimeSampled::single(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ts.sample(0.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ts.sample(0.5), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ts.sample(1.0), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_two_samples_interpolate_linearly() {
        let ts = TimeSampled::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
        assert_eq!(ts.sample(0.0), Vec3::ZERO);
        assert_eq!(ts.sample(1.0), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(ts.sample(0.5), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_three_samples_pick_correct_segment() {
        let ts = TimeSampled::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
        ]);
        // t=0.25 is a quarter of the way between sample 0 and 1 (each
        // segment spans 0.5 of the time interval).
        assert_eq!(ts.sample(0.25), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(ts.sample(0.5), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(ts.sample(0.75), Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_bbox_time_lerp_is_interpolation_not_union() {
        // spec.md scenario 4: two-sample motion BVH over two time-offset
        // spheres — the box at t=0.5 should be centered between them, not
        // a union enclosing both.
        let a = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::from_points(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let ts = TimeSampled::new(vec![a, b]);

        let mid = ts.sample(0.5);
        assert!((mid.center().x - 2.5).abs() < 1e-5);
        // A union would have width 7 (from -1 to 6); the interpolated box
        // keeps the original width of 2.
        assert!((mid.x.size() - 2.0).abs() < 1e-5);
    }
}
