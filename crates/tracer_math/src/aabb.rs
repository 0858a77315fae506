use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box used throughout the BVH and patch-splitting
/// machinery.
///
/// An `Aabb` is defined by three intervals (one per axis). The default-empty
/// box has `min = +inf`, `max = -inf` on every axis so that `merge` composes
/// correctly without a special case for "first point added".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals. Does not normalize or pad —
    /// degenerate (zero-width) axes are valid and expected for flat patches.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// An empty AABB (contains nothing, absorbing identity for `merge`).
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// A universe AABB (contains everything).
    pub fn universe() -> Self {
        Self {
            x: Interval::UNIVERSE,
            y: Interval::UNIVERSE,
            z: Interval::UNIVERSE,
        }
    }

    /// Create an AABB from two corner points, in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Union of two boxes.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        box0.merge(box1)
    }

    /// Union this box with another, in place semantics via a new value.
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Self {
            x: Interval::surrounding(&self.x, &other.x),
            y: Interval::surrounding(&self.y, &other.y),
            z: Interval::surrounding(&self.z, &other.z),
        }
    }

    /// Extend this box to include a point.
    pub fn merge_point(&self, p: Vec3) -> Aabb {
        self.merge(&Aabb {
            x: Interval::new(p.x, p.x),
            y: Interval::new(p.y, p.y),
            z: Interval::new(p.z, p.z),
        })
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Slab-method ray/box test, returning the clipped `(t_near, t_far)`
    /// range on hit. `inv_dir` must be `1.0 / ray.direction` per-component
    /// (callers precompute it once and share it across many box tests).
    ///
    /// Degenerate axes (a flat box, or a ray exactly parallel to an axis)
    /// still register a hit when the ray's origin lies within the slab on
    /// that axis, rather than relying on `inf`/`NaN` fallout from dividing
    /// by a zero direction component.
    pub fn intersect_ray(
        &self,
        origin: Vec3,
        inv_dir: Vec3,
        max_t: f32,
    ) -> Option<(f32, f32)> {
        let mut t_near = 0.0f32;
        let mut t_far = max_t;

        for axis in 0..3 {
            let o = origin[axis];
            let d_inv = inv_dir[axis];
            let interval = self.axis_interval(axis);

            if d_inv.is_finite() {
                let mut t0 = (interval.min - o) * d_inv;
                let mut t1 = (interval.max - o) * d_inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_near = t_near.max(t0);
                t_far = t_far.min(t1);
            } else if o < interval.min || o > interval.max {
                // Ray parallel to this axis and the origin sits outside
                // the slab: no hit possible, regardless of other axes.
                return None;
            }
            // else: parallel and inside the slab — this axis imposes no
            // constraint on t_near/t_far.

            if t_far < t_near {
                return None;
            }
        }

        Some((t_near, t_far))
    }

    /// Boolean ray/box test over an arbitrary `[min, max]` parametric range
    /// (used by BVH leaf tests, where `min` is usually a small epsilon and
    /// `max` shrinks as closer hits are found).
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        let mut t_near = ray_t.min;
        let mut t_far = ray_t.max;

        for axis in 0..3 {
            let o = r.origin[axis];
            let d = r.direction[axis];
            let interval = self.axis_interval(axis);

            if d != 0.0 {
                let d_inv = 1.0 / d;
                let mut t0 = (interval.min - o) * d_inv;
                let mut t1 = (interval.max - o) * d_inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_near = t_near.max(t0);
                t_far = t_far.min(t1);
            } else if o < interval.min || o > interval.max {
                return false;
            }

            if t_far <= t_near {
                return false;
            }
        }

        true
    }

    /// Translate (move) the AABB by an offset vector.
    pub fn translate(&self, offset: Vec3) -> Aabb {
        Aabb::new(
            self.x.add_scalar(offset.x),
            self.y.add_scalar(offset.y),
            self.z.add_scalar(offset.z),
        )
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        self.center()
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    /// Diagonal vector length (0 for an empty box).
    pub fn diagonal_length(&self) -> f32 {
        if self.x.size() < 0.0 {
            return 0.0;
        }
        Vec3::new(self.x.size(), self.y.size(), self.z.size()).length()
    }

    /// Surface area of the box (0 for an empty or fully flat box).
    pub fn surface_area(&self) -> f32 {
        let dx = self.x.size().max(0.0);
        let dy = self.y.size().max(0.0);
        let dz = self.z.size().max(0.0);
        2.0 * (dx * dy + dy * dz + dz * dx)
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}
