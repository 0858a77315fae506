//! Width-4 box test: four boxes' slabs stored as parallel `[f32; 4]` lanes
//! per axis/min-max, tested against one ray in a single pass. Plain
//! per-lane `f32` arithmetic, not platform SIMD intrinsics — the workspace
//! has no `target_feature` gating elsewhere, and the auto-vectorizer picks
//! this shape up on its own.
//!
//! `Bvh4`'s `FlatBvh` impl currently queries children one at a time through
//! `child_bounds_at`, since that's the shape the shared `traverse_stream`
//! generic needs to stay width-agnostic. `Bbox4` is the batched primitive a
//! width-4-specialized traversal would use instead of four scalar calls;
//! see the grounding ledger for why the two haven't been fused yet.

use tracer_math::Aabb;

/// Four AABBs' slabs, lane-packed per axis. Unused lanes (fewer than 4
/// boxes) are filled with an empty interval (`min = +inf`, `max = -inf`)
/// so they can never register a hit.
#[derive(Debug, Clone, Copy)]
pub struct Bbox4 {
    min_x: [f32; 4],
    max_x: [f32; 4],
    min_y: [f32; 4],
    max_y: [f32; 4],
    min_z: [f32; 4],
    max_z: [f32; 4],
}

impl Bbox4 {
    /// Pack up to 4 boxes; missing slots (when `boxes.len() < 4`) are
    /// filled with an empty box.
    pub fn pack(boxes: &[Aabb]) -> Self {
        let mut min_x = [f32::INFINITY; 4];
        let mut max_x = [f32::NEG_INFINITY; 4];
        let mut min_y = [f32::INFINITY; 4];
        let mut max_y = [f32::NEG_INFINITY; 4];
        let mut min_z = [f32::INFINITY; 4];
        let mut max_z = [f32::NEG_INFINITY; 4];
        for (i, b) in boxes.iter().take(4).enumerate() {
            min_x[i] = b.x.min;
            max_x[i] = b.x.max;
            min_y[i] = b.y.min;
            max_y[i] = b.y.max;
            min_z[i] = b.z.min;
            max_z[i] = b.z.max;
        }
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// Test all four boxes against one ray (origin, precomputed `inv_dir`,
    /// `max_t`) at once. Returns a 4-bit hit mask (bit `i` set means lane
    /// `i` hit) and each lane's near-t (meaningless for lanes that missed).
    pub fn intersect_ray(&self, origin: [f32; 3], inv_dir: [f32; 3], max_t: f32) -> (u32, [f32; 4]) {
        let mut t_near = [0.0f32; 4];
        let mut t_far = [max_t; 4];
        let mut alive = [true; 4];

        for axis in 0..3 {
            let (min_lane, max_lane): (&[f32; 4], &[f32; 4]) = match axis {
                0 => (&self.min_x, &self.max_x),
                1 => (&self.min_y, &self.max_y),
                _ => (&self.min_z, &self.max_z),
            };
            let o = origin[axis];
            let d_inv = inv_dir[axis];
            for lane in 0..4 {
                if !alive[lane] {
                    continue;
                }
                if d_inv.is_finite() {
                    let mut t0 = (min_lane[lane] - o) * d_inv;
                    let mut t1 = (max_lane[lane] - o) * d_inv;
                    if t0 > t1 {
                        std::mem::swap(&mut t0, &mut t1);
                    }
                    t_near[lane] = t_near[lane].max(t0);
                    t_far[lane] = t_far[lane].min(t1);
                } else if o < min_lane[lane] || o > max_lane[lane] {
                    alive[lane] = false;
                }
            }
        }

        let mut mask = 0u32;
        for lane in 0..4 {
            if alive[lane] && t_far[lane] >= t_near[lane] {
                mask |= 1 << lane;
            }
        }
        (mask, t_near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracer_math::Vec3;

    fn box_at(cx: f32) -> Aabb {
        Aabb::from_points(Vec3::new(cx - 1.0, -1.0, -1.0), Vec3::new(cx + 1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_hits_only_the_aligned_lane() {
        let packed = Bbox4::pack(&[box_at(-10.0), box_at(-3.0), box_at(3.0), box_at(10.0)]);
        let origin = [3.0, 0.0, -5.0];
        let inv_dir = [f32::INFINITY, f32::INFINITY, 1.0];
        let (mask, _) = packed.intersect_ray(origin, inv_dir, 100.0);
        assert_eq!(mask, 0b0100);
    }

    #[test]
    fn test_unused_lanes_never_hit() {
        let packed = Bbox4::pack(&[box_at(0.0)]);
        let origin = [20.0, 0.0, -5.0];
        let inv_dir = [f32::INFINITY, f32::INFINITY, 1.0];
        let (mask, _) = packed.intersect_ray(origin, inv_dir, 100.0);
        assert_eq!(mask, 0);
    }

    #[test]
    fn test_near_t_matches_scalar_test() {
        let packed = Bbox4::pack(&[box_at(0.0)]);
        let origin = [0.0, 0.0, -5.0];
        let inv_dir = [f32::INFINITY, f32::INFINITY, 1.0];
        let (mask, near) = packed.intersect_ray(origin, inv_dir, 100.0);
        assert_eq!(mask, 0b0001);
        assert!((near[0] - 4.0).abs() < 1e-5);
    }
}
