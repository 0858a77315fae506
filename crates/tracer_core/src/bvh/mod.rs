//! Motion-blur BVH: shared median-split build, and the width-2/width-4
//! flattened layouts that share one bit-stack stream traversal.

pub mod bbox4;
pub mod build;
pub mod bvh2;
pub mod bvh4;

pub use bbox4::Bbox4;
pub use build::Boundable;
pub use bvh2::Bvh2;
pub use bvh4::Bvh4;

use tracer_math::Aabb;

use crate::intersection::Intersection;
use crate::ray::Ray;

/// The shape every flattened BVH width exposes to the stream traverser:
/// leaf/inner discrimination, the K (2 or 4) children of an inner node by
/// index, and each child's time-interpolated bound. `child_index(node, 0)`
/// is always `node + 1` (the implicit first child); the rest resolve
/// through whatever explicit indices the layout stored.
pub trait FlatBvh {
    fn root(&self) -> Option<usize>;
    fn is_leaf(&self, node: usize) -> bool;
    fn payload(&self, node: usize) -> u32;
    fn child_count(&self, node: usize) -> usize;
    fn child_index(&self, node: usize, child: usize) -> usize;
    fn child_bounds_at(&self, node: usize, child: usize, t: f32) -> Aabb;
}

/// Which flattened width an `Assembly` should build its acceleration
/// hierarchy as. `Two` is the simpler, lower-fan-out layout; `Four` fuses
/// pairs of binary levels into one node, trading a wider per-node test for
/// fewer levels of indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhWidth {
    Two,
    Four,
}

/// Either flattened width behind one handle, so an `Assembly` can pick its
/// layout at `finalize` time without the rest of the crate needing to be
/// generic over it.
pub enum AnyBvh {
    Two(Bvh2),
    Four(Bvh4),
}

impl AnyBvh {
    pub fn build<T: Boundable>(items: &[T], width: BvhWidth) -> Self {
        match width {
            BvhWidth::Two => AnyBvh::Two(Bvh2::build(items)),
            BvhWidth::Four => AnyBvh::Four(Bvh4::build(items)),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            AnyBvh::Two(b) => b.node_count(),
            AnyBvh::Four(b) => b.node_count(),
        }
    }
}

impl FlatBvh for AnyBvh {
    fn root(&self) -> Option<usize> {
        match self {
            AnyBvh::Two(b) => b.root(),
            AnyBvh::Four(b) => b.root(),
        }
    }

    fn is_leaf(&self, node: usize) -> bool {
        match self {
            AnyBvh::Two(b) => b.is_leaf(node),
            AnyBvh::Four(b) => b.is_leaf(node),
        }
    }

    fn payload(&self, node: usize) -> u32 {
        match self {
            AnyBvh::Two(b) => b.payload(node),
            AnyBvh::Four(b) => b.payload(node),
        }
    }

    fn child_count(&self, node: usize) -> usize {
        match self {
            AnyBvh::Two(b) => b.child_count(node),
            AnyBvh::Four(b) => b.child_count(node),
        }
    }

    fn child_index(&self, node: usize, child: usize) -> usize {
        match self {
            AnyBvh::Two(b) => b.child_index(node, child),
            AnyBvh::Four(b) => b.child_index(node, child),
        }
    }

    fn child_bounds_at(&self, node: usize, child: usize, t: f32) -> Aabb {
        match self {
            AnyBvh::Two(b) => b.child_bounds_at(node, child, t),
            AnyBvh::Four(b) => b.child_bounds_at(node, child, t),
        }
    }
}

/// One frame of the traversal stack: a node and the `[beg, end)` range of
/// `ray_ids` still active against it. `check_bit` is false only for the
/// root frame (no sibling decision has been made yet); every frame pushed
/// for a child additionally consults the next bit on each ray's
/// bit-stack, since sibling frames share the same `[beg, end)` range and
/// are told apart only by that bit.
struct Frame {
    node: usize,
    beg: usize,
    end: usize,
    check_bit: bool,
}

/// Stream-traverse `bvh` with the rays identified by `ray_ids`, dispatching
/// each leaf's payload and its surviving ray range to `on_leaf`.
///
/// `ray_ids` is reordered in place (stable with respect to ray id — it
/// only ever swaps indices, never touches `rays`/`hits` directly) so that
/// at any point in the traversal, rays still live at the current subtree
/// occupy a contiguous prefix of their frame's range.
///
/// Sibling frames for one node's children all share the same `[beg, end)`
/// range (the rays that hit *some* child of that node); what tells them
/// apart is a per-child bit pushed onto each ray's bit-stack before the
/// children are pushed — bit `i` (in near-to-far order) records whether
/// that ray actually hit child `i`'s bound. Each child frame pops exactly
/// one bit per ray when it is later processed, which is why children are
/// pushed in reverse near-to-far order: the frame popped first (nearest)
/// must also be the first bit popped.
///
/// `on_leaf` receives the leaf's payload index plus the mutable rays/hits
/// slices and the active `ray_ids` sub-slice for that leaf; it is
/// responsible for shrinking `max_t` and setting `done`/occlusion flags on
/// the rays it actually hits, exactly as the patch and instance
/// intersectors do.
pub fn traverse_stream<B: FlatBvh>(
    bvh: &B,
    rays: &mut [Ray],
    hits: &mut [Intersection],
    ray_ids: &mut [u32],
    mut on_leaf: impl FnMut(u32, &mut [Ray], &mut [Intersection], &mut [u32]),
) {
    let Some(root) = bvh.root() else { return };
    if ray_ids.is_empty() {
        return;
    }

    let mut stack = vec![Frame {
        node: root,
        beg: 0,
        end: ray_ids.len(),
        check_bit: false,
    }];

    while let Some(frame) = stack.pop() {
        // A ray is eligible to continue at this node if it isn't done,
        // and — for every frame but the root — the bit its parent pushed
        // for this specific child is set.
        let mut split_at = frame.beg;
        for i in frame.beg..frame.end {
            let id = ray_ids[i] as usize;
            let ray = &mut rays[id];
            let admit = if frame.check_bit {
                !ray.flags.is_done() && ray.pop_bit() == Some(true)
            } else {
                !ray.flags.is_done()
            };
            if admit {
                ray_ids.swap(split_at, i);
                split_at += 1;
            }
        }
        let (beg, end) = (frame.beg, split_at);
        if beg == end {
            continue;
        }

        if bvh.is_leaf(frame.node) {
            on_leaf(bvh.payload(frame.node), rays, hits, &mut ray_ids[beg..end]);
            continue;
        }

        let k = bvh.child_count(frame.node);

        // Determine near-to-far child order once per node, from the first
        // active ray's per-child near-t. Every ray at this node shares the
        // same child ordering; only which children they individually hit
        // differs.
        let probe_id = ray_ids[beg] as usize;
        let probe = &rays[probe_id];
        let mut order: Vec<usize> = (0..k).collect();
        let mut near_t = vec![f32::INFINITY; k];
        for (c, near) in order.iter().zip(near_t.iter_mut()) {
            let b = bvh.child_bounds_at(frame.node, *c, probe.time());
            if let Some((t_near, _)) = b.intersect_ray(probe.origin(), probe.inv_dir, probe.max_t) {
                *near = t_near;
            }
        }
        order.sort_by(|&a, &b| near_t[a].partial_cmp(&near_t[b]).unwrap());

        // Partition [beg, end) by whether each ray hits at least one
        // child, and push the full per-child hit mask onto its
        // bit-stack, one bit per slot, so the child frames popped later
        // can tell exactly which children this ray actually hit.
        let mut hit_end = beg;
        for i in beg..end {
            let id = ray_ids[i] as usize;
            let ray = &mut rays[id];
            let mut hit_mask = 0u32;
            for (slot, &c) in order.iter().enumerate() {
                let b = bvh.child_bounds_at(frame.node, c, ray.time());
                if b.intersect_ray(ray.origin(), ray.inv_dir, ray.max_t).is_some() {
                    hit_mask |= 1 << slot;
                }
            }
            if hit_mask != 0 {
                // Push from the farthest slot down to the nearest, so the
                // nearest child's bit ends up on top — the nearest
                // child's frame is popped (and its bit consumed) first.
                for slot in (0..k).rev() {
                    ray.push_bit(hit_mask & (1 << slot) != 0);
                }
                ray_ids.swap(hit_end, i);
                hit_end += 1;
            }
        }

        if hit_end == beg {
            continue;
        }

        // Push children in reverse near-to-far order so the nearest is
        // popped (processed) first, matching the bit order pushed above.
        for &c in order.iter().rev() {
            stack.push(Frame {
                node: bvh.child_index(frame.node, c),
                beg,
                end: hit_end,
                check_bit: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Bvh2;
    use tracer_math::Vec3;

    struct Ball {
        center: Vec3,
        id: u32,
    }
    impl Boundable for Ball {
        fn bounds(&self) -> Vec<Aabb> {
            vec![Aabb::from_points(
                self.center - Vec3::splat(0.5),
                self.center + Vec3::splat(0.5),
            )]
        }
    }

    #[test]
    fn test_traverse_empty_bvh_is_noop() {
        let items: Vec<Ball> = vec![];
        let bvh = Bvh2::build(&items);
        let mut rays = [Ray::new(Vec3::ZERO, Vec3::Z, 0.0, f32::INFINITY, 0)];
        let mut hits = [Intersection::miss()];
        let mut ray_ids = [0u32];
        let mut leaf_hits = 0;
        traverse_stream(&bvh, &mut rays, &mut hits, &mut ray_ids, |_, _, _, _| {
            leaf_hits += 1;
        });
        assert_eq!(leaf_hits, 0);
    }

    #[test]
    fn test_traverse_visits_only_the_leaf_the_ray_actually_hits() {
        let items = vec![
            Ball {
                center: Vec3::new(-10.0, 0.0, 0.0),
                id: 0,
            },
            Ball {
                center: Vec3::new(10.0, 0.0, 0.0),
                id: 1,
            },
        ];
        let bvh = Bvh2::build(&items);
        let mut rays = [Ray::new(
            Vec3::new(10.0, 0.0, -5.0),
            Vec3::Z,
            0.0,
            f32::INFINITY,
            0,
        )];
        let mut hits = [Intersection::miss()];
        let mut ray_ids = [0u32];
        let mut visited_payloads = Vec::new();
        traverse_stream(&bvh, &mut rays, &mut hits, &mut ray_ids, |payload, _, _, _| {
            visited_payloads.push(payload);
        });
        assert_eq!(visited_payloads, vec![items[1].id]);
    }
}
