//! Median-split BVH construction, shared by the width-2 and width-4
//! layouts. SAH is deliberately not implemented here — median split on
//! the time-0.5 centroid is the simpler, harder-to-get-wrong choice and
//! the one this codebase standardizes on.

use tracer_math::{Aabb, Vec3};

/// Anything that can report its own time-sampled world-space bounds, so
/// the same builder serves both the top-level BVH (over `Instance`s) and
/// the per-assembly BVH (over `Object`s).
pub trait Boundable {
    fn bounds(&self) -> Vec<Aabb>;
}

/// Merge two time-sample lists. Equal-length lists merge sample-by-sample;
/// mismatched lengths collapse to a single sample that unions everything,
/// per the build rule for disagreeing children.
pub fn merge_bounds(a: &[Aabb], b: &[Aabb]) -> Vec<Aabb> {
    if a.len() == b.len() {
        a.iter().zip(b.iter()).map(|(x, y)| x.merge(y)).collect()
    } else {
        let union_a = a.iter().fold(Aabb::empty(), |acc, x| acc.merge(x));
        let union_b = b.iter().fold(Aabb::empty(), |acc, x| acc.merge(x));
        vec![union_a.merge(&union_b)]
    }
}

fn union_all(bounds: &[Aabb]) -> Aabb {
    bounds.iter().fold(Aabb::empty(), |acc, b| acc.merge(b))
}

/// An intermediate, pointer-based build tree. Flattened into a `Bvh2` or
/// `Bvh4`'s array layout after the fact.
pub enum BuildNode {
    Leaf {
        bounds: Vec<Aabb>,
        payload: u32,
    },
    Inner {
        bounds: Vec<Aabb>,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

impl BuildNode {
    pub fn bounds(&self) -> &[Aabb] {
        match self {
            BuildNode::Leaf { bounds, .. } => bounds,
            BuildNode::Inner { bounds, .. } => bounds,
        }
    }
}

struct Candidate {
    bounds: Vec<Aabb>,
    centroid: Vec3,
    payload: u32,
}

/// Build a BVH over `items` by recursive median split on each node's
/// widest-centroid-range axis, falling back to a first-axis median split
/// when the centroid range degenerates (all centroids coincide on every
/// axis). Returns `None` for an empty input — callers represent that as
/// an empty hierarchy.
pub fn build_median_split<T: Boundable>(items: &[T]) -> Option<BuildNode> {
    if items.is_empty() {
        return None;
    }

    let mut candidates: Vec<Candidate> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let bounds = item.bounds();
            let centroid = union_all(&bounds).center();
            Candidate {
                bounds,
                centroid,
                payload: i as u32,
            }
        })
        .collect();

    Some(build_recursive(&mut candidates))
}

fn build_recursive(candidates: &mut [Candidate]) -> BuildNode {
    if candidates.len() == 1 {
        let c = &candidates[0];
        return BuildNode::Leaf {
            bounds: c.bounds.clone(),
            payload: c.payload,
        };
    }

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for c in candidates.iter() {
        min = min.min(c.centroid);
        max = max.max(c.centroid);
    }
    let extent = max - min;

    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    let mid = (min[axis] + max[axis]) * 0.5;

    candidates.sort_by(|a, b| a.centroid[axis].partial_cmp(&b.centroid[axis]).unwrap());
    let mut split = partition_point(candidates, axis, mid);

    // Degenerate centroid range on the chosen axis (every centroid equal,
    // or the split produced an empty half): fall back to an index median
    // on the now-sorted order so the tree still balances.
    if split == 0 || split == candidates.len() {
        split = candidates.len() / 2;
    }

    let (left_items, right_items) = candidates.split_at_mut(split);
    let left = Box::new(build_recursive(left_items));
    let right = Box::new(build_recursive(right_items));
    let bounds = merge_bounds(left.bounds(), right.bounds());

    BuildNode::Inner { bounds, left, right }
}

fn partition_point(candidates: &[Candidate], axis: usize, mid: f32) -> usize {
    candidates.iter().filter(|c| c.centroid[axis] < mid).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ball {
        center: Vec3,
        radius: f32,
    }

    impl Boundable for Ball {
        fn bounds(&self) -> Vec<Aabb> {
            vec![Aabb::from_points(
                self.center - Vec3::splat(self.radius),
                self.center + Vec3::splat(self.radius),
            )]
        }
    }

    #[test]
    fn test_empty_input_returns_none() {
        let items: Vec<Ball> = vec![];
        assert!(build_median_split(&items).is_none());
    }

    #[test]
    fn test_single_item_is_a_leaf() {
        let items = vec![Ball {
            center: Vec3::ZERO,
            radius: 1.0,
        }];
        let tree = build_median_split(&items).unwrap();
        assert!(matches!(tree, BuildNode::Leaf { .. }));
    }

    #[test]
    fn test_build_covers_all_leaves() {
        let items: Vec<Ball> = (0..17)
            .map(|i| Ball {
                center: Vec3::new(i as f32 * 2.0, 0.0, 0.0),
                radius: 0.5,
            })
            .collect();
        let tree = build_median_split(&items).unwrap();

        fn count_leaves(n: &BuildNode) -> usize {
            match n {
                BuildNode::Leaf { .. } => 1,
                BuildNode::Inner { left, right, .. } => count_leaves(left) + count_leaves(right),
            }
        }
        assert_eq!(count_leaves(&tree), 17);
    }

    #[test]
    fn test_root_bounds_contain_all_items() {
        let items: Vec<Ball> = (0..8)
            .map(|i| Ball {
                center: Vec3::new(i as f32, i as f32 * 3.0, 0.0),
                radius: 0.1,
            })
            .collect();
        let tree = build_median_split(&items).unwrap();
        let root_bounds = union_all(tree.bounds());
        for item in &items {
            let b = union_all(&item.bounds());
            assert!(root_bounds.x.min <= b.x.min && root_bounds.x.max >= b.x.max);
            assert!(root_bounds.y.min <= b.y.min && root_bounds.y.max >= b.y.max);
        }
    }

    #[test]
    fn test_coincident_centroids_fall_back_to_median() {
        // All items share a centroid (same-sized balls at the same point,
        // differing only in an attribute that doesn't affect bounds) —
        // the centroid-range split degenerates and must fall back.
        let items: Vec<Ball> = (0..5)
            .map(|_| Ball {
                center: Vec3::ZERO,
                radius: 1.0,
            })
            .collect();
        let tree = build_median_split(&items).unwrap();
        fn count_leaves(n: &BuildNode) -> usize {
            match n {
                BuildNode::Leaf { .. } => 1,
                BuildNode::Inner { left, right, .. } => count_leaves(left) + count_leaves(right),
            }
        }
        assert_eq!(count_leaves(&tree), 5);
    }
}
