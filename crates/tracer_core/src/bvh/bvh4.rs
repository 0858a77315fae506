//! Width-4 flattened BVH: each inner node fuses up to two binary levels
//! into one 4-wide node (one SIMD-friendly test per node instead of two
//! binary tests), per spec's "Layout" rule for K > 1. First child is
//! implicit at `self_index + 1`; the remaining up to 3 are explicit.

use tracer_math::Aabb;

use super::bvh2::sample_bounds;
use super::build::{build_median_split, BuildNode};
use super::Boundable;

const MAX_WIDTH: usize = 4;

enum NodeKind {
    Leaf {
        payload: u32,
    },
    Inner {
        child_count: u8,
        /// Absolute indices of children 1..child_count (child 0 is
        /// implicit at `self_index + 1`).
        rest: [u32; MAX_WIDTH - 1],
    },
}

struct Node {
    bounds: Vec<Aabb>,
    kind: NodeKind,
}

/// A width-4 BVH, flattened for traversal.
pub struct Bvh4 {
    nodes: Vec<Node>,
}

impl Bvh4 {
    pub fn build<T: Boundable>(items: &[T]) -> Self {
        let mut nodes = Vec::new();
        if let Some(root) = build_median_split(items) {
            flatten(&root, &mut nodes);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Gather up to `MAX_WIDTH` subtrees by repeatedly expanding the
/// shallowest inner node into its two children (a breadth-first widening
/// of the binary tree), stopping once the set reaches `MAX_WIDTH` or every
/// remaining subtree is a leaf. This is the median-split build's fan-in
/// step: it doesn't re-decide splits, only groups the binary result into
/// 4-wide nodes.
fn collapse4(root: &BuildNode) -> Vec<&BuildNode> {
    let mut set: Vec<&BuildNode> = vec![root];
    loop {
        if set.len() >= MAX_WIDTH {
            break;
        }
        let Some(idx) = set.iter().position(|n| matches!(n, BuildNode::Inner { .. })) else {
            break;
        };
        let BuildNode::Inner { left, right, .. } = set[idx] else {
            unreachable!()
        };
        set.splice(idx..=idx, [left.as_ref(), right.as_ref()]);
    }
    set
}

fn flatten<'a>(node: &'a BuildNode, out: &mut Vec<Node>) {
    match node {
        BuildNode::Leaf { bounds, payload } => {
            out.push(Node {
                bounds: bounds.clone(),
                kind: NodeKind::Leaf { payload: *payload },
            });
        }
        BuildNode::Inner { bounds, .. } => {
            let children = collapse4(node);
            let self_index = out.len();
            out.push(Node {
                bounds: bounds.clone(),
                kind: NodeKind::Inner {
                    child_count: 0,
                    rest: [0; MAX_WIDTH - 1],
                },
            });

            flatten(children[0], out); // implicit first child
            let mut rest = [0u32; MAX_WIDTH - 1];
            for (slot, child) in rest.iter_mut().zip(children.iter().skip(1)) {
                *slot = out.len() as u32;
                flatten(child, out);
            }

            out[self_index].kind = NodeKind::Inner {
                child_count: children.len() as u8,
                rest,
            };
        }
    }
}

impl super::FlatBvh for Bvh4 {
    fn root(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    fn is_leaf(&self, node: usize) -> bool {
        matches!(self.nodes[node].kind, NodeKind::Leaf { .. })
    }

    fn payload(&self, node: usize) -> u32 {
        match self.nodes[node].kind {
            NodeKind::Leaf { payload } => payload,
            NodeKind::Inner { .. } => unreachable!("payload queried on an inner node"),
        }
    }

    fn child_count(&self, node: usize) -> usize {
        match self.nodes[node].kind {
            NodeKind::Leaf { .. } => 0,
            NodeKind::Inner { child_count, .. } => child_count as usize,
        }
    }

    fn child_index(&self, node: usize, child: usize) -> usize {
        match &self.nodes[node].kind {
            NodeKind::Inner { child_count, rest } => {
                assert!(child < *child_count as usize, "child index out of range");
                if child == 0 {
                    node + 1
                } else {
                    rest[child - 1] as usize
                }
            }
            NodeKind::Leaf { .. } => unreachable!("leaf has no children"),
        }
    }

    fn child_bounds_at(&self, node: usize, child: usize, t: f32) -> Aabb {
        let child_index = self.child_index(node, child);
        sample_bounds(&self.nodes[child_index].bounds, t)
    }
}
