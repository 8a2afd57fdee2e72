//! Bounding Volume Hierarchy for accelerated ray tracing.
//!
//! The tree is a single pre-order array of [`BvhNode`]s: an interior
//! node's left child is the next element and its right child sits at a
//! stored relative offset, so the structure holds no pointers and can be
//! moved or shared freely once built. Leaves refer to contiguous ranges of
//! a primitive array that has been reordered with the build's
//! `sort_order`.

mod builder;
mod node;
mod traversal;

pub(crate) use builder::build_validated;
pub use builder::{build_bvh, BvhBuild, BvhStats};
pub use node::{BvhNode, NodeKind};

use crate::BoundingBox;

/// A flattened, immutable BVH.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
}

impl Bvh {
    /// All nodes in pre-order; the root is at index 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds of the root node.
    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.nodes.first().map(BvhNode::bounds)
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }
}
