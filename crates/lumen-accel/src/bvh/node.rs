//! Flat BVH node records.

use std::ops::Range;

use crate::{Axis, BoundingBox};

/// What a node holds besides its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Two children: the left one is the next node in the array, the right
    /// one `right_child_offset` slots after this node.
    Interior {
        /// Axis the children were split along.
        axis: Axis,
        /// Distance in nodes from this node to its right child.
        right_child_offset: u32,
    },
    /// A contiguous range of the reordered primitive array.
    Leaf {
        /// First primitive of the range.
        offset: u32,
        /// Number of primitives in the range.
        count: u32,
    },
}

/// A node of a [`Bvh`](super::Bvh), stored in pre-order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    bounds: BoundingBox,
    kind: NodeKind,
}

impl BvhNode {
    pub(crate) fn leaf(bounds: BoundingBox, offset: usize, count: usize) -> Self {
        debug_assert!(count > 0, "leaves hold at least one primitive");
        Self {
            bounds,
            kind: NodeKind::Leaf {
                offset: offset as u32,
                count: count as u32,
            },
        }
    }

    /// An interior node whose right child is patched in once it is built.
    pub(crate) fn interior(bounds: BoundingBox, axis: Axis) -> Self {
        Self {
            bounds,
            kind: NodeKind::Interior {
                axis,
                right_child_offset: 0,
            },
        }
    }

    pub(crate) fn set_right_child_offset(&mut self, offset: usize) {
        if let NodeKind::Interior {
            right_child_offset, ..
        } = &mut self.kind
        {
            *right_child_offset = offset as u32;
        }
    }

    /// Bounds of everything below this node.
    #[inline]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Interior or leaf payload.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether this node is a leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Array indices of the children when this node sits at `index`.
    pub fn children(&self, index: usize) -> Option<(usize, usize)> {
        match self.kind {
            NodeKind::Interior {
                right_child_offset, ..
            } => Some((index + 1, index + right_child_offset as usize)),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Primitive range of a leaf.
    pub fn primitives(&self) -> Option<Range<usize>> {
        match self.kind {
            NodeKind::Leaf { offset, count } => {
                let start = offset as usize;
                Some(start..start + count as usize)
            }
            NodeKind::Interior { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Point3;

    #[test]
    fn test_interior_patch() {
        let bounds = BoundingBox::from_point(Point3::origin());
        let mut node = BvhNode::interior(bounds, Axis::Y);
        node.set_right_child_offset(5);
        assert_eq!(node.children(10), Some((11, 15)));
        assert!(node.primitives().is_none());
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_leaf_range() {
        let bounds = BoundingBox::from_point(Point3::origin());
        let mut node = BvhNode::leaf(bounds, 3, 2);
        // Patching a leaf is a no-op.
        node.set_right_child_offset(7);
        assert_eq!(node.primitives(), Some(3..5));
        assert_eq!(node.children(0), None);
    }

    #[test]
    fn test_node_stays_compact() {
        assert!(std::mem::size_of::<BvhNode>() <= 64);
    }
}
