//! Iterative front-to-back BVH traversal.

use std::ops::Range;

use super::{Bvh, NodeKind};
use crate::settings::MAX_DEPTH;
use crate::Intersector;

impl Bvh {
    /// Walk the tree along the intersector's ray.
    ///
    /// `visit_leaf` is called with each leaf's primitive range whose box the
    /// ray enters inside the current window. Because the window is re-read
    /// at every node, hits found in earlier leaves prune later boxes, and
    /// the walk stops as soon as the intersector reports it is done.
    pub fn trace<'a, F>(&self, intersector: &mut Intersector<'a>, mut visit_leaf: F)
    where
        F: FnMut(&mut Intersector<'a>, Range<usize>),
    {
        if self.nodes.is_empty() {
            return;
        }

        let ray = *intersector.ray();
        let mut stack = [0usize; MAX_DEPTH];
        let mut stack_len = 0;
        let mut current = 0;

        loop {
            let node = &self.nodes[current];
            let entered = node
                .bounds()
                .intersect_ray(
                    &ray,
                    intersector.minimum_distance(),
                    intersector.maximum_distance(),
                )
                .is_some();

            if entered {
                match node.kind() {
                    NodeKind::Interior {
                        axis,
                        right_child_offset,
                    } => {
                        let below = current + 1;
                        let above = current + right_child_offset as usize;
                        debug_assert!(stack_len < MAX_DEPTH, "BVH deeper than traversal stack");
                        // Visit the child on the side the ray comes from first.
                        if ray.direction()[axis.index()] < 0.0 {
                            stack[stack_len] = below;
                            current = above;
                        } else {
                            stack[stack_len] = above;
                            current = below;
                        }
                        stack_len += 1;
                        continue;
                    }
                    NodeKind::Leaf { offset, count } => {
                        let start = offset as usize;
                        visit_leaf(intersector, start..start + count as usize);
                        if intersector.done() {
                            return;
                        }
                    }
                }
            }

            if stack_len == 0 {
                return;
            }
            stack_len -= 1;
            current = stack[stack_len];
        }
    }
}
