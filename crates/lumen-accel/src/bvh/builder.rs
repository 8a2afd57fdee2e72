//! Surface Area Heuristic BVH construction.
//!
//! Nodes are emitted in pre-order into one array while the primitive index
//! list is partitioned in place. Every degenerate case (coincident
//! centroids, an unprofitable split, an exhausted depth budget) ends in a
//! leaf, so construction cannot fail.

use lumen_math::{Point3, Transform};

use super::node::BvhNode;
use super::Bvh;
use crate::{Axis, BoundingBox, BoundingBoxBuilder, BvhSettings, Geometry, Result};

/// Shape of a finished tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Total nodes emitted.
    pub node_count: usize,
    /// Leaves among them.
    pub leaf_count: usize,
    /// Deepest leaf, with the root at depth 0.
    pub max_depth: usize,
    /// Most primitives in a single leaf.
    pub max_leaf_size: usize,
}

/// Result of [`build_bvh`].
#[derive(Debug, Clone)]
pub struct BvhBuild {
    /// The tree.
    pub bvh: Bvh,
    /// `sort_order[original_index]` is the position primitive
    /// `original_index` must move to so every leaf range is contiguous.
    pub sort_order: Vec<usize>,
    /// Shape of the tree.
    pub stats: BvhStats,
}

#[derive(Debug, Clone, Copy)]
struct PrimitiveInfo {
    bounds: BoundingBox,
    centroid: Point3,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    count: usize,
    bounds: BoundingBoxBuilder,
}

/// Build a BVH over `count` primitives.
///
/// `primitive(i)` yields the geometry and optional model-to-world transform
/// of primitive `i`. The primitives themselves are not moved; apply the
/// returned `sort_order` to the collection they came from.
///
/// Fails only if `settings` is out of range.
pub fn build_bvh<'g, F>(count: usize, settings: &BvhSettings, primitive: F) -> Result<BvhBuild>
where
    F: FnMut(usize) -> (&'g dyn Geometry, Option<&'g Transform>),
{
    settings.validate()?;
    Ok(build_validated(count, settings, primitive))
}

/// [`build_bvh`] for settings already known to be valid.
pub(crate) fn build_validated<'g, F>(count: usize, settings: &BvhSettings, mut primitive: F) -> BvhBuild
where
    F: FnMut(usize) -> (&'g dyn Geometry, Option<&'g Transform>),
{
    debug_assert!(count > 0, "a BVH needs at least one primitive");
    debug_assert!(settings.validate().is_ok(), "unvalidated BVH settings");

    let info: Vec<PrimitiveInfo> = (0..count)
        .map(|i| {
            let (geometry, model_to_world) = primitive(i);
            let bounds = geometry.compute_bounds(model_to_world);
            PrimitiveInfo {
                bounds,
                centroid: bounds.center(),
            }
        })
        .collect();

    let mut builder = Builder {
        settings,
        info,
        nodes: Vec::with_capacity(2 * count),
        sort_order: vec![0; count],
        next_slot: 0,
        bins: vec![Bin::default(); settings.bin_count],
        stats: BvhStats::default(),
    };

    let mut indices: Vec<usize> = (0..count).collect();
    if count > 0 {
        builder.build_node(&mut indices, settings.max_depth, 0);
    }

    let mut stats = builder.stats;
    stats.node_count = builder.nodes.len();
    log::info!(
        "Built BVH over {} primitives: {} nodes, {} leaves, depth {}, largest leaf {}",
        count,
        stats.node_count,
        stats.leaf_count,
        stats.max_depth,
        stats.max_leaf_size
    );

    BvhBuild {
        bvh: Bvh {
            nodes: builder.nodes,
        },
        sort_order: builder.sort_order,
        stats,
    }
}

struct Builder<'s> {
    settings: &'s BvhSettings,
    info: Vec<PrimitiveInfo>,
    nodes: Vec<BvhNode>,
    sort_order: Vec<usize>,
    next_slot: usize,
    bins: Vec<Bin>,
    stats: BvhStats,
}

impl Builder<'_> {
    /// Build the subtree over `indices`, returning its root's node index.
    fn build_node(&mut self, indices: &mut [usize], depth_remaining: usize, depth: usize) -> usize {
        let mut bounds = BoundingBoxBuilder::new();
        for &i in indices.iter() {
            bounds.add_box(&self.info[i].bounds);
        }
        let bounds = bounds.build();

        if indices.len() == 1 {
            return self.make_leaf(bounds, indices, depth);
        }
        if depth_remaining == 0 {
            log::warn!(
                "BVH depth budget exhausted; forcing a leaf of {} primitives",
                indices.len()
            );
            return self.make_leaf(bounds, indices, depth);
        }

        let mut centroids = BoundingBoxBuilder::new();
        for &i in indices.iter() {
            centroids.add_point(&self.info[i].centroid);
        }
        let centroids = centroids.build();
        let axis = centroids.largest_axis();
        let axis_min = centroids.lower()[axis.index()];
        let axis_extent = centroids.diagonal()[axis.index()];
        // Also catches NaN extents.
        if !(axis_extent > 0.0) {
            return self.make_leaf(bounds, indices, depth);
        }

        let mid = if indices.len() == 2 {
            let a = self.info[indices[0]].centroid[axis.index()];
            let b = self.info[indices[1]].centroid[axis.index()];
            if b < a {
                indices.swap(0, 1);
            }
            1
        } else {
            let Some(split) = self.find_split(indices, &bounds, axis, axis_min, axis_extent) else {
                return self.make_leaf(bounds, indices, depth);
            };
            let bin_count = self.bins.len();
            let info = &self.info;
            partition(indices, |i| {
                bin_index(info[i].centroid[axis.index()], axis_min, axis_extent, bin_count) <= split
            })
        };

        if mid == 0 || mid == indices.len() {
            return self.make_leaf(bounds, indices, depth);
        }

        let node_index = self.nodes.len();
        self.nodes.push(BvhNode::interior(bounds, axis));

        let (below, above) = indices.split_at_mut(mid);
        self.build_node(below, depth_remaining - 1, depth + 1);
        let right = self.build_node(above, depth_remaining - 1, depth + 1);
        self.nodes[node_index].set_right_child_offset(right - node_index);

        node_index
    }

    /// Pick the bin after which to split, or `None` if a leaf is cheaper.
    ///
    /// Candidate `k` puts bins `0..=k` below the plane. Cost is
    /// `1 + (SA(below) * N(below) + SA(above) * N(above)) / SA(node)`.
    fn find_split(
        &mut self,
        indices: &[usize],
        bounds: &BoundingBox,
        axis: Axis,
        axis_min: f64,
        axis_extent: f64,
    ) -> Option<usize> {
        let bin_count = self.bins.len();
        for bin in self.bins.iter_mut() {
            *bin = Bin::default();
        }
        for &i in indices {
            let info = &self.info[i];
            let b = bin_index(info.centroid[axis.index()], axis_min, axis_extent, bin_count);
            self.bins[b].count += 1;
            self.bins[b].bounds.add_box(&info.bounds);
        }

        let candidates = bin_count - 1;
        let mut costs = [0.0f64; crate::settings::MAX_BIN_COUNT];

        // Sweep up accumulating the below side.
        let mut below = BoundingBoxBuilder::new();
        let mut below_count = 0;
        for k in 0..candidates {
            below.merge(&self.bins[k].bounds);
            below_count += self.bins[k].count;
            costs[k] = side_cost(&below, below_count);
        }

        // Sweep down accumulating the above side.
        let mut above = BoundingBoxBuilder::new();
        let mut above_count = 0;
        for k in (0..candidates).rev() {
            above.merge(&self.bins[k + 1].bounds);
            above_count += self.bins[k + 1].count;
            costs[k] += side_cost(&above, above_count);
        }

        let node_area = bounds.surface_area();
        let inv_area = if node_area > 0.0 { 1.0 / node_area } else { 0.0 };

        // `<=` so the highest-indexed candidate wins ties.
        let mut best = 0;
        let mut best_cost = f64::INFINITY;
        for (k, cost) in costs[..candidates].iter().enumerate() {
            let cost = 1.0 + cost * inv_area;
            if cost <= best_cost {
                best = k;
                best_cost = cost;
            }
        }

        let leaf_cost = indices.len() as f64;
        if indices.len() < self.settings.leaf_size_threshold && best_cost > leaf_cost {
            return None;
        }
        Some(best)
    }

    fn make_leaf(&mut self, bounds: BoundingBox, indices: &[usize], depth: usize) -> usize {
        let offset = self.next_slot;
        for &i in indices {
            self.sort_order[i] = self.next_slot;
            self.next_slot += 1;
        }

        self.stats.leaf_count += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);
        self.stats.max_leaf_size = self.stats.max_leaf_size.max(indices.len());

        let node_index = self.nodes.len();
        self.nodes.push(BvhNode::leaf(bounds, offset, indices.len()));
        node_index
    }
}

/// Bucket of a centroid coordinate along the split axis.
#[inline]
fn bin_index(c: f64, axis_min: f64, axis_extent: f64, bin_count: usize) -> usize {
    let b = ((c - axis_min) / axis_extent * bin_count as f64) as usize;
    b.min(bin_count - 1)
}

#[inline]
fn side_cost(bounds: &BoundingBoxBuilder, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    bounds.build().surface_area() * count as f64
}

/// Move every index satisfying `below` to the front, returning how many did.
fn partition(indices: &mut [usize], mut below: impl FnMut(usize) -> bool) -> usize {
    let mut left = 0;
    let mut right = indices.len();

    while left < right {
        if below(indices[left]) {
            left += 1;
        } else {
            right -= 1;
            indices.swap(left, right);
        }
    }

    left
}
