//! The contract every traceable primitive implements.

use lumen_math::Transform;

use crate::{BoundingBox, FaceId, HitAllocator, HitId, Ray};

/// How many hits a trace needs to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceMode {
    /// Only the nearest hit inside the window matters.
    ClosestHit,
    /// Any hit inside the window will do.
    AnyHit,
    /// Every hit along the ray, e.g. for nested media.
    AllHits,
}

/// A primitive that can be placed in a scene.
///
/// Implementations own their shape mathematics; the acceleration
/// structures only rely on bounds and on the ordering of the returned
/// chain.
pub trait Geometry: Send + Sync {
    /// Bounds of the primitive, in world space when a model-to-world
    /// transform is given.
    fn compute_bounds(&self, model_to_world: Option<&Transform>) -> BoundingBox;

    /// Intersect a model-space ray.
    ///
    /// Hits must be allocated from `allocator` and returned as a chain in
    /// strictly ascending distance. Hits outside
    /// `[min_distance, max_distance]` may be omitted.
    fn trace(
        &self,
        ray: &Ray,
        min_distance: f64,
        max_distance: f64,
        mode: TraceMode,
        allocator: &mut HitAllocator<'_>,
    ) -> Option<HitId>;

    /// Every face identifier this primitive can report.
    fn faces(&self) -> Vec<FaceId>;

    /// Whether `face` emits light and so needs an area light.
    fn is_emissive(&self, _face: FaceId) -> bool {
        false
    }
}
