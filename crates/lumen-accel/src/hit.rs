//! Hit records and the per-ray arena they are allocated from.
//!
//! Primitives report intersections as singly linked chains of [`Hit`]s in
//! ascending distance order. Chains are built far-to-near: each call to
//! [`HitAllocator::allocate`] threads a new, nearer hit in front of the
//! existing chain. All storage lives in a [`HitArena`] that is cleared, not
//! freed, between rays, so once the arena has grown to its working size a
//! trace performs no heap allocation at all.

use std::any::TypeId;
use std::mem;
use std::sync::Arc;

use bytemuck::Pod;
use lumen_math::Transform;

use crate::Ray;

/// Identifier of a face on a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

/// Handle to a [`Hit`] stored in a [`HitArena`].
///
/// Only valid until the arena is next cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitId(u32);

impl HitId {
    /// Slot index inside the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Location and type tag of a payload copied into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Payload {
    slot: u32,
    type_id: TypeId,
}

/// One intersection reported by a primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// The next farther hit in the chain.
    pub next: Option<HitId>,
    /// Distance along the ray.
    pub distance: f64,
    /// Bound on the absolute error of `distance`.
    pub distance_error: f64,
    /// Face on the side the ray arrived from.
    pub front_face: FaceId,
    /// Face on the opposite side.
    pub back_face: FaceId,
    payload: Option<Payload>,
    primitive: Option<usize>,
    model_to_world: Option<Arc<Transform>>,
}

impl Hit {
    /// Index of the scene primitive that produced this hit, if known.
    #[inline]
    pub fn primitive(&self) -> Option<usize> {
        self.primitive
    }

    /// Model-to-world transform of the producing primitive, if any.
    #[inline]
    pub fn model_to_world(&self) -> Option<&Arc<Transform>> {
        self.model_to_world.as_ref()
    }

    /// Whether additional data was attached.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

/// Which primitive is currently being traced.
///
/// Stamped onto every hit allocated while it is active, so primitives do
/// not need to know their own scene index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitContext {
    /// Scene index of the primitive.
    pub primitive: Option<usize>,
    /// Its model-to-world transform, if any.
    pub model_to_world: Option<Arc<Transform>>,
}

/// Storage currently reserved by a [`HitArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaUsage {
    /// Hit slots ever allocated.
    pub hit_slots: usize,
    /// Payload buffers ever allocated.
    pub payload_slots: usize,
    /// Sum of payload buffer capacities in bytes.
    pub payload_bytes: usize,
}

/// Reusable pool of hit records and payload buffers for one thread.
///
/// Trace calls take the arena by `&mut`, so one arena can never serve two
/// rays at once.
#[derive(Debug, Default)]
pub struct HitArena {
    hits: Vec<Hit>,
    num_hits: usize,
    payloads: Vec<Vec<u8>>,
    num_payloads: usize,
    context: HitContext,
}

impl HitArena {
    /// Create an empty arena. Nothing is allocated until first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all hits, keeping every buffer for reuse.
    ///
    /// Transforms referenced by the forgotten hits are released, so an
    /// arena never keeps a dropped scene's transforms alive.
    pub fn clear(&mut self) {
        for hit in &mut self.hits[..self.num_hits] {
            hit.model_to_world = None;
        }
        self.num_hits = 0;
        self.num_payloads = 0;
        self.context = HitContext::default();
    }

    /// Number of hits allocated since the last clear.
    pub fn len(&self) -> usize {
        self.num_hits
    }

    /// Whether no hits have been allocated since the last clear.
    pub fn is_empty(&self) -> bool {
        self.num_hits == 0
    }

    /// Storage reserved so far.
    pub fn usage(&self) -> ArenaUsage {
        ArenaUsage {
            hit_slots: self.hits.len(),
            payload_slots: self.payloads.len(),
            payload_bytes: self.payloads.iter().map(Vec::capacity).sum(),
        }
    }

    /// Look up a hit.
    #[inline]
    pub fn hit(&self, id: HitId) -> &Hit {
        debug_assert!(id.index() < self.num_hits, "stale hit id");
        &self.hits[id.index()]
    }

    /// Walk a chain starting at `head`, nearest first.
    pub fn chain(&self, head: Option<HitId>) -> HitChain<'_> {
        HitChain {
            arena: self,
            next: head,
        }
    }

    /// Raw bytes of the payload attached to `hit`.
    pub fn payload_bytes(&self, hit: &Hit) -> Option<&[u8]> {
        hit.payload
            .map(|p| self.payloads[p.slot as usize].as_slice())
    }

    /// Copy out the payload attached to `hit` if it was stored as a `T`.
    pub fn payload<T: Pod>(&self, hit: &Hit) -> Option<T> {
        let payload = hit.payload?;
        if payload.type_id != TypeId::of::<T>() {
            return None;
        }
        let bytes = &self.payloads[payload.slot as usize];
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// The active primitive context.
    pub fn context(&self) -> &HitContext {
        &self.context
    }

    /// Install a new primitive context, returning the previous one so it
    /// can be restored after a nested trace.
    pub fn swap_context(&mut self, context: HitContext) -> HitContext {
        mem::replace(&mut self.context, context)
    }

    /// Bind this arena to a ray for allocation.
    pub fn allocator<'a>(&'a mut self, ray: &'a Ray) -> HitAllocator<'a> {
        HitAllocator { ray, arena: self }
    }

    fn push_hit(&mut self, hit: Hit) -> HitId {
        let index = self.num_hits;
        if index < self.hits.len() {
            self.hits[index] = hit;
        } else {
            self.hits.push(hit);
        }
        self.num_hits += 1;
        HitId(index as u32)
    }

    fn push_payload(&mut self, bytes: &[u8]) -> u32 {
        let index = self.num_payloads;
        if index < self.payloads.len() {
            let buffer = &mut self.payloads[index];
            buffer.clear();
            buffer.extend_from_slice(bytes);
        } else {
            self.payloads.push(bytes.to_vec());
        }
        self.num_payloads += 1;
        index as u32
    }
}

/// Iterator over a hit chain.
pub struct HitChain<'a> {
    arena: &'a HitArena,
    next: Option<HitId>,
}

impl<'a> Iterator for HitChain<'a> {
    type Item = (HitId, &'a Hit);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let hit = self.arena.hit(id);
        self.next = hit.next;
        Some((id, hit))
    }
}

/// Allocation handle given to a primitive for the duration of one trace.
pub struct HitAllocator<'a> {
    ray: &'a Ray,
    arena: &'a mut HitArena,
}

impl<'a> HitAllocator<'a> {
    /// The ray being traced.
    #[inline]
    pub fn ray(&self) -> &Ray {
        self.ray
    }

    /// Look up a hit allocated earlier in this trace.
    #[inline]
    pub fn hit(&self, id: HitId) -> &Hit {
        self.arena.hit(id)
    }

    /// Allocate a hit in front of `next`.
    ///
    /// `distance` must be strictly less than the distance of `next`.
    pub fn allocate(
        &mut self,
        next: Option<HitId>,
        distance: f64,
        distance_error: f64,
        front_face: FaceId,
        back_face: FaceId,
    ) -> HitId {
        self.allocate_internal(next, distance, distance_error, front_face, back_face, None)
    }

    /// Allocate a hit in front of `next` carrying a copy of `payload`.
    ///
    /// The payload is read back with [`HitArena::payload`] using the same
    /// type.
    pub fn allocate_with<T: Pod>(
        &mut self,
        next: Option<HitId>,
        distance: f64,
        distance_error: f64,
        front_face: FaceId,
        back_face: FaceId,
        payload: &T,
    ) -> HitId {
        let slot = self.arena.push_payload(bytemuck::bytes_of(payload));
        let payload = Payload {
            slot,
            type_id: TypeId::of::<T>(),
        };
        self.allocate_internal(
            next,
            distance,
            distance_error,
            front_face,
            back_face,
            Some(payload),
        )
    }

    fn allocate_internal(
        &mut self,
        next: Option<HitId>,
        distance: f64,
        distance_error: f64,
        front_face: FaceId,
        back_face: FaceId,
        payload: Option<Payload>,
    ) -> HitId {
        debug_assert!(
            next.map_or(true, |n| distance < self.arena.hit(n).distance),
            "hits must be allocated far to near"
        );
        let context = &self.arena.context;
        let hit = Hit {
            next,
            distance,
            distance_error,
            front_face,
            back_face,
            payload,
            primitive: context.primitive,
            model_to_world: context.model_to_world.clone(),
        };
        self.arena.push_hit(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::{Point3, Vec3};

    fn test_ray() -> Ray {
        Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, 1.0))
    }

    fn build_chain(arena: &mut HitArena, ray: &Ray) -> Option<HitId> {
        let mut allocator = arena.allocator(ray);
        let far = allocator.allocate_with(None, 3.0, 0.1, FaceId(1), FaceId(0), &[7.0f64, 8.0, 9.0]);
        let mid = allocator.allocate(Some(far), 2.0, 0.0, FaceId(0), FaceId(1));
        Some(allocator.allocate_with(Some(mid), 1.0, 0.0, FaceId(0), FaceId(1), &42u32))
    }

    #[test]
    fn test_chain_is_ascending() {
        let ray = test_ray();
        let mut arena = HitArena::new();
        let head = build_chain(&mut arena, &ray);

        let distances: Vec<f64> = arena.chain(head).map(|(_, h)| h.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_payload_typed_lookup() {
        let ray = test_ray();
        let mut arena = HitArena::new();
        let head = build_chain(&mut arena, &ray);

        let hits: Vec<&Hit> = arena.chain(head).map(|(_, h)| h).collect();
        assert_eq!(arena.payload::<u32>(hits[0]), Some(42));
        assert_eq!(arena.payload::<[f64; 3]>(hits[2]), Some([7.0, 8.0, 9.0]));
        assert!(!hits[1].has_payload());
        assert_eq!(arena.payload::<u32>(hits[1]), None);

        // Wrong type is refused even when the size matches.
        assert_eq!(arena.payload::<f32>(hits[0]), None);
        assert_eq!(arena.payload_bytes(hits[0]).map(<[u8]>::len), Some(4));
    }

    #[test]
    fn test_clear_reuses_storage() {
        let ray = test_ray();
        let mut arena = HitArena::new();

        let head = build_chain(&mut arena, &ray);
        let first: Vec<Hit> = arena.chain(head).map(|(_, h)| h.clone()).collect();
        let usage = arena.usage();

        arena.clear();
        assert!(arena.is_empty());

        let head = build_chain(&mut arena, &ray);
        let second: Vec<Hit> = arena.chain(head).map(|(_, h)| h.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(arena.usage(), usage);
        assert_eq!(usage.hit_slots, 3);
        assert_eq!(usage.payload_slots, 2);
    }

    #[test]
    fn test_payload_buffer_keeps_largest_capacity() {
        let ray = test_ray();
        let mut arena = HitArena::new();

        arena.allocator(&ray).allocate_with(None, 1.0, 0.0, FaceId(0), FaceId(0), &[0u8; 64]);
        let capacity = arena.usage().payload_bytes;
        arena.clear();

        let id = arena.allocator(&ray).allocate_with(None, 1.0, 0.0, FaceId(0), FaceId(0), &5u16);
        assert_eq!(arena.usage().payload_bytes, capacity);
        assert_eq!(arena.payload::<u16>(arena.hit(id)), Some(5));
    }

    #[test]
    fn test_context_is_recorded() {
        let ray = test_ray();
        let mut arena = HitArena::new();
        let transform = Arc::new(Transform::translation(1.0, 0.0, 0.0));

        let previous = arena.swap_context(HitContext {
            primitive: Some(7),
            model_to_world: Some(transform.clone()),
        });
        assert_eq!(previous, HitContext::default());

        let id = arena.allocator(&ray).allocate(None, 1.0, 0.0, FaceId(0), FaceId(1));
        arena.swap_context(previous);

        let hit = arena.hit(id);
        assert_eq!(hit.primitive(), Some(7));
        assert!(Arc::ptr_eq(hit.model_to_world().unwrap(), &transform));
        assert_eq!(arena.context().primitive, None);
    }

    #[test]
    fn test_clear_releases_transforms() {
        let ray = test_ray();
        let mut arena = HitArena::new();
        let transform = Arc::new(Transform::translation(0.0, 2.0, 0.0));

        arena.swap_context(HitContext {
            primitive: Some(0),
            model_to_world: Some(transform.clone()),
        });
        arena.allocator(&ray).allocate(None, 1.0, 0.0, FaceId(0), FaceId(1));
        assert_eq!(Arc::strong_count(&transform), 3);

        arena.clear();
        assert_eq!(Arc::strong_count(&transform), 1);
        assert_eq!(arena.usage().hit_slots, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "far to near")]
    fn test_out_of_order_allocation_panics() {
        let ray = test_ray();
        let mut arena = HitArena::new();
        let mut allocator = arena.allocator(&ray);
        let near = allocator.allocate(None, 1.0, 0.0, FaceId(0), FaceId(0));
        allocator.allocate(Some(near), 2.0, 0.0, FaceId(0), FaceId(0));
    }
}
