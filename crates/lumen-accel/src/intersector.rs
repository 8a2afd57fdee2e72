//! Accumulates the best hit of one ray across many primitive tests.

use std::sync::Arc;

use bytemuck::Pod;
use lumen_math::{Transform, Vec3};

use crate::hit::HitContext;
use crate::{FaceId, Geometry, Hit, HitArena, HitId, Ray, RayError, TraceMode};

/// Running state of a single ray query.
///
/// The distance window `(minimum_distance, maximum_distance)` only ever
/// narrows: in closest-hit mode every accepted hit becomes the new upper
/// bound, in any-hit mode the first accepted hit finishes the query.
pub struct Intersector<'a> {
    ray: Ray,
    minimum_distance: f64,
    maximum_distance: f64,
    mode: TraceMode,
    done: bool,
    arena: &'a mut HitArena,
    closest: Option<Accepted>,
}

#[derive(Debug, Clone, Copy)]
struct Accepted {
    id: HitId,
    distance_error: f64,
}

impl<'a> Intersector<'a> {
    /// Query for the nearest hit strictly inside the window.
    pub fn closest_hit(
        arena: &'a mut HitArena,
        ray: Ray,
        minimum_distance: f64,
        maximum_distance: f64,
    ) -> Self {
        Self::new(arena, ray, minimum_distance, maximum_distance, TraceMode::ClosestHit)
    }

    /// Query for whether anything lies strictly inside the window.
    pub fn any_hit(
        arena: &'a mut HitArena,
        ray: Ray,
        minimum_distance: f64,
        maximum_distance: f64,
    ) -> Self {
        Self::new(arena, ray, minimum_distance, maximum_distance, TraceMode::AnyHit)
    }

    fn new(
        arena: &'a mut HitArena,
        ray: Ray,
        minimum_distance: f64,
        maximum_distance: f64,
        mode: TraceMode,
    ) -> Self {
        debug_assert!(minimum_distance <= maximum_distance);
        Self {
            ray,
            minimum_distance,
            maximum_distance,
            mode,
            done: false,
            arena,
            closest: None,
        }
    }

    /// The world-space ray.
    #[inline]
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    /// Lower end of the window.
    #[inline]
    pub fn minimum_distance(&self) -> f64 {
        self.minimum_distance
    }

    /// Upper end of the window; shrinks as closer hits are found.
    #[inline]
    pub fn maximum_distance(&self) -> f64 {
        self.maximum_distance
    }

    /// Whether the query has its answer and traversal can stop.
    #[inline]
    pub fn done(&self) -> bool {
        self.done
    }

    /// Test a world-space primitive with no scene identity.
    pub fn intersect(&mut self, geometry: &dyn Geometry) -> bool {
        self.intersect_primitive(None, geometry, None)
    }

    /// Test a primitive placed in the world by `model_to_world`.
    pub fn intersect_transformed(
        &mut self,
        geometry: &dyn Geometry,
        model_to_world: &Arc<Transform>,
    ) -> bool {
        self.intersect_primitive(None, geometry, Some(model_to_world))
    }

    /// Test scene primitive `index`, recording it on any hit it produces.
    ///
    /// Returns whether the query is now done.
    pub fn intersect_primitive(
        &mut self,
        index: Option<usize>,
        geometry: &dyn Geometry,
        model_to_world: Option<&Arc<Transform>>,
    ) -> bool {
        if self.done {
            return true;
        }

        let previous = self.arena.swap_context(HitContext {
            primitive: index,
            model_to_world: model_to_world.cloned(),
        });

        let (head, space_change) = match model_to_world {
            Some(transform) => {
                let (model_ray, error) = self.ray.to_model(transform);
                let head = geometry.trace(
                    &model_ray,
                    self.minimum_distance,
                    self.maximum_distance,
                    self.mode,
                    &mut self.arena.allocator(&model_ray),
                );
                (head, Some((error, *model_ray.direction())))
            }
            None => {
                let head = geometry.trace(
                    &self.ray,
                    self.minimum_distance,
                    self.maximum_distance,
                    self.mode,
                    &mut self.arena.allocator(&self.ray),
                );
                (head, None)
            }
        };

        self.arena.swap_context(previous);
        self.accept(head, space_change)
    }

    fn accept(&mut self, head: Option<HitId>, space_change: Option<(RayError, Vec3)>) -> bool {
        let mut accepted = None;
        for (id, hit) in self.arena.chain(head) {
            if hit.distance >= self.maximum_distance {
                break;
            }
            if hit.distance > self.minimum_distance {
                accepted = Some((id, hit.distance, hit.distance_error));
                break;
            }
        }

        if let Some((id, distance, distance_error)) = accepted {
            let transform_error = space_change
                .map_or(0.0, |(error, direction)| error.distance_error(&direction, distance));
            self.closest = Some(Accepted {
                id,
                distance_error: distance_error + transform_error,
            });
            self.maximum_distance = distance;
            if self.mode != TraceMode::ClosestHit {
                self.done = true;
            }
        }

        self.done
    }

    /// The best hit accepted so far.
    pub fn closest(&self) -> Option<ClosestHit<'_>> {
        self.closest.map(|accepted| ClosestHit {
            hit: self.arena.hit(accepted.id),
            distance_error: accepted.distance_error,
            arena: &*self.arena,
        })
    }

    /// Finish the query, keeping the best hit borrowed from the arena.
    pub fn into_closest(self) -> Option<ClosestHit<'a>> {
        let Intersector { arena, closest, .. } = self;
        let arena: &'a HitArena = arena;
        closest.map(|accepted| ClosestHit {
            hit: arena.hit(accepted.id),
            distance_error: accepted.distance_error,
            arena,
        })
    }
}

/// The winning hit of a query, borrowed from its arena.
#[derive(Debug, Clone, Copy)]
pub struct ClosestHit<'a> {
    /// The hit as the primitive reported it.
    pub hit: &'a Hit,
    /// Distance error including any error from changing ray space.
    pub distance_error: f64,
    arena: &'a HitArena,
}

impl<'a> ClosestHit<'a> {
    /// Distance along the world-space ray.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.hit.distance
    }

    /// Payload attached by the primitive, if stored as a `T`.
    pub fn payload<T: Pod>(&self) -> Option<T> {
        self.arena.payload(self.hit)
    }

    /// Copy the arena-independent parts of the hit.
    pub fn summary(&self) -> HitSummary {
        HitSummary {
            distance: self.hit.distance,
            distance_error: self.distance_error,
            primitive: self.hit.primitive(),
            front_face: self.hit.front_face,
            back_face: self.hit.back_face,
        }
    }
}

/// Owned description of a hit that outlives its arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitSummary {
    /// Distance along the world-space ray.
    pub distance: f64,
    /// Bound on the absolute error of `distance`.
    pub distance_error: f64,
    /// Scene index of the primitive that was hit.
    pub primitive: Option<usize>,
    /// Face on the side the ray arrived from.
    pub front_face: FaceId,
    /// Face on the opposite side.
    pub back_face: FaceId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Sphere;
    use lumen_math::Point3;

    fn ray_along_x() -> Ray {
        Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn test_closest_hit_narrows_window() {
        let mut arena = HitArena::new();
        let near = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);
        let far = Sphere::new(Point3::new(3.0, 0.0, 0.0), 1.0);

        let mut intersector = Intersector::closest_hit(&mut arena, ray_along_x(), 0.0, f64::INFINITY);
        assert!(!intersector.intersect_primitive(Some(1), &far, None));
        assert!((intersector.maximum_distance() - 7.0).abs() < 1e-9);
        assert!(!intersector.intersect_primitive(Some(0), &near, None));
        assert!((intersector.maximum_distance() - 4.0).abs() < 1e-9);

        // A farther primitive tested later cannot replace the nearer hit.
        intersector.intersect_primitive(Some(1), &far, None);
        let closest = intersector.closest().unwrap();
        assert_eq!(closest.hit.primitive(), Some(0));
        assert!((closest.distance() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_any_hit_finishes_early() {
        let mut arena = HitArena::new();
        let sphere = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);

        let mut intersector = Intersector::any_hit(&mut arena, ray_along_x(), 0.0, f64::INFINITY);
        assert!(intersector.intersect(&sphere));
        assert!(intersector.done());
        let len = arena_len(&intersector);
        assert!(intersector.intersect(&sphere));
        assert_eq!(arena_len(&intersector), len);
    }

    fn arena_len(intersector: &Intersector<'_>) -> usize {
        intersector.arena.len()
    }

    #[test]
    fn test_minimum_distance_skips_entry_hit() {
        let mut arena = HitArena::new();
        let sphere = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);

        // Window starts past the entry point, so the exit is accepted.
        let mut intersector = Intersector::closest_hit(&mut arena, ray_along_x(), 4.5, f64::INFINITY);
        intersector.intersect(&sphere);
        let closest = intersector.closest().unwrap();
        assert!((closest.distance() - 6.0).abs() < 1e-9);
        assert_eq!(closest.hit.front_face, Sphere::INSIDE);
    }

    #[test]
    fn test_window_excludes_far_hits() {
        let mut arena = HitArena::new();
        let sphere = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);

        let mut intersector = Intersector::closest_hit(&mut arena, ray_along_x(), 0.0, 3.0);
        intersector.intersect(&sphere);
        assert!(intersector.closest().is_none());
        assert_eq!(intersector.maximum_distance(), 3.0);
    }

    #[test]
    fn test_transformed_primitive() {
        let mut arena = HitArena::new();
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let model_to_world = Arc::new(
            Transform::translation(2.0, 0.0, 0.0).then(&Transform::scale(2.0, 2.0, 2.0)),
        );

        let mut intersector = Intersector::closest_hit(&mut arena, ray_along_x(), 0.0, f64::INFINITY);
        intersector.intersect_transformed(&sphere, &model_to_world);
        let closest = intersector.closest().unwrap();

        // World-space sphere of radius 2 at x = 2 is entered at x = 0.
        assert!((closest.distance() - 5.0).abs() < 1e-9);
        assert!(closest.distance_error >= closest.hit.distance_error);
        assert!(Arc::ptr_eq(closest.hit.model_to_world().unwrap(), &model_to_world));

        // The payload is the model-space hit point.
        let local: [f64; 3] = closest.payload().unwrap();
        assert!((local[0] + 1.0).abs() < 1e-9);
    }
}
