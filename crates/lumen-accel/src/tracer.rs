//! Per-ray entry points over a [`Scene`].
//!
//! Every query takes the caller's [`HitArena`] and clears it first, so one
//! arena per thread is reused for the life of a render.

use rayon::prelude::*;

use crate::scene::Scene;
use crate::{ClosestHit, HitArena, HitSummary, Intersector, Ray};

/// Distance below which hits are treated as self-intersections.
pub const DEFAULT_MINIMUM_DISTANCE: f64 = 1e-6;

/// Closest-hit queries.
#[derive(Clone, Copy)]
pub struct RayTracer<'s> {
    scene: &'s dyn Scene,
    minimum_distance: f64,
}

impl<'s> RayTracer<'s> {
    /// Trace against `scene` with [`DEFAULT_MINIMUM_DISTANCE`].
    pub fn new(scene: &'s dyn Scene) -> Self {
        Self {
            scene,
            minimum_distance: DEFAULT_MINIMUM_DISTANCE,
        }
    }

    /// Override the self-intersection distance.
    pub fn with_minimum_distance(mut self, minimum_distance: f64) -> Self {
        debug_assert!(minimum_distance >= 0.0);
        self.minimum_distance = minimum_distance;
        self
    }

    /// The nearest hit along `ray`, if any.
    pub fn trace<'a>(&self, ray: Ray, arena: &'a mut HitArena) -> Option<ClosestHit<'a>> {
        arena.clear();
        let mut intersector =
            Intersector::closest_hit(arena, ray, self.minimum_distance, f64::INFINITY);
        self.scene.trace(&mut intersector);
        intersector.into_closest()
    }
}

/// Shadow-ray queries.
#[derive(Clone, Copy)]
pub struct VisibilityTester<'s> {
    scene: &'s dyn Scene,
    minimum_distance: f64,
}

impl<'s> VisibilityTester<'s> {
    /// Test against `scene` with [`DEFAULT_MINIMUM_DISTANCE`].
    pub fn new(scene: &'s dyn Scene) -> Self {
        Self {
            scene,
            minimum_distance: DEFAULT_MINIMUM_DISTANCE,
        }
    }

    /// Override the self-intersection distance.
    pub fn with_minimum_distance(mut self, minimum_distance: f64) -> Self {
        debug_assert!(minimum_distance >= 0.0);
        self.minimum_distance = minimum_distance;
        self
    }

    /// Whether nothing blocks `ray` before `distance`.
    ///
    /// A hit at exactly `distance`, such as the light's own surface, does
    /// not count as an occluder.
    pub fn visible(&self, ray: Ray, distance: f64, arena: &mut HitArena) -> bool {
        if distance <= self.minimum_distance {
            return true;
        }
        arena.clear();
        let mut intersector = Intersector::any_hit(arena, ray, self.minimum_distance, distance);
        self.scene.trace(&mut intersector);
        !intersector.done()
    }
}

/// Trace `rays` in parallel, one arena per worker.
pub fn trace_closest_batch(
    scene: &dyn Scene,
    rays: &[Ray],
    minimum_distance: f64,
) -> Vec<Option<HitSummary>> {
    let tracer = RayTracer::new(scene).with_minimum_distance(minimum_distance);
    rays.par_iter()
        .map_init(HitArena::new, |arena, ray| {
            tracer.trace(*ray, arena).map(|hit| hit.summary())
        })
        .collect()
}
