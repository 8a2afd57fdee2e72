//! Analytic sphere (quadratic equation).

use lumen_math::{gamma, Point3, Transform, Vec3};

use crate::{BoundingBox, FaceId, Geometry, HitAllocator, HitId, Ray, TraceMode};

/// A sphere with distinct outside and inside faces.
///
/// Every hit carries its model-space position as a `[f64; 3]` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    /// Center in model space.
    pub center: Point3,
    /// Radius in model space.
    pub radius: f64,
    emissive: Option<FaceId>,
}

impl Sphere {
    /// Face seen by rays arriving from outside.
    pub const OUTSIDE: FaceId = FaceId(0);
    /// Face seen by rays arriving from inside.
    pub const INSIDE: FaceId = FaceId(1);

    /// Create a non-emissive sphere.
    pub fn new(center: Point3, radius: f64) -> Self {
        debug_assert!(radius > 0.0, "sphere radius must be positive");
        Self {
            center,
            radius,
            emissive: None,
        }
    }

    /// Mark one face as emitting light.
    pub fn with_emissive_face(mut self, face: FaceId) -> Self {
        debug_assert!(face == Self::OUTSIDE || face == Self::INSIDE);
        self.emissive = Some(face);
        self
    }

    fn local_bounds(&self) -> BoundingBox {
        let r = Vec3::new(self.radius, self.radius, self.radius);
        BoundingBox::new(self.center - r, self.center + r)
    }
}

impl Geometry for Sphere {
    fn compute_bounds(&self, model_to_world: Option<&Transform>) -> BoundingBox {
        let local = self.local_bounds();
        match model_to_world {
            Some(transform) => local.transformed(transform),
            None => local,
        }
    }

    fn trace(
        &self,
        ray: &Ray,
        min_distance: f64,
        max_distance: f64,
        mode: TraceMode,
        allocator: &mut HitAllocator<'_>,
    ) -> Option<HitId> {
        let oc = ray.origin - self.center;
        let d = ray.direction();

        // Quadratic: |oc + t*d|^2 = r^2, with b halved.
        let a = d.dot(d);
        let half_b = oc.dot(d);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t_enter = (-half_b - sqrt_disc) / a;
        let t_exit = (-half_b + sqrt_disc) / a;

        let in_window = |t: f64| mode == TraceMode::AllHits || (t > min_distance && t < max_distance);
        let enter = in_window(t_enter);
        // A tangent ray touches once; report it only as the entry.
        let exit = t_exit > t_enter && in_window(t_exit);

        let mut head = None;
        if exit && !(enter && mode == TraceMode::AnyHit) {
            let point = ray.at(t_exit);
            head = Some(allocator.allocate_with(
                None,
                t_exit,
                gamma(7) * t_exit.abs(),
                Self::INSIDE,
                Self::OUTSIDE,
                &[point.x, point.y, point.z],
            ));
        }
        if enter {
            let point = ray.at(t_enter);
            head = Some(allocator.allocate_with(
                head,
                t_enter,
                gamma(7) * t_enter.abs(),
                Self::OUTSIDE,
                Self::INSIDE,
                &[point.x, point.y, point.z],
            ));
        }
        head
    }

    fn faces(&self) -> Vec<FaceId> {
        vec![Self::OUTSIDE, Self::INSIDE]
    }

    fn is_emissive(&self, face: FaceId) -> bool {
        self.emissive == Some(face)
    }
}
