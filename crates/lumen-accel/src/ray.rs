//! Ray representation and space changes.

use lumen_math::{Point3, Transform, Vec3};

/// A ray in 3D space defined by origin and direction.
///
/// The direction is not normalized: a ray carried into a primitive's model
/// space keeps the same distance parameterization as its world-space
/// original, so hit distances compare directly across spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    direction: Vec3,
    /// Precomputed reciprocal of direction components for fast box tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

/// Absolute rounding error picked up when a ray was transformed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RayError {
    /// Per-component bound on the origin error.
    pub origin: Vec3,
    /// Per-component bound on the direction error.
    pub direction: Vec3,
}

impl RayError {
    /// Bound on the error of the distance parameter of a point found at
    /// `distance` along a ray with the given direction.
    pub fn distance_error(&self, direction: &Vec3, distance: f64) -> f64 {
        let length = direction.norm();
        if length == 0.0 {
            return 0.0;
        }
        (self.origin.norm() + distance.abs() * self.direction.norm()) / length
    }
}

impl Ray {
    /// Create a new ray from origin and direction.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        debug_assert!(
            direction.x != 0.0 || direction.y != 0.0 || direction.z != 0.0,
            "ray direction must be non-zero"
        );
        let inv = Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);
        // Checked on the reciprocal so that -0.0 counts as negative.
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction,
            inv_direction: inv,
            sign,
        }
    }

    /// Direction of travel.
    #[inline]
    pub fn direction(&self) -> &Vec3 {
        &self.direction
    }

    /// Component-wise reciprocal of the direction.
    #[inline]
    pub fn inv_direction(&self) -> &Vec3 {
        &self.inv_direction
    }

    /// Per-axis sign of the direction (1 when negative).
    #[inline]
    pub fn sign(&self) -> [usize; 3] {
        self.sign
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    /// Carry a world-space ray into the model space of `model_to_world`.
    ///
    /// Returns the model-space ray and the rounding error introduced.
    pub fn to_model(&self, model_to_world: &Transform) -> (Ray, RayError) {
        let world_to_model = model_to_world.inverse();
        let (origin, origin_error) = world_to_model.apply_point_with_error(&self.origin);
        let (direction, direction_error) = world_to_model.apply_vec_with_error(&self.direction);
        (
            Ray::new(origin, direction),
            RayError {
                origin: origin_error,
                direction: direction_error,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(5.0);
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_sign_of_negative_zero() {
        let ray = Ray::new(Point3::origin(), Vec3::new(-0.0, 1.0, -1.0));
        assert_eq!(ray.sign(), [1, 0, 1]);
    }

    #[test]
    fn test_to_model_preserves_distance() {
        let model_to_world = Transform::translation(10.0, 0.0, 0.0).then(&Transform::scale(2.0, 2.0, 2.0));
        let world = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let (model, error) = world.to_model(&model_to_world);

        // The point at t = 4 is the same physical point in both spaces.
        let world_point = world.at(4.0);
        let model_point = model_to_world.apply_point(&model.at(4.0));
        assert_relative_eq!((world_point - model_point).norm(), 0.0, epsilon = 1e-12);

        assert!(error.origin.x > 0.0);
        assert!(error.distance_error(model.direction(), 4.0) > 0.0);
    }

    #[test]
    fn test_identity_is_exact() {
        let world = Ray::new(Point3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 1.0));
        let (model, error) = world.to_model(&Transform::identity());
        assert_eq!(model, world);
        assert!(error.distance_error(model.direction(), 10.0) < 1e-14);
    }
}
