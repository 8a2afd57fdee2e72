//! Reference primitives.
//!
//! Production scenes bring their own shape mathematics through the
//! [`Geometry`](crate::Geometry) trait; these analytic shapes exist so the
//! acceleration structures can be exercised and benchmarked on their own.

mod sphere;

pub use sphere::Sphere;
