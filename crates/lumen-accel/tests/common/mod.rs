//! Shared scene and ray generators for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use lumen_accel::scene::SceneObjects;
use lumen_accel::shapes::Sphere;
use lumen_accel::{Geometry, Ray};
use lumen_math::{Point3, Transform, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Route `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic generator for one test.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `count` spheres inside a 20-unit cube, every third one placed by a
/// transform and every fifth one emissive on the outside.
pub fn random_spheres(rng: &mut StdRng, count: usize) -> SceneObjects {
    let mut builder = SceneObjects::builder();
    let unit: Arc<dyn Geometry> = Arc::new(Sphere::new(Point3::origin(), 1.0));

    for i in 0..count {
        let center = random_point(rng, 10.0);
        let radius = rng.gen_range(0.1..1.0);
        if i % 3 == 0 {
            let model_to_world = Transform::translation(center.x, center.y, center.z)
                .then(&Transform::rotation_z(rng.gen_range(0.0..std::f64::consts::TAU)))
                .then(&Transform::scale(radius, radius, radius));
            builder.add_transformed(unit.clone(), model_to_world);
        } else {
            let mut sphere = Sphere::new(center, radius);
            if i % 5 == 0 {
                sphere = sphere.with_emissive_face(Sphere::OUTSIDE);
            }
            builder.add(Arc::new(sphere));
        }
    }
    builder.build()
}

/// Rays starting on a sphere of radius 20 aimed roughly at the origin.
pub fn random_rays(rng: &mut StdRng, count: usize) -> Vec<Ray> {
    (0..count)
        .map(|_| {
            let origin = Point3::from(random_direction(rng) * 20.0);
            let target = random_point(rng, 8.0);
            let length = rng.gen_range(0.5..2.0);
            Ray::new(origin, (target - origin).normalize() * length)
        })
        .collect()
}

/// World-space center of primitive `index`, used to identify it across
/// scenes that order their primitives differently.
pub fn primitive_center(objects: &SceneObjects, index: usize) -> Point3 {
    let (geometry, model_to_world) = objects.primitive(index);
    geometry
        .compute_bounds(model_to_world.map(|t| t.as_ref()))
        .center()
}

fn random_point(rng: &mut StdRng, extent: f64) -> Point3 {
    Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let norm = v.norm();
        if norm > 1e-3 && norm <= 1.0 {
            return v / norm;
        }
    }
}
