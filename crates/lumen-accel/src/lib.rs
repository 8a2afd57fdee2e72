#![warn(missing_docs)]

//! Ray intersection core for an offline renderer.
//!
//! Primitives report their hits into a reusable [`HitArena`]; an
//! [`Intersector`] keeps the best of them while a [`Scene`](scene::Scene)
//! decides which primitives a ray has to be tested against.
//!
//! # Architecture
//!
//! - [`BoundingBox`] - Axis-aligned bounds with a robust slab test
//! - [`HitArena`] / [`HitAllocator`] - Per-thread hit storage, reused across rays
//! - [`Intersector`] - Closest-hit and any-hit accumulation
//! - [`bvh`] - Surface Area Heuristic BVH construction and traversal
//! - [`scene`] - Scene objects plus list and BVH tracing strategies
//! - [`tracer`] - Per-ray entry points and parallel batch tracing
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumen_accel::scene::{BvhSceneBuilder, SceneBuilder, SceneObjects};
//! use lumen_accel::shapes::Sphere;
//! use lumen_accel::tracer::RayTracer;
//! use lumen_accel::{HitArena, Ray};
//! use lumen_math::{Point3, Vec3};
//!
//! let mut objects = SceneObjects::builder();
//! objects.add(Arc::new(Sphere::new(Point3::origin(), 1.0)));
//! let scene = BvhSceneBuilder::default().build(objects.build());
//!
//! let mut arena = HitArena::new();
//! let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
//! let hit = RayTracer::new(scene.as_ref()).trace(ray, &mut arena);
//! ```

mod bbox;
pub mod bvh;
mod error;
mod geometry;
mod hit;
mod intersector;
mod ray;
pub mod scene;
mod settings;
pub mod shapes;
pub mod tracer;

pub use bbox::{Axis, BoundingBox, BoundingBoxBuilder, Interval};
pub use bvh::{Bvh, BvhBuild, BvhNode, BvhStats, NodeKind};
pub use error::{AccelError, Result};
pub use geometry::{Geometry, TraceMode};
pub use hit::{ArenaUsage, FaceId, Hit, HitAllocator, HitArena, HitChain, HitContext, HitId};
pub use intersector::{ClosestHit, HitSummary, Intersector};
pub use ray::{Ray, RayError};
pub use settings::{BvhSettings, MAX_BIN_COUNT, MAX_DEPTH};
