//! Scenes: a [`SceneObjects`] plus a strategy for tracing rays through it.
//!
//! [`ListScene`] tests every primitive and is the reference behaviour;
//! [`BvhScene`] gives the same answers through a bounding volume hierarchy.

mod bvh;
mod list;
mod objects;

pub use bvh::{BvhScene, BvhSceneBuilder};
pub use list::{ListScene, ListSceneBuilder};
pub use objects::{
    AreaLight, EnvironmentalLight, Light, SceneLight, SceneObjects, SceneObjectsBuilder,
};

use crate::Intersector;

/// A traceable scene.
pub trait Scene: Send + Sync {
    /// Feed every primitive the ray might hit to `intersector`, stopping
    /// once it reports done.
    fn trace(&self, intersector: &mut Intersector<'_>);

    /// The objects this scene was built from, in its internal order.
    fn objects(&self) -> &SceneObjects;
}

/// Turns assembled objects into a [`Scene`].
pub trait SceneBuilder {
    /// Take ownership of `objects` and prepare them for tracing.
    fn build(&self, objects: SceneObjects) -> Box<dyn Scene>;
}
