//! Brute-force scene.

use crate::scene::{Scene, SceneBuilder, SceneObjects};
use crate::Intersector;

/// Tests every primitive in order.
pub struct ListScene {
    objects: SceneObjects,
}

impl ListScene {
    /// Wrap `objects` without any acceleration.
    pub fn new(objects: SceneObjects) -> Self {
        Self { objects }
    }
}

impl Scene for ListScene {
    fn trace(&self, intersector: &mut Intersector<'_>) {
        for index in 0..self.objects.len() {
            let (geometry, model_to_world) = self.objects.primitive(index);
            if intersector.intersect_primitive(Some(index), geometry, model_to_world) {
                return;
            }
        }
    }

    fn objects(&self) -> &SceneObjects {
        &self.objects
    }
}

/// Builds [`ListScene`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListSceneBuilder;

impl SceneBuilder for ListSceneBuilder {
    fn build(&self, objects: SceneObjects) -> Box<dyn Scene> {
        Box::new(ListScene::new(objects))
    }
}
