//! Ownership of everything a scene is made of.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use lumen_math::Transform;

use crate::{BoundingBox, BoundingBoxBuilder, FaceId, Geometry};

/// A light supplied by the scene description.
///
/// Light transport lives outside this crate; the scene only keeps lights
/// alongside the geometry they illuminate.
pub trait Light: Debug + Send + Sync {}

/// A light at infinity surrounding the scene.
pub trait EnvironmentalLight: Debug + Send + Sync {}

/// A light derived from an emissive face of a scene primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaLight {
    /// Index of the primitive in its [`SceneObjects`].
    pub primitive: usize,
    /// The emitting face.
    pub face: FaceId,
}

/// Any light held by [`SceneObjects`].
#[derive(Debug, Clone)]
pub enum SceneLight {
    /// Emission from scene geometry.
    Area(AreaLight),
    /// A light added explicitly.
    External(Arc<dyn Light>),
}

/// A primitive placed in the world.
#[derive(Clone)]
struct Entry {
    geometry: Arc<dyn Geometry>,
    model_to_world: Option<Arc<Transform>>,
}

/// Immutable collection of primitives, their transforms and lights.
///
/// Primitive indices are stable except across [`SceneObjects::reorder`],
/// which acceleration structures use to make their leaves contiguous.
pub struct SceneObjects {
    entries: Vec<Entry>,
    lights: Vec<SceneLight>,
    environmental_light: Option<Arc<dyn EnvironmentalLight>>,
    bounds: Option<BoundingBox>,
}

impl SceneObjects {
    /// Start assembling a scene.
    pub fn builder() -> SceneObjectsBuilder {
        SceneObjectsBuilder::default()
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no primitives.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Geometry and model-to-world transform of primitive `index`.
    #[inline]
    pub fn primitive(&self, index: usize) -> (&dyn Geometry, Option<&Arc<Transform>>) {
        let entry = &self.entries[index];
        (entry.geometry.as_ref(), entry.model_to_world.as_ref())
    }

    /// All lights: explicit ones first, then area lights in primitive order.
    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    /// Only the lights derived from emissive faces.
    pub fn area_lights(&self) -> impl Iterator<Item = &AreaLight> {
        self.lights.iter().filter_map(|light| match light {
            SceneLight::Area(area) => Some(area),
            SceneLight::External(_) => None,
        })
    }

    /// The environmental light, if one was set.
    pub fn environmental_light(&self) -> Option<&Arc<dyn EnvironmentalLight>> {
        self.environmental_light.as_ref()
    }

    /// World-space bounds of all primitives, `None` for an empty scene.
    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    /// Move primitive `i` to position `sort_order[i]`.
    ///
    /// Area lights follow the primitives they refer to.
    pub fn reorder(&mut self, sort_order: &[usize]) {
        debug_assert_eq!(sort_order.len(), self.entries.len());
        debug_assert!(is_permutation(sort_order), "sort order is not a permutation");

        // Cycle-following: slot i always holds an entry whose destination
        // is `targets[i]`.
        let mut targets = sort_order.to_vec();
        for i in 0..targets.len() {
            while targets[i] != i {
                let j = targets[i];
                self.entries.swap(i, j);
                targets.swap(i, j);
            }
        }

        for light in &mut self.lights {
            if let SceneLight::Area(area) = light {
                area.primitive = sort_order[area.primitive];
            }
        }
    }
}

fn is_permutation(order: &[usize]) -> bool {
    let mut seen = vec![false; order.len()];
    order.iter().all(|&i| i < seen.len() && !std::mem::replace(&mut seen[i], true))
}

/// Accumulates primitives and lights for a [`SceneObjects`].
///
/// Identical transforms are stored once and shared; identity transforms
/// are dropped entirely.
#[derive(Default)]
pub struct SceneObjectsBuilder {
    entries: Vec<Entry>,
    transforms: HashMap<[u64; 16], Arc<Transform>>,
    lights: Vec<Arc<dyn Light>>,
    environmental_light: Option<Arc<dyn EnvironmentalLight>>,
    bounds: BoundingBoxBuilder,
}

impl SceneObjectsBuilder {
    /// Add a primitive already in world space.
    pub fn add(&mut self, geometry: Arc<dyn Geometry>) -> &mut Self {
        self.push(geometry, None)
    }

    /// Add a primitive placed by `model_to_world`.
    pub fn add_transformed(
        &mut self,
        geometry: Arc<dyn Geometry>,
        model_to_world: Transform,
    ) -> &mut Self {
        if model_to_world.is_identity() {
            return self.push(geometry, None);
        }
        let key = matrix_key(&model_to_world);
        let shared = self
            .transforms
            .entry(key)
            .or_insert_with(|| Arc::new(model_to_world))
            .clone();
        self.push(geometry, Some(shared))
    }

    /// Add an explicit light.
    pub fn add_light(&mut self, light: Arc<dyn Light>) -> &mut Self {
        self.lights.push(light);
        self
    }

    /// Set the environmental light, replacing any previous one.
    pub fn set_environmental_light(&mut self, light: Arc<dyn EnvironmentalLight>) -> &mut Self {
        self.environmental_light = Some(light);
        self
    }

    fn push(&mut self, geometry: Arc<dyn Geometry>, model_to_world: Option<Arc<Transform>>) -> &mut Self {
        let bounds = geometry.compute_bounds(model_to_world.as_deref());
        self.bounds.add_box(&bounds);
        self.entries.push(Entry {
            geometry,
            model_to_world,
        });
        self
    }

    /// Finish the scene, deriving an area light for every emissive face.
    pub fn build(self) -> SceneObjects {
        let mut lights: Vec<SceneLight> =
            self.lights.into_iter().map(SceneLight::External).collect();
        let explicit = lights.len();

        for (primitive, entry) in self.entries.iter().enumerate() {
            for face in entry.geometry.faces() {
                if entry.geometry.is_emissive(face) {
                    lights.push(SceneLight::Area(AreaLight { primitive, face }));
                }
            }
        }

        log::debug!(
            "Scene assembled: {} primitives, {} shared transforms, {} lights ({} from emissive faces)",
            self.entries.len(),
            self.transforms.len(),
            lights.len(),
            lights.len() - explicit
        );

        let bounds = (!self.bounds.is_unset()).then(|| self.bounds.build());
        SceneObjects {
            entries: self.entries,
            lights,
            environmental_light: self.environmental_light,
            bounds,
        }
    }
}

fn matrix_key(transform: &Transform) -> [u64; 16] {
    let mut key = [0u64; 16];
    for (slot, value) in key.iter_mut().zip(transform.matrix.iter()) {
        *slot = value.to_bits();
    }
    key
}
