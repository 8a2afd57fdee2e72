//! Scene traced through a bounding volume hierarchy.

use log::debug;

use crate::bvh::{build_validated, Bvh, BvhStats};
use crate::scene::{Scene, SceneBuilder, SceneObjects};
use crate::{BvhSettings, Intersector, Result};

/// Primitives sorted into BVH leaf order together with their hierarchy.
pub struct BvhScene {
    objects: SceneObjects,
    bvh: Bvh,
    stats: BvhStats,
}

impl BvhScene {
    /// Build the hierarchy over `objects` and reorder them to match it.
    ///
    /// Fails if `settings` is out of range.
    pub fn new(objects: SceneObjects, settings: &BvhSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::with_valid_settings(objects, settings))
    }

    fn with_valid_settings(mut objects: SceneObjects, settings: &BvhSettings) -> Self {
        if objects.is_empty() {
            debug!("Empty scene, skipping BVH build");
            return Self {
                objects,
                bvh: Bvh::default(),
                stats: BvhStats::default(),
            };
        }

        let build = build_validated(objects.len(), settings, |index| {
            let (geometry, model_to_world) = objects.primitive(index);
            (geometry, model_to_world.map(|t| t.as_ref()))
        });
        objects.reorder(&build.sort_order);

        Self {
            objects,
            bvh: build.bvh,
            stats: build.stats,
        }
    }

    /// The hierarchy.
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Shape of the hierarchy as built.
    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }
}

impl Scene for BvhScene {
    fn trace(&self, intersector: &mut Intersector<'_>) {
        let objects = &self.objects;
        self.bvh.trace(intersector, |intersector, leaf| {
            for index in leaf {
                let (geometry, model_to_world) = objects.primitive(index);
                if intersector.intersect_primitive(Some(index), geometry, model_to_world) {
                    return;
                }
            }
        });
    }

    fn objects(&self) -> &SceneObjects {
        &self.objects
    }
}

/// Builds [`BvhScene`]s with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct BvhSceneBuilder {
    settings: BvhSettings,
}

impl BvhSceneBuilder {
    /// Use `settings` for every scene built, rejecting invalid ones.
    pub fn new(settings: BvhSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// The settings in use.
    pub fn settings(&self) -> &BvhSettings {
        &self.settings
    }
}

impl SceneBuilder for BvhSceneBuilder {
    fn build(&self, objects: SceneObjects) -> Box<dyn Scene> {
        Box::new(BvhScene::with_valid_settings(objects, &self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::AreaLight;
    use crate::shapes::Sphere;
    use crate::{AccelError, HitArena, Ray};
    use lumen_math::{Point3, Transform, Vec3};
    use std::sync::Arc;

    fn closest(scene: &dyn Scene, ray: Ray) -> Option<(f64, Option<usize>)> {
        let mut arena = HitArena::new();
        let mut intersector = Intersector::closest_hit(&mut arena, ray, 0.0, f64::INFINITY);
        scene.trace(&mut intersector);
        intersector
            .closest()
            .map(|hit| (hit.distance(), hit.hit.primitive()))
    }

    /// Center x of the primitive a hit was reported for.
    fn center_x(scene: &dyn Scene, primitive: usize) -> f64 {
        let (geometry, model_to_world) = scene.objects().primitive(primitive);
        geometry.compute_bounds(model_to_world.map(|t| t.as_ref())).center().x
    }

    #[test]
    fn test_two_spheres_from_both_sides() {
        let mut builder = SceneObjects::builder();
        builder
            .add(Arc::new(Sphere::new(Point3::new(-0.5, 0.0, 0.0), 1.0)))
            .add(Arc::new(Sphere::new(Point3::new(0.5, 0.0, 0.0), 1.0)));
        let scene = BvhSceneBuilder::default().build(builder.build());

        let from_left = Ray::new(Point3::new(-2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let (distance, primitive) = closest(scene.as_ref(), from_left).unwrap();
        assert!((distance - 0.5).abs() < 1e-9);
        assert!((center_x(scene.as_ref(), primitive.unwrap()) + 0.5).abs() < 1e-12);

        let from_right = Ray::new(Point3::new(2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let (distance, primitive) = closest(scene.as_ref(), from_right).unwrap();
        assert!((distance - 0.5).abs() < 1e-9);
        assert!((center_x(scene.as_ref(), primitive.unwrap()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_transformed_instances() {
        let unit: Arc<Sphere> = Arc::new(Sphere::new(Point3::origin(), 1.0));
        let mut builder = SceneObjects::builder();
        for i in 0..8 {
            builder.add_transformed(
                unit.clone(),
                Transform::translation(4.0 * i as f64, 0.0, 0.0),
            );
        }
        let scene = BvhScene::new(builder.build(), &BvhSettings::default()).unwrap();
        assert!(scene.stats().leaf_count > 1);

        let ray = Ray::new(Point3::new(12.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let (distance, primitive) = closest(&scene, ray).unwrap();
        assert!((distance - 9.0).abs() < 1e-9);
        assert!((center_x(&scene, primitive.unwrap()) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_lights_follow_reorder() {
        let mut builder = SceneObjects::builder();
        for i in (0..6).rev() {
            let mut sphere = Sphere::new(Point3::new(3.0 * i as f64, 0.0, 0.0), 1.0);
            if i == 4 {
                sphere = sphere.with_emissive_face(Sphere::OUTSIDE);
            }
            builder.add(Arc::new(sphere));
        }
        let scene = BvhScene::new(builder.build(), &BvhSettings::default()).unwrap();

        let lights: Vec<AreaLight> = scene.objects().area_lights().copied().collect();
        assert_eq!(lights.len(), 1);
        let (geometry, _) = scene.objects().primitive(lights[0].primitive);
        assert!(geometry.is_emissive(lights[0].face));
        assert!((center_x(&scene, lights[0].primitive) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_scene() {
        let scene = BvhScene::new(SceneObjects::builder().build(), &BvhSettings::default()).unwrap();
        assert!(scene.bvh().is_empty());
        let ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        assert!(closest(&scene, ray).is_none());
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let mut builder = SceneObjects::builder();
        for i in 0..10 {
            builder.add(Arc::new(Sphere::new(Point3::new(2.0 * i as f64, 0.0, 0.0), 0.5)));
        }
        let settings = BvhSettings {
            bin_count: 300,
            ..BvhSettings::default()
        };
        assert!(matches!(
            BvhScene::new(builder.build(), &settings),
            Err(AccelError::InvalidSettings(_))
        ));

        let too_deep = BvhSettings {
            max_depth: crate::MAX_DEPTH + 1,
            ..BvhSettings::default()
        };
        assert!(BvhScene::new(SceneObjects::builder().build(), &too_deep).is_err());
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let settings = BvhSettings {
            bin_count: 1,
            ..BvhSettings::default()
        };
        assert!(matches!(
            BvhSceneBuilder::new(settings),
            Err(AccelError::InvalidSettings(_))
        ));
    }
}
