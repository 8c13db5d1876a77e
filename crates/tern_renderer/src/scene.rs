//! Scene assembly: geometry, emitters, camera, sampler and integrator.
//!
//! Scenes come either from a JSON description ([`Scene::from_json`]) or are
//! put together in code with a [`SceneBuilder`]. Both end in the same place:
//! every top-level surface goes into one acceleration structure, and every
//! light-sampleable leaf is collected into the emitter list.

use crate::bbh::{Bbh, DEFAULT_MAX_LEAF_SIZE};
use crate::camera::Camera;
use crate::group::SurfaceGroup;
use crate::instance::Instance;
use crate::integrator::{Integrator, IntegratorConfig};
use crate::material::{Color, MaterialLibrary};
use crate::mesh::Mesh;
use crate::quad::Quad;
use crate::sampler::{IndependentSampler, Sampler, SamplerConfig};
use crate::sphere::Sphere;
use crate::surface::{collect_emitters, HitRecord, Surface, SurfaceError, SurfaceResult};
use crate::triangle::Triangle;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tern_core::config::{self, ConfigError, ConfigResult};
use tern_core::FileResolver;
use tern_math::{Ray, Transform};

impl From<SurfaceError> for ConfigError {
    fn from(err: SurfaceError) -> Self {
        ConfigError::invalid("surfaces", err.to_string())
    }
}

/// Which structure indexes the scene's surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AcceleratorConfig {
    Bbh {
        #[serde(rename = "max leaf size", default = "default_leaf_size")]
        max_leaf_size: usize,
    },
    /// Linear scan, for debugging the hierarchy.
    Group,
}

fn default_leaf_size() -> usize {
    DEFAULT_MAX_LEAF_SIZE
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        AcceleratorConfig::Bbh {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
        }
    }
}

impl AcceleratorConfig {
    /// An empty, unbuilt aggregate.
    pub fn create(&self) -> Box<dyn Surface> {
        match *self {
            AcceleratorConfig::Bbh { max_leaf_size } => Box::new(Bbh::with_max_leaf_size(max_leaf_size)),
            AcceleratorConfig::Group => Box::new(SurfaceGroup::new()),
        }
    }
}

/// A renderable scene.
pub struct Scene {
    camera: Camera,
    sampler: Box<dyn Sampler>,
    integrator: Box<dyn Integrator>,
    background: Color,
    root: Box<dyn Surface>,
    emitters: SurfaceGroup,
}

impl Scene {
    /// Load a scene file. Assets are looked up next to the file first.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let j: Value = serde_json::from_str(&text)?;

        let mut resolver = FileResolver::new();
        if let Some(dir) = path.parent() {
            resolver.prepend(dir);
        }
        Self::from_json(&j, &resolver)
    }

    /// Build a scene from its JSON description.
    pub fn from_json(j: &Value, resolver: &FileResolver) -> ConfigResult<Self> {
        let camera = Camera::from_json(config::require(j, "camera")?)?;
        let sampler: SamplerConfig = read_typed(j, "sampler", "independent")?;
        let integrator: IntegratorConfig = read_typed(j, "integrator", "path_tracer_mats")?;
        let accelerator: AcceleratorConfig = read_typed(j, "accelerator", "bbh")?;

        let library = match j.get("materials") {
            Some(list) => MaterialLibrary::from_json(list)?,
            None => MaterialLibrary::new(),
        };

        let mut builder = SceneBuilder::new();
        builder
            .set_camera(camera)
            .set_sampler(sampler.build())
            .set_integrator(integrator.build())
            .set_background(config::get_color(j, "background", Color::ZERO)?)
            .set_accelerator(accelerator);

        let loader = SurfaceLoader {
            library: &library,
            resolver,
            accelerator,
        };
        if let Some(surfaces) = j.get("surfaces") {
            loader.load_list(surfaces, &mut builder.surfaces)?;
        }

        Ok(builder.build()?)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The prototype sampler. Render workers clone it.
    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    pub fn set_sampler(&mut self, sampler: Box<dyn Sampler>) {
        self.sampler = sampler;
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// The top-level acceleration structure.
    pub fn root(&self) -> &dyn Surface {
        self.root.as_ref()
    }

    /// Every surface that can be sampled as a light.
    pub fn emitters(&self) -> &SurfaceGroup {
        &self.emitters
    }

    /// Closest hit along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        self.root.intersect(ray)
    }
}

/// Assembles a [`Scene`] piece by piece.
pub struct SceneBuilder {
    camera: Camera,
    sampler: Box<dyn Sampler>,
    integrator: Box<dyn Integrator>,
    background: Color,
    accelerator: AcceleratorConfig,
    surfaces: SurfaceGroup,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            sampler: Box::new(IndependentSampler::new(1)),
            integrator: IntegratorConfig::default().build(),
            background: Color::ZERO,
            accelerator: AcceleratorConfig::default(),
            surfaces: SurfaceGroup::new(),
        }
    }

    pub fn set_camera(&mut self, camera: Camera) -> &mut Self {
        self.camera = camera;
        self
    }

    pub fn set_sampler(&mut self, sampler: Box<dyn Sampler>) -> &mut Self {
        self.sampler = sampler;
        self
    }

    pub fn set_integrator(&mut self, integrator: Box<dyn Integrator>) -> &mut Self {
        self.integrator = integrator;
        self
    }

    pub fn set_background(&mut self, background: Color) -> &mut Self {
        self.background = background;
        self
    }

    pub fn set_accelerator(&mut self, accelerator: AcceleratorConfig) -> &mut Self {
        self.accelerator = accelerator;
        self
    }

    pub fn add_surface(&mut self, surface: Arc<dyn Surface>) -> &mut Self {
        self.surfaces.push(surface);
        self
    }

    /// Add every face of `mesh` as its own triangle.
    pub fn add_mesh(&mut self, mesh: Arc<Mesh>) -> SurfaceResult<usize> {
        mesh.add_to_parent(&mut self.surfaces)
    }

    /// Build the acceleration structure and collect the emitters.
    pub fn build(self) -> SurfaceResult<Scene> {
        let mut root = self.accelerator.create();
        let mut emitters = SurfaceGroup::new();

        let mut lights = Vec::new();
        for surface in self.surfaces.children() {
            collect_emitters(surface, &mut lights);
            root.add_child(surface.clone())?;
        }
        for light in lights {
            emitters.push(light);
        }
        root.build();

        log::info!(
            "Built scene: {} surfaces, {} emitters",
            self.surfaces.len(),
            emitters.len()
        );
        if emitters.is_empty() {
            log::debug!("Scene has no light-sampleable emitters");
        }

        Ok(Scene {
            camera: self.camera,
            sampler: self.sampler,
            integrator: self.integrator,
            background: self.background,
            root,
            emitters,
        })
    }
}

/// Deserialize the object under `key`, supplying `default_type` when the
/// key or its `type` field is absent.
fn read_typed<T: DeserializeOwned>(j: &Value, key: &str, default_type: &str) -> ConfigResult<T> {
    let mut section = match j.get(key) {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(ConfigError::invalid(key, "expected an object")),
    };
    section
        .entry("type")
        .or_insert_with(|| Value::from(default_type));
    Ok(serde_json::from_value(Value::Object(section))?)
}

// =============================================================================
// Surface factory
// =============================================================================

struct SurfaceLoader<'a> {
    library: &'a MaterialLibrary,
    resolver: &'a FileResolver,
    accelerator: AcceleratorConfig,
}

impl SurfaceLoader<'_> {
    fn load_list(&self, list: &Value, parent: &mut dyn Surface) -> ConfigResult<()> {
        let entries = list
            .as_array()
            .ok_or_else(|| ConfigError::invalid("surfaces", "expected an array"))?;
        for entry in entries {
            self.load(entry, parent)?;
        }
        Ok(())
    }

    fn load(&self, j: &Value, parent: &mut dyn Surface) -> ConfigResult<()> {
        let kind = config::require_str(j, "type")?;
        match kind {
            "sphere" => {
                let material = self.library.resolve(j)?;
                parent.add_child(Arc::new(Sphere::from_json(j, material)?))?;
            }
            "quad" => {
                let material = self.library.resolve(j)?;
                parent.add_child(Arc::new(Quad::from_json(j, material)?))?;
            }
            "triangle" => {
                let material = self.library.resolve(j)?;
                parent.add_child(Arc::new(Triangle::from_json(j, material)?))?;
            }
            "mesh" => {
                let material = self.library.resolve(j)?;
                let mesh = Arc::new(Mesh::from_json(j, material, self.library, self.resolver)?);
                mesh.add_to_parent(parent)?;
            }
            "group" => {
                let mut group = self.accelerator.create();
                if let Some(children) = j.get("surfaces") {
                    self.load_list(children, group.as_mut())?;
                }
                group.build();

                let xform = config::get_transform(j, "transform")?;
                let group: Arc<dyn Surface> = Arc::from(group);
                if xform == Transform::IDENTITY {
                    parent.add_child(group)?;
                } else {
                    parent.add_child(Arc::new(Instance::new(group, xform)))?;
                }
            }
            other => {
                return Err(ConfigError::UnknownType {
                    kind: "surface",
                    name: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tern_math::Vec3;

    fn scene_json(surfaces: Value) -> Value {
        json!({
            "camera": {"resolution": [16, 8]},
            "materials": [
                {"name": "grey", "type": "diffuse", "color": 0.5},
                {"name": "lamp", "type": "diffuse light", "color": 1, "intensity": 4}
            ],
            "surfaces": surfaces
        })
    }

    #[test]
    fn test_load_primitives() {
        let j = scene_json(json!([
            {"type": "sphere", "radius": 1, "material": "grey", "transform": {"translate": [0, 0, -5]}},
            {"type": "quad", "size": 2, "material": "lamp", "transform": {"translate": [0, 3, 0]}},
            {"type": "triangle", "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0]], "material": {"type": "metal"}}
        ]));
        let scene = Scene::from_json(&j, &FileResolver::new()).unwrap();

        assert_eq!(scene.camera().resolution(), tern_math::UVec2::new(16, 8));
        assert_eq!(scene.root().children().len(), 3);
        assert_eq!(scene.emitters().len(), 1);
        assert_eq!(scene.sampler().sample_count(), 1);

        let hit = scene.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z)).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_scene_settings() {
        let mut j = scene_json(json!([]));
        j["sampler"] = json!({"samples": 9});
        j["integrator"] = json!({"type": "normals"});
        j["accelerator"] = json!({"type": "group"});
        j["background"] = json!([0.1, 0.2, 0.3]);
        let scene = Scene::from_json(&j, &FileResolver::new()).unwrap();

        assert_eq!(scene.sampler().sample_count(), 9);
        assert_eq!(scene.background(), Color::new(0.1, 0.2, 0.3));
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Z)).is_none());
    }

    #[test]
    fn test_load_errors() {
        let resolver = FileResolver::new();

        assert!(matches!(
            Scene::from_json(&json!({"surfaces": []}), &resolver),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            Scene::from_json(&scene_json(json!([{"type": "torus"}])), &resolver),
            Err(ConfigError::UnknownType { kind: "surface", .. })
        ));
        assert!(matches!(
            Scene::from_json(&scene_json(json!([{"type": "sphere", "material": "gold"}])), &resolver),
            Err(ConfigError::UnknownMaterial(_))
        ));
        assert!(matches!(
            Scene::from_json(&scene_json(json!([{"type": "mesh", "filename": "missing.obj"}])), &resolver),
            Err(ConfigError::Mesh(_))
        ));

        let mut j = scene_json(json!([]));
        j["integrator"] = json!({"type": "bdpt"});
        assert!(matches!(Scene::from_json(&j, &resolver), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_groups_and_instances() {
        let j = scene_json(json!([
            {"type": "group", "surfaces": [
                {"type": "sphere", "radius": 0.5, "material": "lamp"},
                {"type": "sphere", "radius": 0.5, "transform": {"translate": [2, 0, 0]}}
            ]},
            {"type": "group", "transform": {"translate": [0, 0, -10]}, "surfaces": [
                {"type": "sphere", "radius": 1, "material": "lamp"}
            ]}
        ]));
        let scene = Scene::from_json(&j, &FileResolver::new()).unwrap();

        // The untransformed group is opened up; the instance is one light
        assert_eq!(scene.emitters().len(), 2);
        assert!(scene.emitters().children().iter().all(|e| e.as_emitter().is_some()));

        let hit = scene.intersect(&Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z)).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        let hit = scene.intersect(&Ray::new(Vec3::new(2.0, 0.0, 5.0), -Vec3::Z)).unwrap();
        assert!((hit.t - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_builder_collects_nested_emitters() {
        let lamp = Arc::new(crate::DiffuseLight::new(Color::ONE, 1.0));
        let mut inner = SurfaceGroup::new();
        inner
            .add_child(Arc::new(Sphere::new(1.0, Transform::IDENTITY, lamp.clone())))
            .unwrap();
        inner
            .add_child(Arc::new(Quad::new(tern_math::Vec2::ONE, Transform::IDENTITY, lamp)))
            .unwrap();

        let mut builder = SceneBuilder::new();
        builder.add_surface(Arc::new(inner));
        let scene = builder.build().unwrap();
        assert_eq!(scene.emitters().len(), 2);
        assert!(scene.root().children().len() == 1);
    }
}
