//! Triangle meshes as scene surfaces.
//!
//! A mesh is normally not intersected as a whole: [`Mesh::add_to_parent`]
//! expands it into one [`Triangle`] per face, all sharing the same data, so
//! the enclosing acceleration structure can index the faces individually.

use crate::material::{Material, MaterialLibrary};
use crate::surface::{HitRecord, Surface, SurfaceResult};
use crate::triangle::{intersect_face, Triangle};
use serde_json::Value;
use std::sync::Arc;
use tern_core::config::{self, ConfigResult};
use tern_core::{obj, FileResolver, MeshData};
use tern_math::{Box3, Ray};

/// Mesh data plus the materials its faces reference.
pub struct Mesh {
    data: MeshData,
    /// Parallel to `data.material_names`
    materials: Vec<Arc<dyn Material>>,
}

impl Mesh {
    /// Resolve the mesh's material names against `library`.
    ///
    /// Slot 0 gets `material`; names the library does not know fall back to it.
    pub fn new(data: MeshData, material: Arc<dyn Material>, library: &MaterialLibrary) -> Self {
        let mut materials: Vec<Arc<dyn Material>> = data
            .material_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == 0 {
                    return material.clone();
                }
                library.get(name).unwrap_or_else(|| {
                    log::warn!("Unknown material \"{}\" in mesh, using the mesh material", name);
                    material.clone()
                })
            })
            .collect();
        if materials.is_empty() {
            materials.push(material);
        }
        Self { data, materials }
    }

    /// A mesh whose faces all use `material`.
    pub fn with_material(data: MeshData, material: Arc<dyn Material>) -> Self {
        let materials = vec![material; data.material_names.len().max(1)];
        Self { data, materials }
    }

    /// Keys: `filename` (required), `transform`, `material prefix`.
    pub fn from_json(
        j: &Value,
        material: Arc<dyn Material>,
        library: &MaterialLibrary,
        resolver: &FileResolver,
    ) -> ConfigResult<Self> {
        let filename = resolver.resolve(config::require_str(j, "filename")?);
        let xform = config::get_transform(j, "transform")?;
        let prefix = config::get_string(j, "material prefix", "")?;

        let data = obj::load_obj_mesh(&filename, xform, &prefix)?;
        log::info!(
            "Loaded mesh {}: {} vertices, {} faces",
            filename.display(),
            data.positions.len(),
            data.face_count()
        );
        Ok(Self::new(data, material, library))
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Material of `face`.
    pub fn material(&self, face: usize) -> &dyn Material {
        let slot = self.data.material_index(face).min(self.materials.len() - 1);
        self.materials[slot].as_ref()
    }

    /// One triangle view per face.
    pub fn triangles(self: &Arc<Self>) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.data.face_count()).map(move |face| Triangle::new(self.clone(), face))
    }

    /// Add one triangle per face to `parent`. Empty meshes add nothing.
    ///
    /// Returns the number of triangles added.
    pub fn add_to_parent(self: &Arc<Self>, parent: &mut dyn Surface) -> SurfaceResult<usize> {
        if self.data.is_empty() {
            log::warn!("Skipping empty mesh");
            return Ok(0);
        }
        for triangle in self.triangles() {
            parent.add_child(Arc::new(triangle))?;
        }
        Ok(self.data.face_count())
    }
}

/// Intersecting an unexpanded mesh scans every face.
impl Surface for Mesh {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let mut ray = *ray;
        let mut closest = None;
        for face in 0..self.data.face_count() {
            if let Some(hit) = intersect_face(self, face, &ray) {
                ray.maxt = hit.t;
                closest = Some(hit);
            }
        }
        closest
    }

    fn bounds(&self) -> Box3 {
        crate::triangle::pad_thin_axes(self.data.world_bounds)
    }

    fn is_emissive(&self) -> bool {
        self.materials.iter().any(|m| m.is_emissive())
    }
}
