//! Triangle mesh data and the parser callback interface that fills it.
//!
//! File parsers drive a [`MeshSink`]; [`MeshBuilder`] is the sink that
//! triangulates faces, moves geometry to world space and assembles the
//! final [`MeshData`]. The renderer shares one `MeshData` between all the
//! triangles it expands into.

use tern_math::{Box3, Transform, UVec3, Vec2, Vec3};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse OBJ file: {0}")]
    Parse(#[from] wavefront_obj::ParseError),

    #[error("{kind} index {index} out of range ({count} available)")]
    InvalidIndex {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    #[error("polygon has {0} vertices, at least 3 are required")]
    PolygonTooSmall(usize),

    #[error("{kind} index array has {found} entries for {faces} faces")]
    FaceCountMismatch {
        kind: &'static str,
        found: usize,
        faces: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// Batch triangle geometry in world space.
///
/// Per-face arrays (`normal_indices`, `uv_indices`, `material_indices`) are
/// either empty or hold exactly one entry per face. Vertex colours, when
/// present, are parallel to `positions` and indexed by `vertex_indices`.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec3>,

    /// Material names referenced by `material_indices`. Entry 0 is the
    /// mesh's own material and is always present.
    pub material_names: Vec<String>,

    pub vertex_indices: Vec<UVec3>,
    pub normal_indices: Vec<UVec3>,
    pub uv_indices: Vec<UVec3>,
    pub material_indices: Vec<u32>,

    /// Object-to-world transform the positions were baked with.
    pub xform: Transform,
    /// Maps object space into the unit cube spanned by `object_bounds`.
    pub object_to_texture: Transform,
    pub world_bounds: Box3,
    pub object_bounds: Box3,
}

impl MeshData {
    /// A one-face mesh. Positions are given in object space.
    pub fn single_triangle(
        positions: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        uvs: Option<[Vec2; 3]>,
        xform: Transform,
    ) -> MeshResult<Self> {
        let mut builder = MeshBuilder::new(xform);
        for p in positions {
            builder.vertex(p, None);
        }
        if let Some(normals) = normals {
            for n in normals {
                builder.normal(n);
            }
        }
        if let Some(uvs) = uvs {
            for uv in uvs {
                builder.uv(uv);
            }
        }

        let corners: Vec<FaceVertex> = (0..3)
            .map(|i| FaceVertex {
                position: i,
                uv: uvs.map(|_| i),
                normal: normals.map(|_| i),
            })
            .collect();
        builder.face(&corners)?;
        builder.finish()
    }

    pub fn face_count(&self) -> usize {
        self.vertex_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normal_indices.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uv_indices.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Material slot of `face`, 0 when the mesh has no per-face materials.
    pub fn material_index(&self, face: usize) -> usize {
        self.material_indices.get(face).map_or(0, |&m| m as usize)
    }

    /// World-space corners of `face`.
    pub fn face_positions(&self, face: usize) -> [Vec3; 3] {
        let idx = self.vertex_indices[face];
        [
            self.positions[idx.x as usize],
            self.positions[idx.y as usize],
            self.positions[idx.z as usize],
        ]
    }

    /// Check every index against its target array and every per-face
    /// array against the face count.
    pub fn validate(&self) -> MeshResult<()> {
        let faces = self.face_count();
        let per_face = [
            ("normal", self.normal_indices.len()),
            ("uv", self.uv_indices.len()),
            ("material", self.material_indices.len()),
        ];
        for (kind, found) in per_face {
            if found != 0 && found != faces {
                return Err(MeshError::FaceCountMismatch { kind, found, faces });
            }
        }
        if !self.colors.is_empty() && self.colors.len() != self.positions.len() {
            return Err(MeshError::FaceCountMismatch {
                kind: "color",
                found: self.colors.len(),
                faces: self.positions.len(),
            });
        }

        check_indices("vertex", &self.vertex_indices, self.positions.len())?;
        check_indices("normal", &self.normal_indices, self.normals.len())?;
        check_indices("uv", &self.uv_indices, self.uvs.len())?;

        let count = self.material_names.len();
        if let Some(&index) = self.material_indices.iter().find(|&&m| m as usize >= count) {
            return Err(MeshError::InvalidIndex {
                kind: "material",
                index: index as usize,
                count,
            });
        }
        Ok(())
    }
}

fn check_indices(kind: &'static str, indices: &[UVec3], count: usize) -> MeshResult<()> {
    for tri in indices {
        if let Some(&index) = tri.to_array().iter().find(|&&i| i as usize >= count) {
            return Err(MeshError::InvalidIndex {
                kind,
                index: index as usize,
                count,
            });
        }
    }
    Ok(())
}

/// One polygon corner. Indices are 0-based into the arrays delivered so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            uv: None,
            normal: None,
        }
    }
}

/// Callbacks a mesh-file parser drives, in any order.
pub trait MeshSink {
    /// A vertex position in object space, with an optional colour.
    fn vertex(&mut self, position: Vec3, color: Option<Vec3>);
    fn normal(&mut self, normal: Vec3);
    fn uv(&mut self, uv: Vec2);
    /// A polygon with at least three corners.
    fn face(&mut self, corners: &[FaceVertex]) -> MeshResult<()>;
    /// Faces after this call use material `name`.
    fn material(&mut self, name: &str);
}

/// [`MeshSink`] that assembles a world-space [`MeshData`].
#[derive(Debug)]
pub struct MeshBuilder {
    mesh: MeshData,
    material_prefix: String,
    current_material: u32,
    all_vertices_colored: bool,
}

impl MeshBuilder {
    pub fn new(xform: Transform) -> Self {
        Self {
            mesh: MeshData {
                material_names: vec![String::new()],
                xform,
                ..Default::default()
            },
            material_prefix: String::new(),
            current_material: 0,
            all_vertices_colored: true,
        }
    }

    /// Prefix prepended to every material name the parser reports.
    pub fn with_material_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.material_prefix = prefix.into();
        self
    }

    fn check(kind: &'static str, index: usize, count: usize) -> MeshResult<u32> {
        if index < count {
            Ok(index as u32)
        } else {
            Err(MeshError::InvalidIndex { kind, index, count })
        }
    }

    /// Drop inconsistent optional data and return the finished mesh.
    pub fn finish(mut self) -> MeshResult<MeshData> {
        let mesh = &mut self.mesh;
        let faces = mesh.vertex_indices.len();

        if !self.all_vertices_colored || mesh.colors.len() != mesh.positions.len() {
            mesh.colors.clear();
        }
        if mesh.normal_indices.len() != faces {
            if !mesh.normal_indices.is_empty() {
                log::error!("Number of normal indices does not match number of faces. Ignoring normals.");
            }
            mesh.normals.clear();
            mesh.normal_indices.clear();
        }
        if mesh.uv_indices.len() != faces {
            if !mesh.uv_indices.is_empty() {
                log::error!("Number of uv indices does not match number of faces. Ignoring uvs.");
            }
            mesh.uvs.clear();
            mesh.uv_indices.clear();
        }
        if mesh.material_names.len() == 1 {
            mesh.material_indices.clear();
        }

        if !mesh.object_bounds.is_empty() {
            let diag = mesh.object_bounds.diagonal();
            let inv = Vec3::select(diag.cmpeq(Vec3::ZERO), Vec3::ONE, diag.recip());
            mesh.object_to_texture =
                Transform::scale(inv) * Transform::translate(-mesh.object_bounds.min);
        }

        log::debug!(
            "Built mesh: {} vertices, {} faces, {} materials",
            mesh.positions.len(),
            faces,
            mesh.material_names.len()
        );

        self.mesh.validate()?;
        Ok(self.mesh)
    }
}

impl MeshSink for MeshBuilder {
    fn vertex(&mut self, position: Vec3, color: Option<Vec3>) {
        let world = self.mesh.xform.point(position);
        self.mesh.object_bounds.enclose_point(position);
        self.mesh.world_bounds.enclose_point(world);
        self.mesh.positions.push(world);
        match color {
            Some(c) => self.mesh.colors.push(c),
            None => self.all_vertices_colored = false,
        }
    }

    fn normal(&mut self, normal: Vec3) {
        let n = self.mesh.xform.normal(normal).normalize_or_zero();
        self.mesh.normals.push(n);
    }

    fn uv(&mut self, uv: Vec2) {
        self.mesh.uvs.push(uv);
    }

    fn face(&mut self, corners: &[FaceVertex]) -> MeshResult<()> {
        if corners.len() < 3 {
            return Err(MeshError::PolygonTooSmall(corners.len()));
        }

        let mesh = &self.mesh;
        let mut vi = Vec::with_capacity(corners.len());
        let mut ni = Vec::with_capacity(corners.len());
        let mut ti = Vec::with_capacity(corners.len());
        for c in corners {
            vi.push(Self::check("vertex", c.position, mesh.positions.len())?);
            if let Some(n) = c.normal {
                ni.push(Self::check("normal", n, mesh.normals.len())?);
            }
            if let Some(t) = c.uv {
                ti.push(Self::check("uv", t, mesh.uvs.len())?);
            }
        }
        // Only faces where every corner has one contribute that attribute
        let has_normals = ni.len() == vi.len();
        let has_uvs = ti.len() == vi.len();

        // Fan triangulation around the first corner
        for i in 1..vi.len() - 1 {
            self.mesh.vertex_indices.push(UVec3::new(vi[0], vi[i], vi[i + 1]));
            if has_normals {
                self.mesh.normal_indices.push(UVec3::new(ni[0], ni[i], ni[i + 1]));
            }
            if has_uvs {
                self.mesh.uv_indices.push(UVec3::new(ti[0], ti[i], ti[i + 1]));
            }
            self.mesh.material_indices.push(self.current_material);
        }
        Ok(())
    }

    fn material(&mut self, name: &str) {
        let full = format!("{}{}", self.material_prefix, name);
        let names = &mut self.mesh.material_names;
        self.current_material = match names.iter().skip(1).position(|n| *n == full) {
            Some(i) => (i + 1) as u32,
            None => {
                names.push(full);
                (names.len() - 1) as u32
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_builder(xform: Transform) -> MeshBuilder {
        let mut builder = MeshBuilder::new(xform);
        builder.vertex(Vec3::new(0.0, 0.0, 0.0), None);
        builder.vertex(Vec3::new(2.0, 0.0, 0.0), None);
        builder.vertex(Vec3::new(2.0, 4.0, 0.0), None);
        builder.vertex(Vec3::new(0.0, 4.0, 0.0), None);
        builder
    }

    #[test]
    fn test_fan_triangulation() {
        let mut builder = quad_builder(Transform::IDENTITY);
        let corners: Vec<FaceVertex> = (0..4).map(FaceVertex::new).collect();
        builder.face(&corners).unwrap();
        let mesh = builder.finish().unwrap();

        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_indices[0], UVec3::new(0, 1, 2));
        assert_eq!(mesh.vertex_indices[1], UVec3::new(0, 2, 3));
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
        assert!(mesh.material_indices.is_empty());
        mesh.validate().unwrap();
    }

    #[test]
    fn test_invalid_faces() {
        let mut builder = quad_builder(Transform::IDENTITY);
        assert!(matches!(
            builder.face(&[FaceVertex::new(0), FaceVertex::new(1)]),
            Err(MeshError::PolygonTooSmall(2))
        ));
        assert!(matches!(
            builder.face(&[FaceVertex::new(0), FaceVertex::new(1), FaceVertex::new(9)]),
            Err(MeshError::InvalidIndex { kind: "vertex", index: 9, count: 4 })
        ));
    }

    #[test]
    fn test_partial_normals_are_dropped() {
        let mut builder = quad_builder(Transform::IDENTITY);
        builder.normal(Vec3::Z);
        let with_normal = |p| FaceVertex { position: p, uv: None, normal: Some(0) };
        builder
            .face(&[with_normal(0), with_normal(1), with_normal(2)])
            .unwrap();
        builder
            .face(&[FaceVertex::new(0), FaceVertex::new(2), FaceVertex::new(3)])
            .unwrap();

        let mesh = builder.finish().unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.normals.is_empty());
        assert!(mesh.normal_indices.is_empty());
    }

    #[test]
    fn test_colors_require_every_vertex() {
        let mut builder = MeshBuilder::new(Transform::IDENTITY);
        builder.vertex(Vec3::ZERO, Some(Vec3::X));
        builder.vertex(Vec3::X, Some(Vec3::Y));
        builder.vertex(Vec3::Y, None);
        builder
            .face(&[FaceVertex::new(0), FaceVertex::new(1), FaceVertex::new(2)])
            .unwrap();
        assert!(!builder.finish().unwrap().has_colors());
    }

    #[test]
    fn test_materials_and_prefix() {
        let mut builder = quad_builder(Transform::IDENTITY).with_material_prefix("bunny:");
        let tri = [FaceVertex::new(0), FaceVertex::new(1), FaceVertex::new(2)];
        builder.face(&tri).unwrap();
        builder.material("red");
        builder.face(&tri).unwrap();
        builder.material("blue");
        builder.face(&tri).unwrap();
        builder.material("red");
        builder.face(&tri).unwrap();

        let mesh = builder.finish().unwrap();
        assert_eq!(mesh.material_names, vec!["", "bunny:red", "bunny:blue"]);
        assert_eq!(mesh.material_indices, vec![0, 1, 2, 1]);
        assert_eq!(mesh.material_index(3), 1);
    }

    #[test]
    fn test_world_space_and_texture_transform() {
        let xform = Transform::translate(Vec3::new(0.0, 0.0, 5.0));
        let mut builder = quad_builder(xform);
        builder.normal(Vec3::new(0.0, 0.0, 3.0));
        let corners: Vec<FaceVertex> = (0..4)
            .map(|p| FaceVertex { position: p, uv: None, normal: Some(0) })
            .collect();
        builder.face(&corners).unwrap();
        let mesh = builder.finish().unwrap();

        assert_eq!(mesh.positions[2], Vec3::new(2.0, 4.0, 5.0));
        assert_eq!(mesh.normals[0], Vec3::Z);
        assert_eq!(mesh.world_bounds.min, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(mesh.object_bounds.max, Vec3::new(2.0, 4.0, 0.0));

        // Flat z extent keeps a unit scale on that axis
        let t = mesh.object_to_texture.point(Vec3::new(2.0, 4.0, 0.0));
        assert!((t - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_single_triangle() {
        let mesh = MeshData::single_triangle(
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            None,
            Some([Vec2::ZERO, Vec2::X, Vec2::Y]),
            Transform::IDENTITY,
        )
        .unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.has_uvs());
        assert!(!mesh.has_normals());
        assert_eq!(mesh.face_positions(0), [Vec3::ZERO, Vec3::X, Vec3::Y]);
    }

    #[test]
    fn test_validate_catches_bad_indices() {
        let mut mesh = MeshData::single_triangle(
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            None,
            None,
            Transform::IDENTITY,
        )
        .unwrap();
        mesh.vertex_indices[0].z = 7;
        assert!(matches!(mesh.validate(), Err(MeshError::InvalidIndex { .. })));

        mesh.vertex_indices[0].z = 2;
        mesh.uv_indices.push(UVec3::ZERO);
        mesh.uv_indices.push(UVec3::ZERO);
        assert!(matches!(mesh.validate(), Err(MeshError::FaceCountMismatch { .. })));
    }
}
