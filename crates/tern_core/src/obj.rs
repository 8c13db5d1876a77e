//! Wavefront OBJ front end.
//!
//! Parsing is delegated to `wavefront_obj`; this module replays the parsed
//! objects into a [`MeshSink`], converting per-object indices into indices
//! over the whole file.

use crate::mesh::{FaceVertex, MeshBuilder, MeshData, MeshResult, MeshSink};
use std::fs;
use std::path::Path;
use tern_math::{Transform, Vec2, Vec3};
use wavefront_obj::obj::{self, Primitive, VTNIndex};

/// Read `path` and feed its contents to `sink`.
pub fn load_obj(path: impl AsRef<Path>, sink: &mut dyn MeshSink) -> MeshResult<()> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_obj(&content, sink)
}

/// Feed OBJ source text to `sink`.
///
/// Point and line primitives are skipped.
pub fn parse_obj(content: &str, sink: &mut dyn MeshSink) -> MeshResult<()> {
    let set = obj::parse(content)?;

    let mut vertex_offset = 0;
    let mut uv_offset = 0;
    let mut normal_offset = 0;
    let mut skipped = 0usize;

    for object in &set.objects {
        for v in &object.vertices {
            sink.vertex(Vec3::new(v.x as f32, v.y as f32, v.z as f32), None);
        }
        for t in &object.tex_vertices {
            sink.uv(Vec2::new(t.u as f32, t.v as f32));
        }
        for n in &object.normals {
            sink.normal(Vec3::new(n.x as f32, n.y as f32, n.z as f32));
        }

        let corner = |(v, t, n): VTNIndex| FaceVertex {
            position: vertex_offset + v,
            uv: t.map(|t| uv_offset + t),
            normal: n.map(|n| normal_offset + n),
        };

        for geometry in &object.geometry {
            if let Some(name) = &geometry.material_name {
                sink.material(name);
            }
            for shape in &geometry.shapes {
                let Primitive::Triangle(a, b, c) = &shape.primitive else {
                    skipped += 1;
                    continue;
                };
                sink.face(&[corner(*a), corner(*b), corner(*c)])?;
            }
        }

        vertex_offset += object.vertices.len();
        uv_offset += object.tex_vertices.len();
        normal_offset += object.normals.len();
    }

    if skipped > 0 {
        log::debug!("Skipped {} point/line primitives", skipped);
    }
    Ok(())
}

/// Load an OBJ file into world-space mesh data.
pub fn load_obj_mesh(
    path: impl AsRef<Path>,
    xform: Transform,
    material_prefix: &str,
) -> MeshResult<MeshData> {
    let path = path.as_ref();
    let mut builder = MeshBuilder::new(xform).with_material_prefix(material_prefix);
    load_obj(path, &mut builder)?;
    let mesh = builder.finish()?;
    log::debug!(
        "Loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.positions.len(),
        mesh.face_count()
    );
    Ok(mesh)
}
