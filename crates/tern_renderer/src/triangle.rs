//! Triangle primitive for ray tracing.
//!
//! A triangle is a view of one face of a shared [`Mesh`]; it never copies
//! vertex data. Uses the Möller-Trumbore algorithm for ray-triangle
//! intersection.

use crate::material::{Color, Material};
use crate::mesh::Mesh;
use crate::surface::{Emitter, EmitterRecord, HitRecord, Surface};
use serde_json::Value;
use std::sync::Arc;
use tern_core::config::{self, ConfigResult};
use tern_core::MeshData;
use tern_math::sampling::{
    area_to_solid_angle_pdf, sample_triangle_barycentric, sample_triangle_pdf,
};
use tern_math::{Box3, Ray, Vec2, Vec3};

/// Axes thinner than this get padded so the bounds never collapse to a plane.
const MIN_EXTENT: f32 = 1e-4;
const PADDING: f32 = 5e-5;

/// Grow any axis of `bbox` thinner than [`MIN_EXTENT`].
pub(crate) fn pad_thin_axes(mut bbox: Box3) -> Box3 {
    if bbox.is_empty() {
        return bbox;
    }
    let thin = bbox.diagonal().cmplt(Vec3::splat(MIN_EXTENT));
    bbox.min = Vec3::select(thin, bbox.min - PADDING, bbox.min);
    bbox.max = Vec3::select(thin, bbox.max + PADDING, bbox.max);
    bbox
}

/// One face of a shared mesh.
#[derive(Clone)]
pub struct Triangle {
    mesh: Arc<Mesh>,
    face: usize,
}

impl Triangle {
    /// # Panics
    ///
    /// Panics if `face` is not a face of `mesh`.
    pub fn new(mesh: Arc<Mesh>, face: usize) -> Self {
        assert!(face < mesh.data().face_count(), "face {face} out of range");
        Self { mesh, face }
    }

    /// A standalone triangle backed by its own one-face mesh.
    ///
    /// Keys: `positions` (required, 3 points), `normals`, `uvs`, `transform`.
    pub fn from_json(j: &Value, material: Arc<dyn Material>) -> ConfigResult<Self> {
        let positions = points::<3>(config::require(j, "positions")?, "positions")?;
        let normals = optional_points(j, "normals");
        let uvs = j.get("uvs").and_then(|v| match parse_uvs(v) {
            Ok(uvs) => Some(uvs),
            Err(err) => {
                log::warn!("Ignoring triangle uvs: {}", err);
                None
            }
        });

        let xform = config::get_transform(j, "transform")?;
        let data = MeshData::single_triangle(positions, normals, uvs, xform)?;
        let mesh = Arc::new(Mesh::with_material(data, material));
        Ok(Self::new(mesh, 0))
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn face(&self) -> usize {
        self.face
    }

    pub fn positions(&self) -> [Vec3; 3] {
        self.mesh.data().face_positions(self.face)
    }

    /// Per-vertex colours, white when the mesh has none.
    pub fn vertex_colors(&self) -> [Color; 3] {
        let data = self.mesh.data();
        if !data.has_colors() {
            return [Color::ONE; 3];
        }
        let idx = data.vertex_indices[self.face];
        [
            data.colors[idx.x as usize],
            data.colors[idx.y as usize],
            data.colors[idx.z as usize],
        ]
    }

    /// Per-vertex texture coordinates, `(0,0) (1,0) (0,1)` when the mesh has none.
    pub fn texture_coords(&self) -> [Vec2; 3] {
        let data = self.mesh.data();
        if !data.has_uvs() {
            return [Vec2::ZERO, Vec2::X, Vec2::Y];
        }
        let idx = data.uv_indices[self.face];
        [
            data.uvs[idx.x as usize],
            data.uvs[idx.y as usize],
            data.uvs[idx.z as usize],
        ]
    }

    fn area(&self) -> f32 {
        let [v0, v1, v2] = self.positions();
        0.5 * (v1 - v0).cross(v2 - v0).length()
    }
}

fn points<const N: usize>(v: &Value, field: &str) -> ConfigResult<[Vec3; N]> {
    let items = v
        .as_array()
        .filter(|items| items.len() == N)
        .ok_or_else(|| tern_core::ConfigError::invalid(field, format!("expected {N} points")))?;
    let mut out = [Vec3::ZERO; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = config::parse_vec3(item, field)?;
    }
    Ok(out)
}

/// Optional per-vertex vectors; malformed values are dropped with a warning.
fn optional_points(j: &Value, key: &str) -> Option<[Vec3; 3]> {
    let v = j.get(key)?;
    match points::<3>(v, key) {
        Ok(p) => Some(p),
        Err(err) => {
            log::warn!("Ignoring triangle {}: {}", key, err);
            None
        }
    }
}

fn parse_uvs(v: &Value) -> ConfigResult<[Vec2; 3]> {
    let items = v
        .as_array()
        .filter(|items| items.len() == 3)
        .ok_or_else(|| tern_core::ConfigError::invalid("uvs", "expected 3 points"))?;
    let mut out = [Vec2::ZERO; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = config::parse_vec2(item, "uvs")?;
    }
    Ok(out)
}

/// Möller-Trumbore intersection of `ray` with one face of `mesh`.
pub(crate) fn intersect_face<'a>(mesh: &'a Mesh, face: usize, ray: &Ray) -> Option<HitRecord<'a>> {
    let data = mesh.data();
    let [v0, v1, v2] = data.face_positions(face);
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);

    // Check if intersection is outside triangle (u parameter)
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    // Check if intersection is outside triangle (v parameter)
    if !(v >= 0.0 && u + v <= 1.0) {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray.in_range(t) {
        return None;
    }

    Some(face_hit(mesh, face, t, ray.at(t), Vec2::new(u, v)))
}

/// Hit record at barycentric `(b1, b2)` on `face`.
fn face_hit(mesh: &Mesh, face: usize, t: f32, p: Vec3, bary: Vec2) -> HitRecord<'_> {
    let data = mesh.data();
    let [v0, v1, v2] = data.face_positions(face);
    let gn = (v1 - v0).cross(v2 - v0).normalize();
    let b0 = 1.0 - bary.x - bary.y;

    let sn = if data.has_normals() {
        let idx = data.normal_indices[face];
        let n = data.normals[idx.x as usize] * b0
            + data.normals[idx.y as usize] * bary.x
            + data.normals[idx.z as usize] * bary.y;
        n.try_normalize().unwrap_or(gn)
    } else {
        gn
    };

    let uv = if data.has_uvs() {
        let idx = data.uv_indices[face];
        data.uvs[idx.x as usize] * b0 + data.uvs[idx.y as usize] * bary.x + data.uvs[idx.z as usize] * bary.y
    } else {
        // Canonical (0,0) (1,0) (0,1) layout
        bary
    };

    HitRecord {
        t,
        p,
        gn,
        sn,
        uv,
        material: Some(mesh.material(face)),
    }
}

impl Surface for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        intersect_face(&self.mesh, self.face, ray)
    }

    fn bounds(&self) -> Box3 {
        pad_thin_axes(Box3::from_points(self.positions()))
    }

    fn is_emissive(&self) -> bool {
        self.mesh.material(self.face).is_emissive()
    }

    fn as_emitter(&self) -> Option<&dyn Emitter> {
        self.is_emissive().then_some(self as &dyn Emitter)
    }
}

impl Emitter for Triangle {
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        let [v0, v1, v2] = self.positions();
        let bary = sample_triangle_barycentric(rv);
        let p = v0 * (1.0 - bary.x - bary.y) + v1 * bary.x + v2 * bary.y;

        let offset = p - rec.o;
        let dist = offset.length();
        if dist == 0.0 {
            return Color::ZERO;
        }

        let hit = face_hit(&self.mesh, self.face, dist, p, bary);
        rec.wi = offset / dist;
        rec.pdf = area_to_solid_angle_pdf(sample_triangle_pdf(v0, v1, v2), rec.o, p, hit.gn);
        rec.hit = Some(hit);
        rec.emitter = Some(self);
        if !(rec.pdf > 0.0) || !rec.pdf.is_finite() {
            return Color::ZERO;
        }

        let emitted = hit
            .material
            .map_or(Color::ZERO, |m| m.emitted(&Ray::new(rec.o, rec.wi), &hit));
        emitted / rec.pdf
    }

    fn pdf(&self, o: Vec3, v: Vec3) -> f32 {
        let Some(hit) = self.intersect(&Ray::new(o, v)) else {
            return 0.0;
        };
        let area = self.area();
        if area == 0.0 {
            return 0.0;
        }
        area_to_solid_angle_pdf(1.0 / area, o, hit.p, hit.gn)
    }
}
