//! Axis-aligned rectangle in its local xy-plane.

use crate::material::{Color, Material};
use crate::surface::{Emitter, EmitterRecord, HitRecord, Surface};
use crate::triangle::pad_thin_axes;
use serde_json::Value;
use std::sync::Arc;
use tern_core::config::{self, ConfigResult};
use tern_core::ConfigError;
use tern_math::sampling::area_to_solid_angle_pdf;
use tern_math::{Box3, Ray, Transform, Vec2, Vec3};

/// A `size.x` by `size.y` rectangle centred at the local origin, facing +z.
pub struct Quad {
    size: Vec2,
    xform: Transform,
    material: Arc<dyn Material>,
    bbox: Box3,
}

impl Quad {
    pub fn new(size: Vec2, xform: Transform, material: Arc<dyn Material>) -> Self {
        let half = (size * 0.5).extend(0.0);
        let bbox = pad_thin_axes(xform.bounds(&Box3::new(-half, half)));
        Self {
            size,
            xform,
            material,
            bbox,
        }
    }

    /// Keys: `size` ([1, 1]), `transform`.
    pub fn from_json(j: &Value, material: Arc<dyn Material>) -> ConfigResult<Self> {
        let size = config::get_vec2(j, "size", Vec2::ONE)?;
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(ConfigError::invalid("size", "both extents must be positive"));
        }
        Ok(Self::new(size, config::get_transform(j, "transform")?, material))
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// World-space area.
    pub fn area(&self) -> f32 {
        let u = self.xform.vector(Vec3::X * self.size.x);
        let v = self.xform.vector(Vec3::Y * self.size.y);
        u.cross(v).length()
    }

    fn hit_at_local(&self, t: f32, local_p: Vec3) -> HitRecord<'_> {
        let uv = Vec2::new(local_p.x / self.size.x + 0.5, local_p.y / self.size.y + 0.5);
        HitRecord::new(
            t,
            self.xform.point(local_p),
            self.xform.normal(Vec3::Z).normalize(),
            uv,
            Some(self.material.as_ref()),
        )
    }
}

impl Surface for Quad {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let local = self.xform.inverse().ray(ray);

        // Parallel to the plane
        if local.direction.z == 0.0 {
            return None;
        }

        let t = -local.origin.z / local.direction.z;
        if !local.in_range(t) {
            return None;
        }

        let p = local.at(t);
        let half = self.size * 0.5;
        if !(p.x.abs() <= half.x && p.y.abs() <= half.y) {
            return None;
        }

        Some(self.hit_at_local(t, Vec3::new(p.x, p.y, 0.0)))
    }

    fn bounds(&self) -> Box3 {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.material.is_emissive()
    }

    fn as_emitter(&self) -> Option<&dyn Emitter> {
        self.is_emissive().then_some(self as &dyn Emitter)
    }
}

impl Emitter for Quad {
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        let local_p = ((rv - 0.5) * self.size).extend(0.0);
        let hit = self.hit_at_local(0.0, local_p);

        let offset = hit.p - rec.o;
        let dist = offset.length();
        let area = self.area();
        if dist == 0.0 || area == 0.0 {
            return Color::ZERO;
        }

        let hit = HitRecord { t: dist, ..hit };
        rec.wi = offset / dist;
        rec.pdf = area_to_solid_angle_pdf(1.0 / area, rec.o, hit.p, hit.gn);
        rec.hit = Some(hit);
        rec.emitter = Some(self);
        if !(rec.pdf > 0.0) || !rec.pdf.is_finite() {
            return Color::ZERO;
        }
        self.material.emitted(&Ray::new(rec.o, rec.wi), &hit) / rec.pdf
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
