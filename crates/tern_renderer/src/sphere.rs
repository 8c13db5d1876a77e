//! Sphere primitive for ray tracing.

use crate::material::{Color, Material};
use crate::surface::{Emitter, EmitterRecord, HitRecord, Surface};
use serde_json::Value;
use std::f32::consts::{FRAC_1_PI, PI};
use std::sync::Arc;
use tern_core::config::{self, ConfigResult};
use tern_core::ConfigError;
use tern_math::sampling::{
    area_to_solid_angle_pdf, sample_sphere, sample_sphere_cap, sample_sphere_cap_pdf,
};
use tern_math::spherical::direction_to_spherical_coordinates;
use tern_math::{Box3, Frame, Ray, Transform, Vec2, Vec3};

/// A sphere of `radius` centred at the origin of its local frame.
pub struct Sphere {
    radius: f32,
    xform: Transform,
    material: Arc<dyn Material>,
    bbox: Box3,
    /// Whether the world-space shape is still a sphere
    similar: bool,
}

impl Sphere {
    pub fn new(radius: f32, xform: Transform, material: Arc<dyn Material>) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = xform.bounds(&Box3::new(-rvec, rvec));
        let similar = xform.is_similarity();
        if !similar {
            log::debug!("Sphere under a non-uniform transform, light sampling by area");
        }

        Self {
            radius,
            xform,
            material,
            bbox,
            similar,
        }
    }

    /// Keys: `radius` (1), `transform`.
    pub fn from_json(j: &Value, material: Arc<dyn Material>) -> ConfigResult<Self> {
        let radius = config::get_f32(j, "radius", 1.0)?;
        if radius <= 0.0 {
            return Err(ConfigError::invalid("radius", "must be positive"));
        }
        Ok(Self::new(radius, config::get_transform(j, "transform")?, material))
    }

    pub fn center(&self) -> Vec3 {
        self.xform.point(Vec3::ZERO)
    }

    /// Radius in world space. Exact for similarity transforms.
    pub fn world_radius(&self) -> f32 {
        self.xform.vector(Vec3::X * self.radius).length()
    }

    /// World-space area density of uniformly sampling the local sphere, at
    /// the point with local unit normal `n`.
    fn area_pdf(&self, n: Vec3) -> f32 {
        let area = 4.0 * PI * self.radius * self.radius * self.xform.area_scale(n);
        if area > 0.0 {
            1.0 / area
        } else {
            0.0
        }
    }

    /// Sample a point uniformly on the local sphere and report its
    /// solid-angle density from `rec.o`.
    fn sample_area<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        let n = sample_sphere(rv);
        let hit = self.hit_at_local(0.0, n * self.radius);
        let offset = hit.p - rec.o;
        let dist = offset.length();
        if dist == 0.0 {
            return Color::ZERO;
        }

        let hit = HitRecord { t: dist, ..hit };
        rec.wi = offset / dist;
        rec.pdf = area_to_solid_angle_pdf(self.area_pdf(n), rec.o, hit.p, hit.gn);
        rec.hit = Some(hit);
        rec.emitter = Some(self);
        if !(rec.pdf > 0.0) {
            return Color::ZERO;
        }
        self.material.emitted(&Ray::new(rec.o, rec.wi), &hit) / rec.pdf
    }

    /// Texture coordinates for a point on the local unit sphere.
    fn sphere_uv(n: Vec3) -> Vec2 {
        let phi_theta = direction_to_spherical_coordinates(n);
        Vec2::new(phi_theta.x * 0.5 * FRAC_1_PI, phi_theta.y * FRAC_1_PI)
    }

    fn hit_at_local(&self, t: f32, local_p: Vec3) -> HitRecord<'_> {
        let n = local_p / self.radius;
        let gn = self.xform.normal(n).normalize();
        HitRecord::new(
            t,
            self.xform.point(local_p),
            gn,
            Self::sphere_uv(n),
            Some(self.material.as_ref()),
        )
    }
}

impl Surface for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let local = self.xform.inverse().ray(ray);

        let oc = local.origin;
        let a = local.direction.length_squared();
        let half_b = oc.dot(local.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = half_b * half_b - a * c;
        if !(discriminant >= 0.0) {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (-half_b - sqrtd) / a;
        if !local.in_range(root) {
            root = (-half_b + sqrtd) / a;
            if !local.in_range(root) {
                return None;
            }
        }

        Some(self.hit_at_local(root, local.at(root)))
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

impl Emitter for Sphere {
    /// From outside a true sphere the cone of directions it subtends is
    /// sampled. Otherwise the surface is sampled uniformly by area.
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        if !self.similar {
            return self.sample_area(rec, rv);
        }

        let center = self.center();
        let radius = self.world_radius();
        let to_center = center - rec.o;
        let dist2 = to_center.length_squared();
        if dist2 <= radius * radius {
            return self.sample_area(rec, rv);
        }

        let sin2_max = radius * radius / dist2;
        let cos_max = (1.0 - sin2_max).max(0.0).sqrt();
        if cos_max >= 1.0 {
            return Color::ZERO;
        }

        let local = sample_sphere_cap(rv, cos_max);
        let wi = Frame::from_z(to_center / dist2.sqrt()).to_world(local).normalize();
        let ray = Ray::new(rec.o, wi);
        let Some(hit) = self.intersect(&ray) else {
            return Color::ZERO;
        };

        rec.wi = wi;
        rec.pdf = sample_sphere_cap_pdf(local.z, cos_max);
        rec.hit = Some(hit);
        rec.emitter = Some(self);
        if rec.pdf <= 0.0 {
            return Color::ZERO;
        }
        self.material.emitted(&ray, &hit) / rec.pdf
    }

    fn pdf(&self, o: Vec3, v: Vec3) -> f32 {
        let Some(hit) = self.intersect(&Ray::new(o, v)) else {
            return 0.0;
        };

        if self.similar {
            let radius = self.world_radius();
            let dist2 = (self.center() - o).length_squared();
            if dist2 > radius * radius {
                let cos_max = (1.0 - radius * radius / dist2).max(0.0).sqrt();
                if cos_max >= 1.0 {
                    return 0.0;
                }
                return sample_sphere_cap_pdf(1.0, cos_max);
            }
        }

        let n = (self.xform.inverse().point(hit.p) / self.radius).normalize_or_zero();
        area_to_solid_angle_pdf(self.area_pdf(n), o, hit.p, hit.gn)
    }
}
