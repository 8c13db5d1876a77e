//! A surface placed in the scene through a transform.
//!
//! Instead of baking a transform into every primitive of a group, the group
//! is built once in its own space and rays are moved into that space for
//! each query. Lights inside the group are sampled in local space and the
//! densities carried back through the transform.

use crate::material::Color;
use crate::surface::{collect_emitters, Emitter, EmitterRecord, HitRecord, Surface};
use std::sync::Arc;
use tern_math::sampling::{area_to_solid_angle_pdf, sample_index_reuse};
use tern_math::{Box3, Ray, Transform, Vec2, Vec3};

/// Geometry in local space, placed in the world by `xform`.
pub struct Instance {
    /// Built child in local space
    child: Arc<dyn Surface>,
    /// Local-to-world transform
    xform: Transform,
    /// World-space bounding box (for culling)
    bbox: Box3,
    /// Light-sampleable leaves of `child`
    emitters: Vec<Arc<dyn Surface>>,
}

impl Instance {
    /// `child` must already be built.
    pub fn new(child: Arc<dyn Surface>, xform: Transform) -> Self {
        let bbox = xform.bounds(&child.bounds());
        let mut emitters = Vec::new();
        collect_emitters(&child, &mut emitters);
        Self {
            child,
            xform,
            bbox,
            emitters,
        }
    }

    pub fn child(&self) -> &Arc<dyn Surface> {
        &self.child
    }

    pub fn transform(&self) -> &Transform {
        &self.xform
    }

    fn hit_to_world<'a>(&self, local: &HitRecord<'a>) -> HitRecord<'a> {
        HitRecord {
            t: local.t,
            p: self.xform.point(local.p),
            gn: self.xform.normal(local.gn).normalize(),
            sn: self.xform.normal(local.sn).normalize(),
            uv: local.uv,
            material: local.material,
        }
    }

    /// Carry a local solid-angle density at `local_hit`, seen from
    /// `local_o`, over to a world solid-angle density seen from `o`.
    fn pdf_to_world(&self, pdf: f32, local_o: Vec3, local_hit: &HitRecord, o: Vec3) -> f32 {
        let to_hit = local_hit.p - local_o;
        let dist2 = to_hit.length_squared();
        if !(pdf > 0.0) || dist2 == 0.0 {
            return 0.0;
        }
        let cosine = (to_hit.dot(local_hit.gn) / dist2.sqrt()).abs();
        let scale = self.xform.area_scale(local_hit.gn);
        if cosine == 0.0 || scale == 0.0 {
            return 0.0;
        }

        let area_pdf = pdf * cosine / dist2 / scale;
        let world_hit = self.hit_to_world(local_hit);
        area_to_solid_angle_pdf(area_pdf, o, world_hit.p, world_hit.gn)
    }
}

impl Surface for Instance {
    /// The ray is moved to local space without renormalising its direction,
    /// so the local hit parameter is also the world one.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        if !self.bbox.hit(ray) {
            return None;
        }

        let local_ray = self.xform.inverse().ray(ray);
        let local = self.child.intersect(&local_ray)?;
        Some(self.hit_to_world(&local))
    }

    fn bounds(&self) -> Box3 {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.child.is_emissive()
    }

    fn as_emitter(&self) -> Option<&dyn Emitter> {
        (!self.emitters.is_empty()).then_some(self as &dyn Emitter)
    }
}

/// Uniform mixture over the lights inside the instance.
impl Emitter for Instance {
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        if self.emitters.is_empty() {
            return Color::ZERO;
        }
        let (index, rx) = sample_index_reuse(self.emitters.len(), rv.x);
        let Some(emitter) = self.emitters[index].as_emitter() else {
            return Color::ZERO;
        };

        let mut local = EmitterRecord::new(self.xform.inverse().point(rec.o));
        emitter.sample(&mut local, Vec2::new(rx, rv.y));
        let Some(local_hit) = local.hit else {
            return Color::ZERO;
        };
        if !(local.pdf > 0.0) {
            return Color::ZERO;
        }

        let hit = self.hit_to_world(&local_hit);
        let offset = hit.p - rec.o;
        let dist = offset.length();
        if dist == 0.0 {
            return Color::ZERO;
        }
        let hit = HitRecord { t: dist, ..hit };

        rec.wi = offset / dist;
        rec.hit = Some(hit);
        rec.emitter = Some(self);
        rec.pdf = Emitter::pdf(self, rec.o, rec.wi);
        if !(rec.pdf > 0.0) {
            return Color::ZERO;
        }
        match hit.material {
            Some(material) => material.emitted(&Ray::new(rec.o, rec.wi), &hit) / rec.pdf,
            None => Color::ZERO,
        }
    }

    fn pdf(&self, o: Vec3, v: Vec3) -> f32 {
        if self.emitters.is_empty() {
            return 0.0;
        }
        let inv = self.xform.inverse();
        let local_o = inv.point(o);
        let local_v = inv.vector(v).normalize_or_zero();
        let local_ray = Ray::new(local_o, local_v);

        let sum: f32 = self
            .emitters
            .iter()
            .filter_map(|surface| {
                let emitter = surface.as_emitter()?;
                let local_hit = surface.intersect(&local_ray)?;
                let pdf = emitter.pdf(local_o, local_v);
                Some(self.pdf_to_world(pdf, local_o, &local_hit, o))
            })
            .sum();
        sum / self.emitters.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{DiffuseLight, Lambertian};
    use crate::{Bbh, Sphere, SurfaceGroup};
    use tern_math::Pcg32;

    fn unit_sphere() -> Arc<dyn Surface> {
        Arc::new(Sphere::new(1.0, Transform::IDENTITY, Arc::new(Lambertian::new(Color::ONE))))
    }

    #[test]
    fn test_identity_instance() {
        let instance = Instance::new(unit_sphere(), Transform::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        let hit = instance.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert!(hit.material.is_some());
    }

    #[test]
    fn test_translated_and_scaled_instance() {
        let xform = Transform::translate(Vec3::new(3.0, 0.0, 0.0)) * Transform::scale(Vec3::splat(2.0));
        let instance = Instance::new(unit_sphere(), xform);

        let ray = Ray::new(Vec3::new(3.0, 0.0, 10.0), -Vec3::Z);
        let hit = instance.intersect(&ray).unwrap();
        // World-space t is preserved through the unnormalized local ray
        assert!((hit.t - 8.0).abs() < 1e-4);
        assert!((hit.p - Vec3::new(3.0, 0.0, 2.0)).length() < 1e-4);
        assert!((hit.gn - Vec3::Z).length() < 1e-5);

        assert!(instance.intersect(&Ray::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z)).is_none());
        assert!((instance.bounds().max - Vec3::new(5.0, 2.0, 2.0)).length() < 1e-5);
    }

    fn light_sphere(radius: f32, xform: Transform) -> Arc<dyn Surface> {
        Arc::new(Sphere::new(radius, xform, Arc::new(DiffuseLight::new(Color::ONE, 1.0))))
    }

    #[test]
    fn test_instanced_light_matches_placed_light() {
        let center = Vec3::new(1.0, 2.0, -6.0);
        let placed = light_sphere(2.0, Transform::translate(center));
        let instanced = Instance::new(
            light_sphere(1.0, Transform::IDENTITY),
            Transform::translate(center) * Transform::scale(Vec3::splat(2.0)),
        );
        assert!(Instance::new(unit_sphere(), Transform::IDENTITY).as_emitter().is_none());

        let o = Vec3::new(0.5, 0.0, 1.0);
        let mut rng = Pcg32::new(3, 4);
        for _ in 0..100 {
            let mut rec = EmitterRecord::new(o);
            let weight = instanced.sample(&mut rec, rng.next_vec2());
            let Some(hit) = rec.hit else { continue };
            assert!(((hit.p - center).length() - 2.0).abs() < 1e-4);
            assert!((hit.t - (hit.p - o).length()).abs() < 1e-4);

            let expected = placed.pdf(o, rec.wi).unwrap();
            if expected == 0.0 {
                continue;
            }
            assert!((rec.pdf - expected).abs() < 1e-3 * expected, "{} vs {expected}", rec.pdf);
            assert!((weight - Color::splat(1.0 / rec.pdf)).length() < 1e-3 * weight.length());
        }
    }

    #[test]
    fn test_nested_instances_sample_lights() {
        let inner = Instance::new(
            light_sphere(1.0, Transform::IDENTITY),
            Transform::translate(Vec3::new(0.0, 3.0, 0.0)),
        );
        let mut group = SurfaceGroup::new();
        group.add_child(unit_sphere()).unwrap();
        group.add_child(Arc::new(inner)).unwrap();
        let outer = Instance::new(Arc::new(group), Transform::translate(Vec3::new(0.0, 0.0, -5.0)));
        assert!(outer.as_emitter().is_some());

        let placed = light_sphere(1.0, Transform::translate(Vec3::new(0.0, 3.0, -5.0)));
        let o = Vec3::ZERO;
        let mut rng = Pcg32::new(9, 10);
        for _ in 0..100 {
            let mut rec = EmitterRecord::new(o);
            outer.sample(&mut rec, rng.next_vec2());
            if rec.hit.is_none() {
                continue;
            }
            let expected = placed.pdf(o, rec.wi).unwrap();
            if expected == 0.0 {
                continue;
            }
            assert!((rec.pdf - expected).abs() < 1e-3 * expected);
        }
        assert_eq!(outer.pdf(o, -Vec3::Z), 0.0);
    }

    #[test]
    fn test_instance_of_bbh() {
        let mut bbh = Bbh::new();
        for i in 0..6 {
            bbh.add_child(Arc::new(Sphere::new(
                0.4,
                Transform::translate(Vec3::new(i as f32, 0.0, 0.0)),
                Arc::new(Lambertian::new(Color::ONE)),
            )))
            .unwrap();
        }
        bbh.build();

        let rotated = Transform::axis_angle(Vec3::Z, 90.0);
        let instance = Instance::new(Arc::new(bbh), rotated);

        // The row of spheres now runs along +y
        let hit = instance.intersect(&Ray::new(Vec3::new(0.0, 4.0, 5.0), -Vec3::Z)).unwrap();
        assert!((hit.t - 4.6).abs() < 1e-4);
        assert!(instance.intersect(&Ray::new(Vec3::new(4.0, 0.0, 5.0), -Vec3::Z)).is_none());
    }
}
