//! Material trait for surface scattering.
//!
//! Materials never draw random numbers themselves: every call receives the
//! uniform variates it may consume, so the sampler alone decides the
//! sequence of randomness.

use crate::surface::HitRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::f32::consts::{FRAC_1_PI, PI};
use std::sync::Arc;
use tern_core::config::{self, ConfigError, ConfigResult};
use tern_math::sampling::{
    sample_hemisphere_cosine, sample_hemisphere_cosine_pdf, sample_hemisphere_cosine_power,
    sample_hemisphere_cosine_power_pdf, sample_sphere,
};
use tern_math::{Frame, Ray, Vec2, Vec3};

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Outcome of sampling a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterRecord {
    /// `eval / pdf` for the sampled direction
    pub attenuation: Color,
    /// Scattered direction, unit length
    pub wo: Vec3,
    /// True for delta lobes, whose `eval` and `pdf` are always zero
    pub is_specular: bool,
}

/// Trait for materials that describe how light interacts with surfaces.
///
/// `wi` is the direction of the incoming ray (pointing toward the surface)
/// and `wo` the direction light scatters into.
pub trait Material: Send + Sync {
    /// Sample a scattered direction using `rv` (and `rv1` for lobe choices).
    ///
    /// Returns `None` if the ray is absorbed.
    fn sample(&self, wi: Vec3, hit: &HitRecord, rv: Vec2, rv1: f32) -> Option<ScatterRecord>;

    /// BSDF times cosine for a pair of directions.
    fn eval(&self, _wi: Vec3, _wo: Vec3, _hit: &HitRecord) -> Color {
        Color::ZERO
    }

    /// Solid-angle density of [`sample`](Self::sample) producing `wo`.
    fn pdf(&self, _wi: Vec3, _wo: Vec3, _hit: &HitRecord) -> f32 {
        0.0
    }

    /// Radiance emitted toward the origin of `ray`.
    fn emitted(&self, _ray: &Ray, _hit: &HitRecord) -> Color {
        Color::ZERO
    }

    fn is_emissive(&self) -> bool {
        false
    }
}

/// Shading normal flipped to the side `wi` arrives from.
#[inline]
fn facing_normal(wi: Vec3, hit: &HitRecord) -> Vec3 {
    if wi.dot(hit.sn) < 0.0 {
        hit.sn
    } else {
        -hit.sn
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn sample(&self, wi: Vec3, hit: &HitRecord, rv: Vec2, _rv1: f32) -> Option<ScatterRecord> {
        let frame = Frame::from_z(facing_normal(wi, hit));
        let wo = frame.to_world(sample_hemisphere_cosine(rv)).normalize();
        Some(ScatterRecord {
            attenuation: self.albedo,
            wo,
            is_specular: false,
        })
    }

    fn eval(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> Color {
        let cos_theta = wo.dot(facing_normal(wi, hit));
        if cos_theta <= 0.0 {
            return Color::ZERO;
        }
        self.albedo * FRAC_1_PI * cos_theta
    }

    fn pdf(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> f32 {
        let local = Frame::from_z(facing_normal(wi, hit)).to_local(wo);
        sample_hemisphere_cosine_pdf(local)
    }
}

/// Glossy lobe around the mirror direction, with cosine-power falloff.
#[derive(Debug, Clone)]
pub struct Phong {
    albedo: Color,
    exponent: f32,
}

impl Phong {
    pub fn new(albedo: Color, exponent: f32) -> Self {
        Self {
            albedo,
            exponent: exponent.max(0.0),
        }
    }

    fn lobe_pdf(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> f32 {
        let n = facing_normal(wi, hit);
        if wo.dot(n) <= 0.0 {
            return 0.0;
        }
        let mirror = reflect(wi.normalize(), n);
        sample_hemisphere_cosine_power_pdf(self.exponent, mirror.dot(wo).max(0.0))
    }
}

impl Material for Phong {
    fn sample(&self, wi: Vec3, hit: &HitRecord, rv: Vec2, _rv1: f32) -> Option<ScatterRecord> {
        let n = facing_normal(wi, hit);
        let mirror = reflect(wi.normalize(), n);
        let wo = Frame::from_z(mirror)
            .to_world(sample_hemisphere_cosine_power(self.exponent, rv))
            .normalize();
        // Lobe samples below the surface are absorbed
        if wo.dot(n) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            attenuation: self.albedo,
            wo,
            is_specular: false,
        })
    }

    fn eval(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> Color {
        self.albedo * self.lobe_pdf(wi, wo, hit)
    }

    fn pdf(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> f32 {
        self.lobe_pdf(wi, wo, hit)
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone)]
pub struct Metal {
    albedo: Color,
    roughness: f32,
}

impl Metal {
    /// - `albedo`: The color of the metal
    /// - `roughness`: 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }
}

impl Metal {
    /// Density of `normalize(mirror + roughness * p)` for `p` uniform in the
    /// unit ball: the ball's volume along the ray `t * wo`, weighted by `t^2`.
    fn lobe_pdf(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> f32 {
        let n = facing_normal(wi, hit);
        if self.roughness == 0.0 || wo.dot(n) <= 0.0 {
            return 0.0;
        }
        let mirror = reflect(wi.normalize(), n);
        let k = self.roughness;
        let c = wo.normalize().dot(mirror);
        let disc = c * c - 1.0 + k * k;
        if disc <= 0.0 {
            return 0.0;
        }

        let root = disc.sqrt();
        let t_far = c + root;
        if t_far <= 0.0 {
            return 0.0;
        }
        let t_near = (c - root).max(0.0);
        (t_far.powi(3) - t_near.powi(3)) / (4.0 * PI * k.powi(3))
    }
}

impl Material for Metal {
    fn sample(&self, wi: Vec3, hit: &HitRecord, rv: Vec2, rv1: f32) -> Option<ScatterRecord> {
        let n = facing_normal(wi, hit);
        let ball = sample_sphere(rv) * rv1.cbrt();
        let wo = (reflect(wi.normalize(), n) + self.roughness * ball).normalize_or_zero();

        // Only scatter if the reflected ray is in the same hemisphere as the normal
        if wo.dot(n) <= 0.0 {
            return None;
        }
        Some(ScatterRecord {
            attenuation: self.albedo,
            wo,
            is_specular: self.roughness == 0.0,
        })
    }

    fn eval(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> Color {
        self.albedo * self.lobe_pdf(wi, wo, hit)
    }

    fn pdf(&self, wi: Vec3, wo: Vec3, hit: &HitRecord) -> f32 {
        self.lobe_pdf(wi, wo, hit)
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Dielectric {
    /// Index of refraction
    ior: f32,
}

impl Dielectric {
    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn new(ior: f32) -> Self {
        Self { ior }
    }

    /// Schlick's approximation for reflectance
    fn reflectance(cosine: f32, ior: f32) -> f32 {
        let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
    }
}

impl Material for Dielectric {
    fn sample(&self, wi: Vec3, hit: &HitRecord, _rv: Vec2, rv1: f32) -> Option<ScatterRecord> {
        let front_face = wi.dot(hit.sn) < 0.0;
        let normal = if front_face { hit.sn } else { -hit.sn };
        let refraction_ratio = if front_face { 1.0 / self.ior } else { self.ior };

        let unit_direction = wi.normalize();
        let cos_theta = (-unit_direction).dot(normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        // Check for total internal reflection
        let cannot_refract = refraction_ratio * sin_theta > 1.0;

        let wo = if cannot_refract || Self::reflectance(cos_theta, refraction_ratio) > rv1 {
            reflect(unit_direction, normal)
        } else {
            refract(unit_direction, normal, refraction_ratio)
        };

        Some(ScatterRecord {
            attenuation: Color::ONE,
            wo: wo.normalize(),
            is_specular: true,
        })
    }
}

/// Diffuse area light. Emits from the front side only.
#[derive(Debug, Clone)]
pub struct DiffuseLight {
    emit: Color,
}

impl DiffuseLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            emit: color * intensity,
        }
    }
}

impl Material for DiffuseLight {
    fn sample(&self, _wi: Vec3, _hit: &HitRecord, _rv: Vec2, _rv1: f32) -> Option<ScatterRecord> {
        // Lights don't scatter rays
        None
    }

    fn emitted(&self, ray: &Ray, hit: &HitRecord) -> Color {
        if ray.direction.dot(hit.sn) < 0.0 {
            self.emit
        } else {
            Color::ZERO
        }
    }

    fn is_emissive(&self) -> bool {
        true
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a vector through a surface.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

// =============================================================================
// Construction from scene descriptions
// =============================================================================

/// Create a material from its JSON description, dispatching on `"type"`.
pub fn material_from_json(j: &Value) -> ConfigResult<Arc<dyn Material>> {
    let kind = config::require_str(j, "type")?;
    let material: Arc<dyn Material> = match kind {
        "diffuse" | "lambertian" => Arc::new(Lambertian::new(config::get_color(
            j,
            "color",
            Color::splat(0.8),
        )?)),
        "metal" => Arc::new(Metal::new(
            config::get_color(j, "color", Color::splat(0.8))?,
            config::get_f32(j, "roughness", 0.0)?,
        )),
        "dielectric" => Arc::new(Dielectric::new(config::get_f32(j, "ior", 1.5)?)),
        "phong" => Arc::new(Phong::new(
            config::get_color(j, "color", Color::splat(0.8))?,
            config::get_f32(j, "exponent", 20.0)?,
        )),
        "diffuse light" | "emission" => Arc::new(DiffuseLight::new(
            config::get_color(j, "color", Color::ONE)?,
            config::get_f32(j, "intensity", 1.0)?,
        )),
        other => {
            return Err(ConfigError::UnknownType {
                kind: "material",
                name: other.to_string(),
            })
        }
    };
    Ok(material)
}

/// Named materials a scene's surfaces refer to.
#[derive(Clone)]
pub struct MaterialLibrary {
    materials: HashMap<String, Arc<dyn Material>>,
    default: Arc<dyn Material>,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            default: Arc::new(Lambertian::new(Color::splat(0.8))),
        }
    }

    /// Parse a `"materials"` array; every entry needs a `"name"`.
    pub fn from_json(list: &Value) -> ConfigResult<Self> {
        let mut library = Self::new();
        let entries = list
            .as_array()
            .ok_or_else(|| ConfigError::invalid("materials", "expected an array"))?;
        for entry in entries {
            let name = config::require_str(entry, "name")?;
            if library.get(name).is_some() {
                log::warn!("Material \"{}\" defined twice, keeping the last one", name);
            }
            library.insert(name, material_from_json(entry)?);
        }
        Ok(library)
    }

    pub fn insert(&mut self, name: impl Into<String>, material: Arc<dyn Material>) {
        self.materials.insert(name.into(), material);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Material>> {
        self.materials.get(name).cloned()
    }

    /// Material used when a surface does not name one.
    pub fn default_material(&self) -> Arc<dyn Material> {
        self.default.clone()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Resolve a surface's `"material"` key: a library name or an inline description.
    pub fn resolve(&self, surface: &Value) -> ConfigResult<Arc<dyn Material>> {
        match surface.get("material") {
            None => Ok(self.default_material()),
            Some(Value::String(name)) => self
                .get(name)
                .ok_or_else(|| ConfigError::UnknownMaterial(name.clone())),
            Some(inline @ Value::Object(_)) => material_from_json(inline),
            Some(_) => Err(ConfigError::invalid(
                "material",
                "expected a material name or a material object",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tern_math::Pcg32;

    fn hit_with_normal(n: Vec3) -> HitRecord<'static> {
        HitRecord::new(1.0, Vec3::ZERO, n, Vec2::ZERO, None)
    }

    #[test]
    fn test_lambertian_sample_matches_eval_over_pdf() {
        let mat = Lambertian::new(Color::new(0.2, 0.4, 0.6));
        let hit = hit_with_normal(Vec3::Z);
        let wi = Vec3::new(0.3, 0.0, -1.0).normalize();
        let mut rng = Pcg32::new(1, 1);

        for _ in 0..500 {
            let rec = mat.sample(wi, &hit, rng.next_vec2(), rng.next_f32()).unwrap();
            assert!(!rec.is_specular);
            assert!(rec.wo.z >= 0.0);
            let pdf = mat.pdf(wi, rec.wo, &hit);
            if pdf > 1e-4 {
                let ratio = mat.eval(wi, rec.wo, &hit) / pdf;
                assert!((ratio - rec.attenuation).length() < 1e-3);
            }
        }
    }

    #[test]
    fn test_lambertian_is_two_sided() {
        let mat = Lambertian::new(Color::ONE);
        let hit = hit_with_normal(Vec3::Z);
        // Arriving from below scatters downward
        let rec = mat.sample(Vec3::Z, &hit, Vec2::new(0.3, 0.7), 0.5).unwrap();
        assert!(rec.wo.z <= 0.0);
        assert!(mat.eval(Vec3::Z, Vec3::Z, &hit).max_element() == 0.0);
    }

    #[test]
    fn test_phong_eval_over_pdf_is_albedo() {
        let mat = Phong::new(Color::splat(0.5), 10.0);
        let hit = hit_with_normal(Vec3::Z);
        let wi = Vec3::new(1.0, 0.0, -1.0).normalize();
        let mut rng = Pcg32::new(7, 3);
        let mut absorbed = 0;
        for _ in 0..500 {
            match mat.sample(wi, &hit, rng.next_vec2(), rng.next_f32()) {
                Some(rec) => {
                    assert!(rec.wo.z > 0.0);
                    let pdf = mat.pdf(wi, rec.wo, &hit);
                    assert!(pdf > 0.0);
                    let ratio = mat.eval(wi, rec.wo, &hit) / pdf;
                    assert!((ratio - Color::splat(0.5)).length() < 1e-4);
                }
                None => absorbed += 1,
            }
        }
        assert!(absorbed < 250);
    }

    #[test]
    fn test_mirror_metal() {
        let mat = Metal::new(Color::ONE, 0.0);
        let hit = hit_with_normal(Vec3::Z);
        let wi = Vec3::new(1.0, 0.0, -1.0).normalize();
        let rec = mat.sample(wi, &hit, Vec2::splat(0.5), 0.5).unwrap();
        assert!(rec.is_specular);
        assert!((rec.wo - Vec3::new(1.0, 0.0, 1.0).normalize()).length() < 1e-5);
        assert_eq!(mat.pdf(wi, rec.wo, &hit), 0.0);
    }

    #[test]
    fn test_rough_metal_has_a_density() {
        let mat = Metal::new(Color::splat(0.7), 0.4);
        let hit = hit_with_normal(Vec3::Z);
        let wi = Vec3::new(1.0, 0.0, -1.0).normalize();
        let mut rng = Pcg32::new(21, 22);
        for _ in 0..500 {
            let Some(rec) = mat.sample(wi, &hit, rng.next_vec2(), rng.next_f32()) else {
                continue;
            };
            assert!(!rec.is_specular);
            let pdf = mat.pdf(wi, rec.wo, &hit);
            assert!(pdf > 0.0);
            assert!((mat.eval(wi, rec.wo, &hit) / pdf - rec.attenuation).length() < 1e-4);
        }

        // Outside the lobe
        assert_eq!(mat.pdf(wi, Vec3::new(-1.0, 0.0, 1.0).normalize(), &hit), 0.0);
    }

    #[test]
    fn test_dielectric_choice_uses_rv1() {
        let glass = Dielectric::new(1.5);
        let hit = hit_with_normal(Vec3::Z);
        let wi = -Vec3::Z;

        // Normal incidence reflects about 4% of the time
        let reflected = glass.sample(wi, &hit, Vec2::ZERO, 0.01).unwrap();
        assert!((reflected.wo - Vec3::Z).length() < 1e-5);
        let refracted = glass.sample(wi, &hit, Vec2::ZERO, 0.5).unwrap();
        assert!((refracted.wo + Vec3::Z).length() < 1e-5);
        assert!(refracted.is_specular);
    }

    #[test]
    fn test_total_internal_reflection() {
        let glass = Dielectric::new(1.5);
        let hit = hit_with_normal(Vec3::Z);
        // Leaving the glass at a grazing angle
        let wi = Vec3::new(0.9, 0.0, 0.3).normalize();
        let rec = glass.sample(wi, &hit, Vec2::ZERO, 0.99).unwrap();
        assert!(rec.wo.z < 0.0);
    }

    #[test]
    fn test_light_emits_from_front_only() {
        let light = DiffuseLight::new(Color::new(1.0, 0.5, 0.25), 4.0);
        let hit = hit_with_normal(Vec3::Z);
        let toward = Ray::new(Vec3::Z, -Vec3::Z);
        let behind = Ray::new(-Vec3::Z, Vec3::Z);
        assert_eq!(light.emitted(&toward, &hit), Color::new(4.0, 2.0, 1.0));
        assert_eq!(light.emitted(&behind, &hit), Color::ZERO);
        assert!(light.is_emissive());
        assert!(light.sample(-Vec3::Z, &hit, Vec2::ZERO, 0.0).is_none());
    }

    #[test]
    fn test_material_factory() {
        let lib = MaterialLibrary::from_json(&json!([
            {"name": "white", "type": "diffuse", "color": 0.7},
            {"name": "lamp", "type": "diffuse light", "color": [1, 1, 1], "intensity": 10},
            {"name": "glass", "type": "dielectric"},
        ]))
        .unwrap();
        assert_eq!(lib.len(), 3);
        assert!(lib.get("lamp").unwrap().is_emissive());

        assert!(lib.resolve(&json!({"material": "glass"})).is_ok());
        assert!(lib.resolve(&json!({})).is_ok());
        assert!(lib
            .resolve(&json!({"material": {"type": "metal", "roughness": 0.1}}))
            .is_ok());
        assert!(matches!(
            lib.resolve(&json!({"material": "missing"})),
            Err(ConfigError::UnknownMaterial(_))
        ));
        assert!(matches!(
            material_from_json(&json!({"type": "velvet"})),
            Err(ConfigError::UnknownType { .. })
        ));
    }
}
