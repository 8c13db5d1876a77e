//! Light transport: estimating the radiance arriving along a camera ray.

use crate::material::Color;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::surface::{Emitter, EmitterRecord, HitRecord};
use serde::Deserialize;
use tern_math::{Ray, Vec3};

/// Estimates incident radiance along a ray.
pub trait Integrator: Send + Sync {
    /// One sample of the radiance arriving at `ray.origin` from `ray.direction`.
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color;
}

/// Visualises shading normals, mapped from [-1, 1] to [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalsIntegrator;

impl Integrator for NormalsIntegrator {
    fn li(&self, scene: &Scene, _sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        match scene.intersect(ray) {
            Some(hit) => (hit.sn + Color::ONE) * 0.5,
            None => Color::ZERO,
        }
    }
}

/// How a [`PathTracer`] finds light at each path vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Material sampling only. Light is found by hitting it.
    Mats,
    /// Next-event estimation: emitters are sampled at every non-specular vertex.
    Nee,
    /// Both, combined with the balance heuristic.
    Mis,
}

/// Unidirectional path tracer with Russian roulette.
#[derive(Debug, Clone, Copy)]
pub struct PathTracer {
    strategy: Strategy,
    max_bounces: u32,
    rr_depth: u32,
}

impl PathTracer {
    pub fn new(strategy: Strategy, settings: PathTracerSettings) -> Self {
        Self {
            strategy,
            max_bounces: settings.max_bounces,
            rr_depth: settings.russian_roulette_depth,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Light-sampled contribution at a non-specular vertex, not yet
    /// multiplied by the path throughput.
    fn sample_emitters(
        &self,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        wi: Vec3,
        hit: &HitRecord,
    ) -> Color {
        let rv = sampler.next_vec2();
        let emitters = scene.emitters();
        if emitters.is_empty() {
            return Color::ZERO;
        }
        let Some(material) = hit.material else {
            return Color::ZERO;
        };

        let mut rec = EmitterRecord::new(hit.p);
        let weight = Emitter::sample(emitters, &mut rec, rv);
        let Some(light_hit) = rec.hit else {
            return Color::ZERO;
        };
        if weight == Color::ZERO {
            return Color::ZERO;
        }

        let shadow = Ray::with_range(hit.p, rec.wi, Ray::EPSILON, light_hit.t * (1.0 - Ray::EPSILON));
        if scene.intersect(&shadow).is_some() {
            return Color::ZERO;
        }

        let contribution = material.eval(wi, rec.wi, hit) * weight;
        match self.strategy {
            Strategy::Mis => {
                let material_pdf = material.pdf(wi, rec.wi, hit);
                contribution * balance_heuristic(rec.pdf, material_pdf)
            }
            _ => contribution,
        }
    }
}

impl Integrator for PathTracer {
    fn li(&self, scene: &Scene, sampler: &mut dyn Sampler, ray: &Ray) -> Color {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = Ray::new(ray.origin, ray.direction.normalize());

        // Camera rays count as specular: nothing could have sampled them
        let mut specular = true;
        let mut material_pdf = 0.0;

        let mut depth = 0;
        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.background();
                break;
            };
            let Some(material) = hit.material else {
                break;
            };

            let emitted = material.emitted(&ray, &hit);
            if emitted != Color::ZERO {
                match self.strategy {
                    Strategy::Mats => radiance += throughput * emitted,
                    Strategy::Nee => {
                        // Lights the emitter list cannot reach are only found here
                        if specular || scene.emitters().pdf(ray.origin, ray.direction) == 0.0 {
                            radiance += throughput * emitted;
                        }
                    }
                    Strategy::Mis => {
                        let weight = if specular {
                            1.0
                        } else {
                            let light_pdf = scene.emitters().pdf(ray.origin, ray.direction);
                            balance_heuristic(material_pdf, light_pdf)
                        };
                        radiance += throughput * emitted * weight;
                    }
                }
            }

            if depth >= self.max_bounces {
                break;
            }

            let wi = ray.direction;
            let Some(scatter) = material.sample(wi, &hit, sampler.next_vec2(), sampler.next_f32()) else {
                break;
            };

            if self.strategy != Strategy::Mats && !scatter.is_specular {
                radiance += throughput * self.sample_emitters(scene, sampler, wi, &hit);
            }

            specular = scatter.is_specular;
            material_pdf = if specular {
                0.0
            } else {
                material.pdf(wi, scatter.wo, &hit)
            };
            throughput *= scatter.attenuation;
            depth += 1;

            if depth >= self.rr_depth {
                let survive = throughput.max_element().min(0.95);
                if sampler.next_f32() >= survive {
                    break;
                }
                throughput /= survive;
            }

            ray = Ray::new(hit.p, scatter.wo);
        }

        radiance
    }
}

/// Weight of the strategy with density `pdf` against one with `other`.
#[inline]
fn balance_heuristic(pdf: f32, other: f32) -> f32 {
    let sum = pdf + other;
    if sum > 0.0 {
        pdf / sum
    } else {
        0.0
    }
}

/// Path tracer settings shared by all strategies.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PathTracerSettings {
    #[serde(rename = "max bounces")]
    pub max_bounces: u32,
    #[serde(rename = "russian roulette depth")]
    pub russian_roulette_depth: u32,
}

impl Default for PathTracerSettings {
    fn default() -> Self {
        Self {
            max_bounces: 64,
            russian_roulette_depth: 5,
        }
    }
}

/// Scene-file description of an integrator.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegratorConfig {
    Normals,
    PathTracerMats(PathTracerSettings),
    PathTracerNee(PathTracerSettings),
    PathTracerMis(PathTracerSettings),
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig::PathTracerMats(PathTracerSettings::default())
    }
}

impl IntegratorConfig {
    pub fn build(&self) -> Box<dyn Integrator> {
        match *self {
            IntegratorConfig::Normals => Box::new(NormalsIntegrator),
            IntegratorConfig::PathTracerMats(s) => Box::new(PathTracer::new(Strategy::Mats, s)),
            IntegratorConfig::PathTracerNee(s) => Box::new(PathTracer::new(Strategy::Nee, s)),
            IntegratorConfig::PathTracerMis(s) => Box::new(PathTracer::new(Strategy::Mis, s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{DiffuseLight, Lambertian};
    use crate::sampler::IndependentSampler;
    use crate::{Instance, Quad, SceneBuilder, Sphere};
    use serde_json::json;
    use std::sync::Arc;
    use tern_math::{Transform, Vec2, Vec3};

    /// A large grey floor at y = 0 under a unit sphere light centred at y = 2.
    fn lit_floor() -> SceneBuilder {
        let floor = Quad::new(
            Vec2::splat(100.0),
            Transform::axis_angle(Vec3::X, -90.0),
            Arc::new(Lambertian::new(Color::splat(0.5))),
        );
        let light = Sphere::new(
            1.0,
            Transform::translate(Vec3::new(0.0, 2.0, 0.0)),
            Arc::new(DiffuseLight::new(Color::ONE, 1.0)),
        );
        let mut builder = SceneBuilder::new();
        builder.add_surface(Arc::new(floor));
        builder.add_surface(Arc::new(light));
        builder
    }

    fn estimate(scene: &Scene, integrator: &dyn Integrator, ray: &Ray, samples: u32) -> Color {
        let mut sampler = IndependentSampler::new(samples);
        sampler.start_pixel(0, 0);
        let mut sum = Color::ZERO;
        for _ in 0..samples {
            sum += integrator.li(scene, &mut sampler, ray);
            sampler.start_next_sample();
        }
        sum / samples as f32
    }

    #[test]
    fn test_normals_integrator() {
        let scene = lit_floor().build().unwrap();
        let mut sampler = IndependentSampler::new(1);
        let down = Ray::new(Vec3::new(5.0, 1.0, 0.0), -Vec3::Y);
        let color = NormalsIntegrator.li(&scene, &mut sampler, &down);
        assert!((color - Vec3::new(0.5, 1.0, 0.5)).length() < 1e-5);

        let up = Ray::new(Vec3::new(5.0, 1.0, 0.0), Vec3::Y);
        assert_eq!(NormalsIntegrator.li(&scene, &mut sampler, &up), Color::ZERO);
    }

    #[test]
    fn test_escaping_rays_see_background() {
        let mut builder = lit_floor();
        builder.set_background(Color::new(0.2, 0.3, 0.4));
        let scene = builder.build().unwrap();
        let integrator = IntegratorConfig::default().build();
        let ray = Ray::new(Vec3::new(5.0, 1.0, 0.0), Vec3::Y);
        let color = estimate(&scene, integrator.as_ref(), &ray, 4);
        assert!((color - Color::new(0.2, 0.3, 0.4)).length() < 1e-6);
    }

    #[test]
    fn test_directly_visible_light() {
        let scene = lit_floor().build().unwrap();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), -Vec3::Y);
        for strategy in [Strategy::Mats, Strategy::Nee, Strategy::Mis] {
            let settings = PathTracerSettings {
                max_bounces: 0,
                ..Default::default()
            };
            let tracer = PathTracer::new(strategy, settings);
            let color = estimate(&scene, &tracer, &ray, 4);
            assert!((color - Color::ONE).length() < 1e-6, "{strategy:?}: {color}");
        }
    }

    #[test]
    fn test_strategies_agree_on_direct_lighting() {
        let scene = lit_floor().build().unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.5), Vec3::new(0.0, -1.0, -1.0));
        let settings = PathTracerSettings {
            max_bounces: 1,
            russian_roulette_depth: 8,
        };

        // albedo * sin^2 of the light's half angle (30 degrees)
        let expected = 0.5 * 0.25;
        for strategy in [Strategy::Mats, Strategy::Nee, Strategy::Mis] {
            let tracer = PathTracer::new(strategy, settings);
            let color = estimate(&scene, &tracer, &ray, 4000);
            assert!(
                (color.x - expected).abs() < 0.1 * expected,
                "{strategy:?}: {} vs {expected}",
                color.x
            );
        }
    }

    /// `lit_floor` with the light replaced by `light`.
    fn floor_with_light(light: Arc<dyn crate::Surface>) -> Scene {
        let floor = Quad::new(
            Vec2::splat(100.0),
            Transform::axis_angle(Vec3::X, -90.0),
            Arc::new(Lambertian::new(Color::splat(0.5))),
        );
        let mut builder = SceneBuilder::new();
        builder.add_surface(Arc::new(floor));
        builder.add_surface(light);
        builder.build().unwrap()
    }

    fn lamp() -> Arc<DiffuseLight> {
        Arc::new(DiffuseLight::new(Color::ONE, 1.0))
    }

    fn one_bounce(strategy: Strategy) -> PathTracer {
        let settings = PathTracerSettings {
            max_bounces: 1,
            russian_roulette_depth: 8,
        };
        PathTracer::new(strategy, settings)
    }

    #[test]
    fn test_strategies_agree_on_instanced_lights() {
        let sphere: Arc<dyn crate::Surface> = Arc::new(Sphere::new(1.0, Transform::IDENTITY, lamp()));
        let up = Transform::translate(Vec3::new(0.0, 1.0, 0.0));
        let translated = Instance::new(sphere.clone(), up * up);
        let nested = Instance::new(Arc::new(Instance::new(sphere, up)), up);

        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.5), Vec3::new(0.0, -1.0, -1.0));
        let expected = 0.5 * 0.25;
        for light in [translated, nested] {
            let scene = floor_with_light(Arc::new(light));
            assert_eq!(scene.emitters().len(), 1);
            for strategy in [Strategy::Mats, Strategy::Nee, Strategy::Mis] {
                let color = estimate(&scene, &one_bounce(strategy), &ray, 4000);
                assert!(
                    (color.x - expected).abs() < 0.1 * expected,
                    "{strategy:?}: {} vs {expected}",
                    color.x
                );
            }
        }
    }

    #[test]
    fn test_strategies_agree_on_stretched_sphere_light() {
        let xform = Transform::translate(Vec3::new(0.0, 2.0, 0.0))
            * Transform::scale(Vec3::new(0.3, 0.3, 1.0));
        let placed: Arc<dyn crate::Surface> = Arc::new(Sphere::new(1.0, xform, lamp()));
        let instanced: Arc<dyn crate::Surface> = Arc::new(Instance::new(
            Arc::new(Sphere::new(1.0, Transform::IDENTITY, lamp())),
            xform,
        ));

        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.5), Vec3::new(0.0, -1.0, -1.0));
        for light in [placed, instanced] {
            let scene = floor_with_light(light);
            let reference = estimate(&scene, &one_bounce(Strategy::Mats), &ray, 40_000).x;
            assert!(reference > 0.0);
            for strategy in [Strategy::Nee, Strategy::Mis] {
                let color = estimate(&scene, &one_bounce(strategy), &ray, 40_000);
                assert!(
                    (color.x - reference).abs() < 0.1 * reference,
                    "{strategy:?}: {} vs {reference}",
                    color.x
                );
            }
        }
    }

    #[test]
    fn test_integrator_config() {
        let config: IntegratorConfig =
            serde_json::from_value(json!({"type": "path_tracer_mis", "max bounces": 3})).unwrap();
        match config {
            IntegratorConfig::PathTracerMis(s) => {
                assert_eq!(s.max_bounces, 3);
                assert_eq!(s.russian_roulette_depth, 5);
            }
            other => panic!("unexpected {other:?}"),
        }

        let config: IntegratorConfig = serde_json::from_value(json!({"type": "normals"})).unwrap();
        assert!(matches!(config, IntegratorConfig::Normals));
        assert!(serde_json::from_value::<IntegratorConfig>(json!({"type": "bdpt"})).is_err());
    }
}
