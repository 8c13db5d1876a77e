//! A flat list of surfaces.
//!
//! `SurfaceGroup` answers intersection queries with a linear scan. The scene
//! also uses one as the collection of its emitters, where it acts as a
//! uniform mixture over its children for light sampling.

use crate::material::Color;
use crate::surface::{Emitter, EmitterRecord, HitRecord, Surface, SurfaceResult};
use std::sync::Arc;
use tern_math::sampling::sample_index_reuse;
use tern_math::{Box3, Ray, Vec2, Vec3};

/// A list of surfaces.
#[derive(Default, Clone)]
pub struct SurfaceGroup {
    surfaces: Vec<Arc<dyn Surface>>,
    bbox: Box3,
}

impl SurfaceGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Append a surface.
    pub fn push(&mut self, surface: Arc<dyn Surface>) {
        self.bbox.enclose(&surface.bounds());
        self.surfaces.push(surface);
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.bbox = Box3::empty();
    }
}

impl Surface for SurfaceGroup {
    fn add_child(&mut self, surface: Arc<dyn Surface>) -> SurfaceResult<()> {
        self.push(surface);
        Ok(())
    }

    fn children(&self) -> &[Arc<dyn Surface>] {
        &self.surfaces
    }

    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        let mut ray = *ray;
        let mut closest = None;

        for surface in &self.surfaces {
            if let Some(hit) = surface.intersect(&ray) {
                ray.maxt = hit.t;
                closest = Some(hit);
            }
        }

        closest
    }

    fn bounds(&self) -> Box3 {
        self.bbox
    }

    fn is_emissive(&self) -> bool {
        self.surfaces.iter().any(|s| s.is_emissive())
    }

    fn as_emitter(&self) -> Option<&dyn Emitter> {
        self.is_emissive().then_some(self as &dyn Emitter)
    }
}

impl Emitter for SurfaceGroup {
    /// Pick a child uniformly, sample it, then report the density of the
    /// whole mixture so callers can weigh the sample against material sampling.
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color {
        if self.surfaces.is_empty() {
            return Color::ZERO;
        }

        let (index, rx) = sample_index_reuse(self.surfaces.len(), rv.x);
        let Some(emitter) = self.surfaces[index].as_emitter() else {
            return Color::ZERO;
        };

        let weight = emitter.sample(rec, Vec2::new(rx, rv.y));
        if !(rec.pdf > 0.0) {
            return Color::ZERO;
        }
        let emitted = weight * rec.pdf;

        rec.pdf = self.pdf(rec.o, rec.wi);
        if rec.pdf > 0.0 {
            emitted / rec.pdf
        } else {
            Color::ZERO
        }
    }

    fn pdf(&self, o: Vec3, v: Vec3) -> f32 {
        if self.surfaces.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .surfaces
            .iter()
            .filter_map(|s| s.as_emitter())
            .map(|e| e.pdf(o, v))
            .sum();
        sum / self.surfaces.len() as f32
    }
}
