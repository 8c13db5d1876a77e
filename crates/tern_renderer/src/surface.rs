//! Surface trait and the records intersection and emitter queries produce.
//!
//! Every piece of scene geometry implements [`Surface`]. Capabilities that
//! only some surfaces have are split out: composites accept children through
//! [`Surface::add_child`], and light-emitting surfaces expose an [`Emitter`]
//! through [`Surface::as_emitter`]. Calling a capability a surface lacks
//! yields [`SurfaceError::Unsupported`].

use crate::material::{Color, Material};
use std::fmt;
use std::sync::Arc;
use tern_math::sampling::sample_index_reuse;
use tern_math::{Box3, Ray, Vec2, Vec3};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("{surface} does not support {operation}")]
    Unsupported {
        operation: &'static str,
        surface: &'static str,
    },

    #[error("cannot add children after the acceleration structure is built")]
    AlreadyBuilt,
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Record of a ray-surface intersection.
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit position
    pub p: Vec3,
    /// Geometric normal
    pub gn: Vec3,
    /// Interpolated shading normal
    pub sn: Vec3,
    pub uv: Vec2,
    /// Material at the hit point
    pub material: Option<&'a dyn Material>,
}

impl<'a> HitRecord<'a> {
    pub fn new(t: f32, p: Vec3, normal: Vec3, uv: Vec2, material: Option<&'a dyn Material>) -> Self {
        Self {
            t,
            p,
            gn: normal,
            sn: normal,
            uv,
            material,
        }
    }
}

impl fmt::Debug for HitRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitRecord")
            .field("t", &self.t)
            .field("p", &self.p)
            .field("gn", &self.gn)
            .field("sn", &self.sn)
            .field("uv", &self.uv)
            .field("has_material", &self.material.is_some())
            .finish()
    }
}

/// Query and result of sampling a direction toward an emitter.
///
/// The caller fills `o`; the emitter fills everything else.
#[derive(Clone, Copy, Default)]
pub struct EmitterRecord<'a> {
    /// Point the emitter is sampled from
    pub o: Vec3,
    /// Unit direction from `o` toward `hit.p`
    pub wi: Vec3,
    /// Solid-angle density with respect to `o`
    pub pdf: f32,
    pub hit: Option<HitRecord<'a>>,
    /// Surface that generated the sample
    pub emitter: Option<&'a dyn Surface>,
}

impl EmitterRecord<'_> {
    pub fn new(o: Vec3) -> Self {
        Self {
            o,
            ..Default::default()
        }
    }
}

impl fmt::Debug for EmitterRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterRecord")
            .field("o", &self.o)
            .field("wi", &self.wi)
            .field("pdf", &self.pdf)
            .field("hit", &self.hit)
            .finish()
    }
}

/// Scene geometry.
pub trait Surface: Send + Sync {
    /// One-time precomputation after the last child is added and before
    /// the first intersection query.
    fn build(&mut self) {}

    /// Add a child to a composite surface.
    fn add_child(&mut self, _surface: Arc<dyn Surface>) -> SurfaceResult<()> {
        Err(SurfaceError::Unsupported {
            operation: "add_child",
            surface: self.type_name(),
        })
    }

    /// Direct children, empty for leaves.
    fn children(&self) -> &[Arc<dyn Surface>] {
        &[]
    }

    /// Closest hit with `t` in `[ray.mint, ray.maxt]`.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>>;

    /// World-space bounds.
    fn bounds(&self) -> Box3;

    fn is_emissive(&self) -> bool {
        false
    }

    /// The emitter-sampling capability, if this surface has it.
    fn as_emitter(&self) -> Option<&dyn Emitter> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Surfaces that can be importance sampled as light sources.
pub trait Emitter: Send + Sync {
    /// Sample a direction from `rec.o` toward this surface.
    ///
    /// Fills `rec` and returns the emitted radiance divided by the solid-angle
    /// density of the sample. Zero means sampling failed.
    fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> Color;

    /// Solid-angle density of sampling direction `v` from `o`.
    fn pdf(&self, o: Vec3, v: Vec3) -> f32;
}

impl dyn Surface + '_ {
    /// Sample an emitter-capable surface, failing on surfaces without the capability.
    pub fn sample<'a>(&'a self, rec: &mut EmitterRecord<'a>, rv: Vec2) -> SurfaceResult<Color> {
        match self.as_emitter() {
            Some(emitter) => Ok(emitter.sample(rec, rv)),
            None => Err(SurfaceError::Unsupported {
                operation: "sample",
                surface: self.type_name(),
            }),
        }
    }

    pub fn pdf(&self, o: Vec3, v: Vec3) -> SurfaceResult<f32> {
        match self.as_emitter() {
            Some(emitter) => Ok(emitter.pdf(o, v)),
            None => Err(SurfaceError::Unsupported {
                operation: "pdf",
                surface: self.type_name(),
            }),
        }
    }

    /// Probability of each direct child being picked by [`sample_child`](Self::sample_child).
    pub fn child_prob(&self) -> f32 {
        match self.children().len() {
            0 => 1.0,
            n => 1.0 / n as f32,
        }
    }

    /// Descend uniformly at random to a leaf.
    ///
    /// Returns the leaf and the probability of choosing it. `rv` is consumed
    /// and replaced with a fresh uniform value for the next dimension.
    pub fn sample_child(&self, rv: &mut f32) -> (&dyn Surface, f32) {
        let children = self.children();
        if children.is_empty() {
            return (self, 1.0);
        }

        let (index, remapped) = sample_index_reuse(children.len(), *rv);
        *rv = remapped;
        let (leaf, prob) = children[index].sample_child(rv);
        (leaf, prob * self.child_prob())
    }
}

/// Add the light-sampleable leaves reachable from `surface` to `out`.
///
/// Composites are opened up so each light is sampled on its own. Instances
/// are leaves here: they sample the lights inside them through their own
/// transform.
pub(crate) fn collect_emitters(surface: &Arc<dyn Surface>, out: &mut Vec<Arc<dyn Surface>>) {
    if !surface.is_emissive() {
        return;
    }

    let children = surface.children();
    if !children.is_empty() {
        for child in children {
            collect_emitters(child, out);
        }
    } else if surface.as_emitter().is_some() {
        out.push(surface.clone());
    } else {
        log::warn!(
            "Emissive {} cannot be light sampled; it is reached only by material sampling",
            surface.type_name()
        );
    }
}
