//! Tern math - vectors, bounding boxes, random streams and sampling.
//!
//! Everything in here is plain value types and free functions; the renderer
//! crate builds its surfaces and integrators on top of these.

// Re-export glam for convenience
pub use glam::*;

pub mod aabb;
pub mod distribution;
pub mod frame;
pub mod hash;
pub mod noise;
mod ray;
pub mod rng;
pub mod sampling;
pub mod spherical;
mod transform;

pub use aabb::{Aabb, Box2, Box3, Box4, BoxVector};
pub use distribution::{Distribution1D, Distribution2D};
pub use frame::Frame;
pub use ray::Ray;
pub use rng::Pcg32;
pub use transform::Transform;

/// Largest `f32` strictly below one.
pub const ONE_MINUS_EPSILON: f32 = 0.999_999_94;

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp<T>(t: f32, a: T, b: T) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    a * (1.0 - t) + b * t
}
