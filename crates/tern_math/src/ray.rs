use crate::Vec3;

/// A ray with origin, direction and a valid parametric range.
///
/// Intersection routines only report hits with `mint <= t <= maxt`. The
/// direction is not required to be normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub mint: f32,
    pub maxt: f32,
}

impl Ray {
    /// Default `mint` used to step off the surface a ray starts on.
    pub const EPSILON: f32 = 1e-4;

    /// Create a ray covering `[EPSILON, inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, Self::EPSILON, f32::INFINITY)
    }

    /// Create a ray with an explicit parametric range.
    pub fn with_range(origin: Vec3, direction: Vec3, mint: f32, maxt: f32) -> Self {
        Self {
            origin,
            direction,
            mint,
            maxt,
        }
    }

    /// Copy of this ray with a different `maxt`.
    #[inline]
    pub fn with_maxt(mut self, maxt: f32) -> Self {
        self.maxt = maxt;
        self
    }

    /// Point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// True when `t` lies in `[mint, maxt]`. NaN is never in range.
    #[inline]
    pub fn in_range(&self, t: f32) -> bool {
        t >= self.mint && t <= self.maxt
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Z)
    }
}
