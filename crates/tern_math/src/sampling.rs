//! Warps from uniform random numbers to geometric domains.
//!
//! Every `sample_*` function has a matching `sample_*_pdf` giving the density
//! of the warp: per unit solid angle for directions, per unit area for disks
//! and triangles.

use crate::{Vec2, Vec3, Vec4, ONE_MINUS_EPSILON};
use std::f32::consts::{FRAC_1_PI, FRAC_PI_2, FRAC_PI_4, PI, TAU};

const INV_TWOPI: f32 = 0.5 * FRAC_1_PI;
const INV_FOURPI: f32 = 0.25 * FRAC_1_PI;

/// Index in `[0, size)` chosen by `u`.
#[inline]
pub fn sample_index(size: usize, u: f32) -> usize {
    ((u * size as f32) as usize).min(size.saturating_sub(1))
}

/// Index in `[0, size)` chosen by `u`, plus the leftover fraction of `u`
/// rescaled to `[0, 1)` so it can drive the next decision.
#[inline]
pub fn sample_index_reuse(size: usize, u: f32) -> (usize, f32) {
    let scaled = u * size as f32;
    let index = (scaled as usize).min(size.saturating_sub(1));
    let remainder = (scaled - index as f32).clamp(0.0, ONE_MINUS_EPSILON);
    (index, remainder)
}

/// Point on the unit circle.
pub fn sample_circle(u: f32) -> Vec2 {
    let (s, c) = (TAU * u).sin_cos();
    Vec2::new(c, s)
}

pub fn sample_circle_pdf() -> f32 {
    INV_TWOPI
}

/// Point in the unit disk via the concentric (Shirley-Chiu) mapping.
pub fn sample_disk(rv: Vec2) -> Vec2 {
    let offset = 2.0 * rv - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };
    let (s, c) = theta.sin_cos();
    Vec2::new(c, s) * r
}

pub fn sample_disk_pdf(p: Vec2) -> f32 {
    if p.length_squared() <= 1.0 {
        FRAC_1_PI
    } else {
        0.0
    }
}

/// Uniform direction on the unit sphere.
pub fn sample_sphere(rv: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * rv.y;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let xy = sample_circle(rv.x) * r;
    Vec3::new(xy.x, xy.y, z)
}

pub fn sample_sphere_pdf() -> f32 {
    INV_FOURPI
}

/// Uniform point on the unit 3-sphere embedded in 4D (Marsaglia 1972).
pub fn sample_4sphere(rv: Vec4) -> Vec4 {
    let p1 = sample_disk(Vec2::new(rv.x, rv.y));
    let p2 = sample_disk(Vec2::new(rv.z, rv.w));
    let d1 = p1.length_squared();
    let d2 = p2.length_squared();
    if d2 == 0.0 {
        return Vec4::new(p1.x, p1.y, (1.0 - d1).max(0.0).sqrt(), 0.0);
    }
    let r = ((1.0 - d1) / d2).max(0.0).sqrt();
    Vec4::new(p1.x, p1.y, p2.x * r, p2.y * r)
}

pub fn sample_4sphere_pdf() -> f32 {
    0.5 * FRAC_1_PI * FRAC_1_PI
}

/// Uniform direction on the +z hemisphere.
pub fn sample_hemisphere(rv: Vec2) -> Vec3 {
    let z = rv.y;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let xy = sample_circle(rv.x) * r;
    Vec3::new(xy.x, xy.y, z)
}

pub fn sample_hemisphere_pdf(v: Vec3) -> f32 {
    if v.z >= 0.0 {
        INV_TWOPI
    } else {
        0.0
    }
}

/// Cosine-weighted direction on the +z hemisphere (Malley's method).
pub fn sample_hemisphere_cosine(rv: Vec2) -> Vec3 {
    let d = sample_disk(rv);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

pub fn sample_hemisphere_cosine_pdf(v: Vec3) -> f32 {
    v.z.max(0.0) * FRAC_1_PI
}

/// Direction on the +z hemisphere with density proportional to `cos^exponent`.
pub fn sample_hemisphere_cosine_power(exponent: f32, rv: Vec2) -> Vec3 {
    let cos_theta = rv.y.powf(1.0 / (exponent + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let xy = sample_circle(rv.x) * sin_theta;
    Vec3::new(xy.x, xy.y, cos_theta)
}

pub fn sample_hemisphere_cosine_power_pdf(exponent: f32, cos_theta: f32) -> f32 {
    if cos_theta <= 0.0 {
        return 0.0;
    }
    (exponent + 1.0) * INV_TWOPI * cos_theta.powf(exponent)
}

/// Uniform direction inside the cone of directions within `acos(cos_theta_max)` of +z.
pub fn sample_sphere_cap(rv: Vec2, cos_theta_max: f32) -> Vec3 {
    let z = 1.0 - rv.y * (1.0 - cos_theta_max);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let xy = sample_circle(rv.x) * r;
    Vec3::new(xy.x, xy.y, z)
}

pub fn sample_sphere_cap_pdf(cos_theta: f32, cos_theta_max: f32) -> f32 {
    if cos_theta < cos_theta_max {
        0.0
    } else {
        INV_TWOPI / (1.0 - cos_theta_max)
    }
}

/// Uniform barycentric coordinates `(b1, b2)` over a triangle.
pub fn sample_triangle_barycentric(rv: Vec2) -> Vec2 {
    let s = rv.x.sqrt();
    Vec2::new(rv.y * s, 1.0 - s)
}

/// Uniform point on the triangle `v0 v1 v2`.
pub fn sample_triangle(v0: Vec3, v1: Vec3, v2: Vec3, rv: Vec2) -> Vec3 {
    let b = sample_triangle_barycentric(rv);
    v0 * (1.0 - b.x - b.y) + v1 * b.x + v2 * b.y
}

/// Area density of [`sample_triangle`]: one over the triangle's area.
pub fn sample_triangle_pdf(v0: Vec3, v1: Vec3, v2: Vec3) -> f32 {
    let area = 0.5 * (v1 - v0).cross(v2 - v0).length();
    if area > 0.0 {
        1.0 / area
    } else {
        0.0
    }
}

/// Convert an area density at `p` into a solid angle density seen from `o`.
pub fn area_to_solid_angle_pdf(area_pdf: f32, o: Vec3, p: Vec3, normal: Vec3) -> f32 {
    let to_point = p - o;
    let dist2 = to_point.length_squared();
    if dist2 == 0.0 {
        return 0.0;
    }
    let cosine = (to_point.dot(normal) / dist2.sqrt()).abs();
    if cosine == 0.0 {
        return 0.0;
    }
    area_pdf * dist2 / cosine
}
