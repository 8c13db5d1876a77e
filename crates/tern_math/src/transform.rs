// Affine transforms with a cached inverse.
//
// glam::Mat4 already provides transform_point3() and inverse(); this wraps
// both matrices so normals and world-to-local rays don't re-invert per query.

use crate::{Box3, Mat3, Mat4, Ray, Vec3, Vec4};
use std::ops::Mul;

/// A 4x4 affine transform and its inverse.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub m: Mat4,
    pub m_inv: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m: Mat4::IDENTITY,
        m_inv: Mat4::IDENTITY,
    };

    /// Wrap a matrix, computing its inverse.
    pub fn new(m: Mat4) -> Self {
        Self {
            m,
            m_inv: m.inverse(),
        }
    }

    pub fn translate(t: Vec3) -> Self {
        Self {
            m: Mat4::from_translation(t),
            m_inv: Mat4::from_translation(-t),
        }
    }

    pub fn scale(s: Vec3) -> Self {
        Self {
            m: Mat4::from_scale(s),
            m_inv: Mat4::from_scale(s.recip()),
        }
    }

    /// Rotation of `degrees` about `axis`.
    pub fn axis_angle(axis: Vec3, degrees: f32) -> Self {
        let m = Mat4::from_axis_angle(axis.normalize(), degrees.to_radians());
        Self {
            m,
            m_inv: m.transpose(),
        }
    }

    /// Frame with origin `o` and axes `x`, `y`, `z` as the matrix columns.
    pub fn from_frame(o: Vec3, x: Vec3, y: Vec3, z: Vec3) -> Self {
        Self::new(Mat4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            o.extend(1.0),
        ))
    }

    /// Camera-style frame at `from` whose local -z axis points at `to`.
    pub fn look_at(from: Vec3, to: Vec3, up: Vec3) -> Self {
        let z = (from - to).normalize();
        let x = up.cross(z).normalize();
        let y = z.cross(x);
        Self::from_frame(from, x, y, z)
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        Self {
            m: self.m_inv,
            m_inv: self.m,
        }
    }

    #[inline]
    pub fn point(&self, p: Vec3) -> Vec3 {
        self.m.transform_point3(p)
    }

    /// Transform a direction (w = 0, no translation).
    #[inline]
    pub fn vector(&self, v: Vec3) -> Vec3 {
        self.m.transform_vector3(v)
    }

    /// Transform a normal by the inverse transpose. Not renormalized.
    #[inline]
    pub fn normal(&self, n: Vec3) -> Vec3 {
        let n = self.m_inv.transpose() * Vec4::new(n.x, n.y, n.z, 0.0);
        n.truncate()
    }

    /// True when the linear part is a rotation times a uniform scale, so
    /// spheres stay spheres and angles are preserved.
    pub fn is_similarity(&self) -> bool {
        let x = self.m.x_axis.truncate();
        let y = self.m.y_axis.truncate();
        let z = self.m.z_axis.truncate();
        let (lx, ly, lz) = (x.length_squared(), y.length_squared(), z.length_squared());
        let tol = 1e-4 * lx.max(ly).max(lz);

        (lx - ly).abs() <= tol
            && (lx - lz).abs() <= tol
            && x.dot(y).abs() <= tol
            && x.dot(z).abs() <= tol
            && y.dot(z).abs() <= tol
    }

    /// Factor by which a surface element with unit normal `n` grows in area.
    pub fn area_scale(&self, n: Vec3) -> f32 {
        Mat3::from_mat4(self.m).determinant().abs() * self.normal(n).length()
    }

    /// Transform origin and direction, keeping the parametric range.
    ///
    /// The direction is left unnormalized so `t` means the same thing in both spaces.
    pub fn ray(&self, ray: &Ray) -> Ray {
        Ray::with_range(self.point(ray.origin), self.vector(ray.direction), ray.mint, ray.maxt)
    }

    /// Bounds of the eight transformed corners. Empty boxes stay empty.
    pub fn bounds(&self, bbox: &Box3) -> Box3 {
        if bbox.is_empty() {
            return *bbox;
        }
        Box3::from_points(bbox.corners().map(|corner| self.point(corner)))
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `a * b` applies `b` first, then `a`.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            m: self.m * rhs.m,
            m_inv: rhs.m_inv * self.m_inv,
        }
    }
}

impl From<Mat4> for Transform {
    fn from(m: Mat4) -> Self {
        Self::new(m)
    }
}
