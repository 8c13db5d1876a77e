//! Spherical coordinate helpers.
//!
//! `theta` is measured from +z, `phi` runs counter-clockwise around z in
//! `[0, 2pi]` starting from the -x axis.

use crate::{Vec2, Vec3};
use std::f32::consts::PI;

/// Polar angle of a unit vector.
#[inline]
pub fn spherical_theta(v: Vec3) -> f32 {
    v.z.clamp(-1.0, 1.0).acos()
}

/// Azimuthal angle of a vector, in `[0, 2pi]`.
#[inline]
pub fn spherical_phi(v: Vec3) -> f32 {
    (-v.y).atan2(-v.x) + PI
}

/// `(phi, theta)` of a unit vector.
pub fn direction_to_spherical_coordinates(v: Vec3) -> Vec2 {
    Vec2::new(spherical_phi(v), spherical_theta(v))
}

/// Unit vector for `(phi, theta)`.
pub fn spherical_coordinates_to_direction(phi_theta: Vec2) -> Vec3 {
    let (sin_phi, cos_phi) = phi_theta.x.sin_cos();
    let (sin_theta, cos_theta) = phi_theta.y.sin_cos();
    Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes() {
        assert!(spherical_theta(Vec3::Z).abs() < 1e-6);
        assert!((spherical_theta(-Vec3::Z) - PI).abs() < 1e-6);
        assert!((spherical_phi(Vec3::X)).abs() < 1e-6 || (spherical_phi(Vec3::X) - 2.0 * PI).abs() < 1e-6);
        assert!((spherical_phi(Vec3::Y) - 0.5 * PI).abs() < 1e-6);
        assert!((spherical_phi(-Vec3::X) - PI).abs() < 1e-6);
    }

    #[test]
    fn test_round_trip() {
        for &(phi, theta) in &[(0.3, 0.2), (2.0, 1.5), (4.0, 2.9), (6.0, 0.7)] {
            let dir = spherical_coordinates_to_direction(Vec2::new(phi, theta));
            assert!((dir.length() - 1.0).abs() < 1e-5);
            let back = direction_to_spherical_coordinates(dir);
            assert!((back.x - phi).abs() < 1e-4, "phi {phi} -> {}", back.x);
            assert!((back.y - theta).abs() < 1e-4, "theta {theta} -> {}", back.y);
        }
    }

    #[test]
    fn test_theta_clamps() {
        // Slightly longer than unit must not produce NaN
        assert_eq!(spherical_theta(Vec3::new(0.0, 0.0, 1.000_001)), 0.0);
    }
}
