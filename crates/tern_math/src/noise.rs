//! Gradient (Perlin) noise in one to four dimensions.
//!
//! Lattice gradients come from hashing the integer cell coordinates, so the
//! noise needs no permutation tables and is identical across runs.

use crate::sampling::{sample_4sphere, sample_circle, sample_sphere};
use crate::{hash_to_float, hash_to_float2, hash_to_float4, Vec2, Vec3, Vec4};

/// Quintic falloff, 1 at the lattice point and 0 at distance one.
#[inline]
fn falloff(t: f32) -> f32 {
    let t = t.abs();
    if t >= 1.0 {
        return 0.0;
    }
    1.0 - t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Sum of the surflets from the `2^N` lattice corners around `p`.
fn perlin<const N: usize>(p: [f32; N], gradient: impl Fn([i32; N]) -> [f32; N]) -> f32 {
    let cell = p.map(|x| x.floor() as i32);
    let mut result = 0.0;

    for corner in 0..(1u32 << N) {
        let grid: [i32; N] = std::array::from_fn(|i| cell[i] + ((corner >> i) & 1) as i32);
        let offset: [f32; N] = std::array::from_fn(|i| p[i] - grid[i] as f32);
        let weight: f32 = offset.iter().map(|&t| falloff(t)).product();
        if weight == 0.0 {
            continue;
        }

        let g = gradient(grid);
        let dot: f32 = offset.iter().zip(g.iter()).map(|(a, b)| a * b).sum();
        result += weight * dot;
    }

    result * (4.0 / N as f32).sqrt()
}

pub fn perlin_noise1(x: f32) -> f32 {
    perlin([x], |[i]| [2.0 * hash_to_float!(i) - 1.0])
}

pub fn perlin_noise2(p: Vec2) -> f32 {
    perlin(p.to_array(), |grid| {
        sample_circle(hash_to_float!(grid)).to_array()
    })
}

pub fn perlin_noise3(p: Vec3) -> f32 {
    perlin(p.to_array(), |grid| {
        sample_sphere(hash_to_float2!(grid)).to_array()
    })
}

pub fn perlin_noise4(p: Vec4) -> f32 {
    perlin(p.to_array(), |grid| {
        sample_4sphere(hash_to_float4!(grid)).to_array()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pcg32;

    #[test]
    fn test_falloff() {
        assert_eq!(falloff(0.0), 1.0);
        assert_eq!(falloff(1.0), 0.0);
        assert_eq!(falloff(-1.5), 0.0);
        assert!((falloff(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_at_lattice_points() {
        for i in -3..3 {
            let f = i as f32;
            assert_eq!(perlin_noise1(f), 0.0);
            assert_eq!(perlin_noise2(Vec2::new(f, 2.0)), 0.0);
            assert_eq!(perlin_noise3(Vec3::new(1.0, f, -4.0)), 0.0);
            assert_eq!(perlin_noise4(Vec4::new(f, 0.0, 7.0, f)), 0.0);
        }
    }

    #[test]
    fn test_deterministic_and_bounded() {
        let mut rng = Pcg32::new(8, 8);
        let mut nonzero = 0;
        for _ in 0..2000 {
            let p = rng.next_vec4() * 20.0 - Vec4::splat(10.0);
            let values = [
                perlin_noise1(p.x),
                perlin_noise2(p.truncate().truncate()),
                perlin_noise3(p.truncate()),
                perlin_noise4(p),
            ];
            for v in values {
                assert!(v.is_finite());
                assert!(v.abs() <= 2.0, "noise out of range: {v}");
                if v != 0.0 {
                    nonzero += 1;
                }
            }
            assert_eq!(perlin_noise3(p.truncate()), values[2]);
        }
        assert!(nonzero > 7000);
    }

    #[test]
    fn test_continuous() {
        let p = Vec3::new(0.37, 1.21, -2.5);
        let eps = Vec3::splat(1e-4);
        assert!((perlin_noise3(p) - perlin_noise3(p + eps)).abs() < 1e-2);
    }
}
