use crate::{Ray, Vec2, Vec3, Vec4};
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// Corner type an [`Aabb`] can be built over.
///
/// Implemented for glam's `Vec2`, `Vec3` and `Vec4`.
pub trait BoxVector:
    Copy + PartialEq + Debug + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    const DIM: usize;

    fn splat(v: f32) -> Self;
    fn component_min(self, other: Self) -> Self;
    fn component_max(self, other: Self) -> Self;
    fn get(self, axis: usize) -> f32;
    fn all_le(self, other: Self) -> bool;
    fn all_lt(self, other: Self) -> bool;
    fn all_finite(self) -> bool;
}

macro_rules! impl_box_vector {
    ($ty:ty, $dim:expr) => {
        impl BoxVector for $ty {
            const DIM: usize = $dim;

            #[inline]
            fn splat(v: f32) -> Self {
                <$ty>::splat(v)
            }

            #[inline]
            fn component_min(self, other: Self) -> Self {
                self.min(other)
            }

            #[inline]
            fn component_max(self, other: Self) -> Self {
                self.max(other)
            }

            #[inline]
            fn get(self, axis: usize) -> f32 {
                self[axis]
            }

            #[inline]
            fn all_le(self, other: Self) -> bool {
                self.cmple(other).all()
            }

            #[inline]
            fn all_lt(self, other: Self) -> bool {
                self.cmplt(other).all()
            }

            #[inline]
            fn all_finite(self) -> bool {
                self.is_finite()
            }
        }
    };
}

impl_box_vector!(Vec2, 2);
impl_box_vector!(Vec3, 3);
impl_box_vector!(Vec4, 4);

/// N-dimensional axis-aligned bounding box.
///
/// A default-constructed box is empty: `min` is +inf and `max` is -inf, so
/// enclosing anything replaces both corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb<V: BoxVector = Vec3> {
    pub min: V,
    pub max: V,
}

pub type Box2 = Aabb<Vec2>;
pub type Box3 = Aabb<Vec3>;
pub type Box4 = Aabb<Vec4>;

impl<V: BoxVector> Default for Aabb<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V: BoxVector> Aabb<V> {
    /// Box containing nothing.
    pub fn empty() -> Self {
        Self {
            min: V::splat(f32::INFINITY),
            max: V::splat(f32::NEG_INFINITY),
        }
    }

    /// Box spanning two corners given in any order.
    pub fn new(a: V, b: V) -> Self {
        Self {
            min: a.component_min(b),
            max: a.component_max(b),
        }
    }

    /// Degenerate box around a single point.
    pub fn from_point(p: V) -> Self {
        Self { min: p, max: p }
    }

    /// Box enclosing every point of an iterator.
    pub fn from_points(points: impl IntoIterator<Item = V>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.enclose_point(p);
        }
        bbox
    }

    /// Grow to contain `other`.
    pub fn enclose(&mut self, other: &Aabb<V>) {
        self.min = self.min.component_min(other.min);
        self.max = self.max.component_max(other.max);
    }

    /// Grow to contain `p`.
    pub fn enclose_point(&mut self, p: V) {
        self.min = self.min.component_min(p);
        self.max = self.max.component_max(p);
    }

    /// Smallest box containing both inputs.
    pub fn union(a: &Aabb<V>, b: &Aabb<V>) -> Self {
        let mut bbox = *a;
        bbox.enclose(b);
        bbox
    }

    /// True when `p` lies inside or on the boundary.
    pub fn contains(&self, p: V) -> bool {
        self.min.all_le(p) && p.all_le(self.max)
    }

    /// True when `p` lies strictly inside.
    pub fn contains_strict(&self, p: V) -> bool {
        self.min.all_lt(p) && p.all_lt(self.max)
    }

    /// True when some axis has `min > max`.
    pub fn is_empty(&self) -> bool {
        !self.min.all_le(self.max)
    }

    pub fn is_finite(&self) -> bool {
        self.min.all_finite() && self.max.all_finite()
    }

    pub fn center(&self) -> V {
        (self.min + self.max) * 0.5
    }

    pub fn diagonal(&self) -> V {
        self.max - self.min
    }

    /// Product of the extents; zero for empty boxes.
    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        (0..V::DIM).map(|i| d.get(i)).product()
    }

    /// Measure of the boundary: perimeter in 2D, surface area in 3D.
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        let mut area = 0.0;
        for skip in 0..V::DIM {
            area += (0..V::DIM).filter(|&i| i != skip).map(|i| d.get(i)).product::<f32>();
        }
        2.0 * area
    }

    /// Index of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let d = self.diagonal();
        let mut axis = 0;
        for i in 1..V::DIM {
            if d.get(i) > d.get(axis) {
                axis = i;
            }
        }
        axis
    }
}

impl Aabb<Vec3> {
    /// Slab test against `ray` clipped to `[ray.mint, ray.maxt]`.
    ///
    /// Returns the entry and exit parameters. Axes where the direction is zero
    /// divide to infinities; the NaNs produced when the origin also sits on a
    /// slab plane are widened to an unbounded interval on that axis.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() || ray.origin.is_nan() || ray.direction.is_nan() {
            return None;
        }

        let inv_dir = ray.direction.recip();
        let t_lower = (self.min - ray.origin) * inv_dir;
        let t_upper = (self.max - ray.origin) * inv_dir;
        let t_lower = Vec3::select(t_lower.is_nan_mask(), Vec3::NEG_INFINITY, t_lower);
        let t_upper = Vec3::select(t_upper.is_nan_mask(), Vec3::INFINITY, t_upper);

        let t_near = t_lower.min(t_upper);
        let t_far = t_lower.max(t_upper);

        let t0 = ray.mint.max(t_near.max_element());
        let t1 = ray.maxt.min(t_far.min_element());

        if t0 <= t1 {
            Some((t0, t1))
        } else {
            None
        }
    }

    /// Convenience wrapper around [`Aabb::intersect`].
    pub fn hit(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit_box() -> Box3 {
        Box3::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_empty_box() {
        let bbox = Box3::default();
        assert!(bbox.is_empty());
        assert!(!bbox.is_finite());
        assert_eq!(bbox.volume(), 0.0);
        assert!(!bbox.contains(Vec3::ZERO));
    }

    #[test]
    fn test_enclose() {
        let mut bbox = Box3::empty();
        bbox.enclose_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(!bbox.is_empty());
        assert_eq!(bbox.min, bbox.max);

        bbox.enclose(&Box3::new(Vec3::ZERO, Vec3::splat(5.0)));
        assert_eq!(bbox.min, Vec3::ZERO);
        assert_eq!(bbox.max, Vec3::splat(5.0));

        let union = Box3::union(&unit_box(), &Box3::from_point(Vec3::splat(3.0)));
        assert_eq!(union.min, Vec3::splat(-1.0));
        assert_eq!(union.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_contains() {
        let bbox = unit_box();
        assert!(bbox.contains(Vec3::ZERO));
        assert!(bbox.contains(Vec3::ONE));
        assert!(!bbox.contains_strict(Vec3::ONE));
        assert!(bbox.contains_strict(Vec3::splat(0.5)));
        assert!(!bbox.contains(Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn test_measures() {
        let bbox = Box3::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.volume(), 6.0);
        assert_eq!(bbox.area(), 22.0);
        assert_eq!(bbox.center(), Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(bbox.longest_axis(), 2);

        let rect = Box2::new(Vec2::ZERO, Vec2::new(2.0, 3.0));
        assert_eq!(rect.volume(), 6.0);
        assert_eq!(rect.area(), 10.0);

        let hyper = Box4::new(Vec4::ZERO, Vec4::splat(2.0));
        assert_eq!(hyper.volume(), 16.0);
    }

    #[test]
    fn test_longest_axis() {
        assert_eq!(Box3::new(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Box3::new(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Box3::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_intersect_hit_and_miss() {
        let bbox = unit_box();

        let ray = Ray::with_range(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, 100.0);
        let (t0, t1) = bbox.intersect(&ray).unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);

        let away = Ray::with_range(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z, 0.0, 100.0);
        assert!(bbox.intersect(&away).is_none());

        let beside = Ray::with_range(Vec3::new(10.0, 0.0, 0.0), Vec3::Z, 0.0, 100.0);
        assert!(bbox.intersect(&beside).is_none());
    }

    #[test]
    fn test_intersect_respects_ray_interval() {
        let bbox = unit_box();
        let short = Ray::with_range(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 0.0, 3.0);
        assert!(bbox.intersect(&short).is_none());

        let inside = Ray::with_range(Vec3::ZERO, Vec3::X, 0.0, f32::INFINITY);
        let (t0, t1) = bbox.intersect(&inside).unwrap();
        assert_eq!(t0, 0.0);
        assert!((t1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_intersect_axis_parallel_on_boundary() {
        // Origin on the x = 1 plane with zero x direction
        let bbox = unit_box();
        let ray = Ray::with_range(Vec3::new(1.0, 0.0, -5.0), Vec3::Z, 0.0, f32::INFINITY);
        assert!(bbox.intersect(&ray).is_some());
    }

    #[test]
    fn test_intersect_degenerate_rays() {
        let bbox = unit_box();
        let nan_origin = Ray::with_range(Vec3::splat(f32::NAN), Vec3::Z, 0.0, f32::INFINITY);
        assert!(bbox.intersect(&nan_origin).is_none());

        let zero_dir = Ray::with_range(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 0.0, f32::INFINITY);
        assert!(bbox.intersect(&zero_dir).is_none());

        assert!(Box3::empty()
            .intersect(&Ray::with_range(Vec3::ZERO, Vec3::X, 0.0, 1.0))
            .is_none());
    }

    /// Reference slab test that walks the ray in tiny steps.
    fn marched_hit(bbox: &Box3, ray: &Ray) -> bool {
        let steps = 4000;
        let t_max = ray.maxt.min(20.0);
        (0..=steps).any(|i| {
            let t = ray.mint + (t_max - ray.mint) * i as f32 / steps as f32;
            bbox.contains(ray.at(t))
        })
    }

    proptest! {
        #[test]
        fn prop_slab_matches_marching(
            ox in -4.0f32..4.0, oy in -4.0f32..4.0, oz in -4.0f32..4.0,
            dx in -1.0f32..1.0, dy in -1.0f32..1.0, dz in -1.0f32..1.0,
        ) {
            let bbox = Box3::new(Vec3::new(-1.0, -0.5, -0.25), Vec3::new(1.0, 0.5, 0.75));
            let dir = Vec3::new(dx, dy, dz);
            prop_assume!(dir.length() > 0.1);
            let ray = Ray::with_range(Vec3::new(ox, oy, oz), dir.normalize(), 0.0, 20.0);

            match bbox.intersect(&ray) {
                Some((t0, t1)) => {
                    // Midpoint of the clipped interval must be inside the box
                    let mid = ray.at(0.5 * (t0 + t1));
                    let grown = Box3::new(bbox.min - Vec3::splat(1e-3), bbox.max + Vec3::splat(1e-3));
                    prop_assert!(grown.contains(mid));
                }
                None => {
                    let shrunk = Box3::new(bbox.min + Vec3::splat(1e-2), bbox.max - Vec3::splat(1e-2));
                    prop_assert!(!marched_hit(&shrunk, &ray));
                }
            }
        }
    }
}
