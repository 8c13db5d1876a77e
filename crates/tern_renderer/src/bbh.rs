//! Bounding box hierarchy (BBH) acceleration structure.
//!
//! Children are collected with `add_child`, then `build` partitions them
//! into a binary tree: sort by centroid along the longest axis of the
//! centroid bounds, split at the median, recurse until a leaf holds at most
//! `max_leaf_size` surfaces. Traversal visits the near child first and
//! shrinks the ray as hits are found, so it returns exactly what a linear
//! scan over the same children would.

use crate::surface::{HitRecord, Surface, SurfaceError, SurfaceResult};
use std::sync::Arc;
use tern_math::{Box3, Ray};

/// Default maximum surfaces per leaf node.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 4;

/// BBH node - either a branch with two children or a leaf with surfaces.
pub enum BbhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BbhNode>,
        right: Box<BbhNode>,
        bbox: Box3,
        /// Axis the children were split along
        axis: usize,
    },
    /// Leaf node with a small number of surfaces.
    Leaf {
        surfaces: Vec<Arc<dyn Surface>>,
        bbox: Box3,
    },
    /// Empty node (for edge cases).
    Empty,
}

impl BbhNode {
    /// Recursive construction over a non-empty set.
    fn build(mut surfaces: Vec<Arc<dyn Surface>>, max_leaf_size: usize) -> Self {
        let n = surfaces.len();
        let bounds = surfaces.iter().fold(Box3::empty(), |mut acc, s| {
            acc.enclose(&s.bounds());
            acc
        });

        // Create leaf for small sets
        if n <= max_leaf_size {
            return BbhNode::Leaf {
                surfaces,
                bbox: bounds,
            };
        }

        // Choose split axis based on centroid spread
        let centroid_bounds = Box3::from_points(surfaces.iter().map(|s| s.bounds().center()));
        let axis = centroid_bounds.longest_axis();

        surfaces.sort_unstable_by(|a, b| {
            let a_val = a.bounds().center()[axis];
            let b_val = b.bounds().center()[axis];
            a_val.total_cmp(&b_val)
        });

        // Split at midpoint
        let right_surfaces = surfaces.split_off(n / 2);
        let left = Self::build(surfaces, max_leaf_size);
        let right = Self::build(right_surfaces, max_leaf_size);

        BbhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
            axis,
        }
    }

    fn bounds(&self) -> Box3 {
        match self {
            BbhNode::Empty => Box3::empty(),
            BbhNode::Leaf { bbox, .. } | BbhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Closest hit in this subtree within the ray's current range.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        match self {
            BbhNode::Empty => None,

            BbhNode::Leaf { surfaces, bbox } => {
                if !bbox.hit(ray) {
                    return None;
                }

                let mut ray = *ray;
                let mut closest = None;
                for surface in surfaces {
                    if let Some(hit) = surface.intersect(&ray) {
                        ray.maxt = hit.t;
                        closest = Some(hit);
                    }
                }
                closest
            }

            BbhNode::Branch {
                left,
                right,
                bbox,
                axis,
            } => {
                if !bbox.hit(ray) {
                    return None;
                }

                // Visit the child on the near side of the split first
                let (near, far) = if ray.direction[*axis] < 0.0 {
                    (right, left)
                } else {
                    (left, right)
                };

                let near_hit = near.intersect(ray);

                // Only check the far child up to the closest hit
                let far_ray = match &near_hit {
                    Some(hit) => ray.with_maxt(hit.t),
                    None => *ray,
                };
                far.intersect(&far_ray).or(near_hit)
            }
        }
    }

    /// Number of nodes and depth of this subtree.
    fn stats(&self) -> (usize, usize) {
        match self {
            BbhNode::Empty => (0, 0),
            BbhNode::Leaf { .. } => (1, 1),
            BbhNode::Branch { left, right, .. } => {
                let (ln, ld) = left.stats();
                let (rn, rd) = right.stats();
                (1 + ln + rn, 1 + ld.max(rd))
            }
        }
    }
}

/// A surface collection indexed by a bounding box hierarchy.
pub struct Bbh {
    surfaces: Vec<Arc<dyn Surface>>,
    root: BbhNode,
    max_leaf_size: usize,
    built: bool,
}

impl Default for Bbh {
    fn default() -> Self {
        Self::new()
    }
}

impl Bbh {
    pub fn new() -> Self {
        Self::with_max_leaf_size(DEFAULT_MAX_LEAF_SIZE)
    }

    pub fn with_max_leaf_size(max_leaf_size: usize) -> Self {
        Self {
            surfaces: Vec::new(),
            root: BbhNode::Empty,
            max_leaf_size: max_leaf_size.max(1),
            built: false,
        }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn root(&self) -> &BbhNode {
        &self.root
    }

    /// Number of nodes and depth of the tree.
    pub fn stats(&self) -> (usize, usize) {
        self.root.stats()
    }
}

impl Surface for Bbh {
    fn build(&mut self) {
        if self.built {
            return;
        }
        self.built = true;
        if self.surfaces.is_empty() {
            return;
        }

        self.root = BbhNode::build(self.surfaces.clone(), self.max_leaf_size);
        let (nodes, depth) = self.root.stats();
        log::debug!(
            "Built BBH over {} surfaces: {} nodes, depth {}",
            self.surfaces.len(),
            nodes,
            depth
        );
    }

    fn add_child(&mut self, surface: Arc<dyn Surface>) -> SurfaceResult<()> {
        if self.built {
            return Err(SurfaceError::AlreadyBuilt);
        }
        self.surfaces.push(surface);
        Ok(())
    }

    fn children(&self) -> &[Arc<dyn Surface>] {
        &self.surfaces
    }

    fn intersect(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        self.root.intersect(ray)
    }

    fn bounds(&self) -> Box3 {
        if self.built {
            return self.root.bounds();
        }
        self.surfaces.iter().fold(Box3::empty(), |mut acc, s| {
            acc.enclose(&s.bounds());
            acc
        })
    }

    fn is_emissive(&self) -> bool {
        self.surfaces.iter().any(|s| s.is_emissive())
    }
}
