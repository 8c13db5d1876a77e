//! Tabulated piecewise-constant distributions.
//!
//! `Distribution1D` turns a step function over `[0, 1)` into an inverse-CDF
//! sampler; `Distribution2D` stacks one of those per row plus a marginal
//! over the row integrals.

use crate::{Vec2, ONE_MINUS_EPSILON};

/// Piecewise-constant 1D distribution over `[0, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution1D {
    func: Vec<f32>,
    cdf: Vec<f32>,
    func_int: f32,
}

impl Distribution1D {
    /// Build from `n` non-negative step heights.
    ///
    /// If every weight is zero the distribution falls back to uniform.
    ///
    /// # Panics
    ///
    /// Panics if `func` is empty.
    pub fn new(func: &[f32]) -> Self {
        assert!(!func.is_empty(), "Distribution1D needs at least one value");
        debug_assert!(func.iter().all(|&f| f >= 0.0), "weights must be non-negative");

        let n = func.len();
        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.0);
        for (i, &f) in func.iter().enumerate() {
            cdf.push(cdf[i] + f / n as f32);
        }

        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, c) in cdf.iter_mut().enumerate() {
                *c = i as f32 / n as f32;
            }
        } else {
            for c in cdf.iter_mut() {
                *c /= func_int;
            }
        }

        Self {
            func: func.to_vec(),
            cdf,
            func_int,
        }
    }

    /// Number of steps.
    pub fn count(&self) -> usize {
        self.func.len()
    }

    /// Integral of the step function over `[0, 1)`.
    pub fn integral(&self) -> f32 {
        self.func_int
    }

    pub fn func(&self) -> &[f32] {
        &self.func
    }

    /// Normalized CDF with `count() + 1` entries.
    pub fn cdf(&self) -> &[f32] {
        &self.cdf
    }

    /// Index of the bracket `cdf[i] <= u < cdf[i + 1]`, clamped to a valid step.
    fn find_interval(&self, u: f32) -> usize {
        self.cdf
            .partition_point(|&c| c <= u)
            .saturating_sub(1)
            .min(self.count() - 1)
    }

    /// Density of the step at `offset` relative to the continuous domain.
    fn step_pdf(&self, offset: usize) -> f32 {
        if self.func_int > 0.0 {
            self.func[offset] / self.func_int
        } else {
            1.0
        }
    }

    /// Invert the CDF at `u`.
    ///
    /// Returns the resampled coordinate in `[0, 1)`, its density and the step it fell in.
    pub fn sample_continuous(&self, u: f32) -> (f32, f32, usize) {
        let offset = self.find_interval(u);

        let mut du = u - self.cdf[offset];
        let width = self.cdf[offset + 1] - self.cdf[offset];
        if width > 0.0 {
            du /= width;
        }

        let x = ((offset as f32 + du) / self.count() as f32).min(ONE_MINUS_EPSILON);
        (x, self.step_pdf(offset), offset)
    }

    /// Pick a step index.
    ///
    /// Returns the index, its probability mass and `u` remapped to `[0, 1)`
    /// within the chosen bracket.
    pub fn sample_discrete(&self, u: f32) -> (usize, f32, f32) {
        let offset = self.find_interval(u);
        let width = self.cdf[offset + 1] - self.cdf[offset];
        let remapped = if width > 0.0 {
            ((u - self.cdf[offset]) / width).clamp(0.0, ONE_MINUS_EPSILON)
        } else {
            0.0
        };
        (offset, self.discrete_pdf(offset), remapped)
    }

    /// Probability of [`sample_discrete`](Self::sample_discrete) returning `index`.
    pub fn discrete_pdf(&self, index: usize) -> f32 {
        if self.func_int > 0.0 {
            self.func[index] / (self.func_int * self.count() as f32)
        } else {
            1.0 / self.count() as f32
        }
    }

    /// Density of [`sample_continuous`](Self::sample_continuous) at `x`.
    pub fn pdf(&self, x: f32) -> f32 {
        let offset = ((x * self.count() as f32) as usize).min(self.count() - 1);
        self.step_pdf(offset)
    }
}

/// Piecewise-constant 2D distribution over `[0, 1)^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution2D {
    conditional: Vec<Distribution1D>,
    marginal: Distribution1D,
}

impl Distribution2D {
    /// Build from a row-major table of `nu * nv` values (`nv` rows of `nu`).
    ///
    /// # Panics
    ///
    /// Panics if the table is empty or its length is not `nu * nv`.
    pub fn new(func: &[f32], nu: usize, nv: usize) -> Self {
        assert_eq!(func.len(), nu * nv, "table size does not match {nu}x{nv}");

        let conditional: Vec<Distribution1D> =
            func.chunks_exact(nu).map(Distribution1D::new).collect();
        let row_integrals: Vec<f32> = conditional.iter().map(|d| d.integral()).collect();
        let marginal = Distribution1D::new(&row_integrals);

        Self {
            conditional,
            marginal,
        }
    }

    /// Sample a point; the density is the product of the marginal and conditional densities.
    pub fn sample_continuous(&self, u: Vec2) -> (Vec2, f32) {
        let (d1, pdf1, v) = self.marginal.sample_continuous(u.y);
        let (d0, pdf0, _) = self.conditional[v].sample_continuous(u.x);
        (Vec2::new(d0, d1), pdf0 * pdf1)
    }

    /// Density at `p`, looked up at the enclosing table cell.
    pub fn pdf(&self, p: Vec2) -> f32 {
        let nu = self.conditional[0].count();
        let nv = self.marginal.count();
        let iu = ((p.x * nu as f32) as usize).min(nu - 1);
        let iv = ((p.y * nv as f32) as usize).min(nv - 1);

        let integral = self.marginal.integral();
        if integral > 0.0 {
            self.conditional[iv].func()[iu] / integral
        } else {
            1.0
        }
    }
}
