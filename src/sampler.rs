//! The sequential projection sampler, which draws an exact sample from the elementary
//! determinantal process defined by a set of orthonormal columns.
//!
//! The sampler is a small state machine. Its state is the current orthonormal basis and the
//! indices chosen so far. Each step draws one point with probability proportional to the
//! squared row norms of the basis, removes one basis direction so that the chosen point's row
//! becomes zero, and re-orthonormalizes what is left. The sampler is finished when the basis has
//! no columns left, at which point exactly `k` distinct points have been chosen.
//!
//! Every step costs `O(n k)` for the weights and elimination plus a thin SVD of an `n x k`
//! matrix, so a full run is roughly `O(n k³)` on top of the one-time eigendecomposition.

use crate::errors::NumericalError;
use crate::orthonormal::orthonormalize;
use crate::points::PointSet;
use crate::selection::SelectedSubspace;
use crate::{Point2, Result};
use faer::{Mat, MatRef};
use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Relative tolerance for choosing the column to eliminate. An entry of the chosen row counts as
/// numerically zero when its magnitude is at most this fraction of the row's largest entry (or
/// `f64::EPSILON`, whichever is larger). Dividing by anything smaller blows the remaining
/// columns up onto the pivot direction and the subspace loses rank.
pub const PIVOT_TOL: f64 = 1.0e-8;

/// The points chosen by one sampling run, as distinct indices into the original point set in
/// ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampledIndexSet {
    indices: Vec<usize>,
}

impl SampledIndexSet {
    /// Build an index set from indices in any order. Duplicates are removed.
    pub fn from_unsorted(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.indices.iter()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }

    /// Clone the points at the sampled indices out of the point set the sample was drawn for.
    pub fn select(&self, points: &PointSet) -> Vec<Point2> {
        self.indices.iter().map(|&i| points[i]).collect()
    }

    /// A boolean mask of length `n` which is true at each sampled index.
    pub fn to_mask(&self, n: usize) -> Vec<bool> {
        let mut mask = vec![false; n];
        for &i in self.indices.iter().filter(|&&i| i < n) {
            mask[i] = true;
        }
        mask
    }
}

/// The squared row norms of the basis, which are the diagonal of the projection onto its column
/// space and therefore the marginal inclusion weight of each point under the remaining
/// subspace. For orthonormal columns these sum to the number of columns.
pub fn projection_weights(basis: MatRef<'_, f64>) -> Vec<f64> {
    let (n, k) = basis.shape();
    let mut weights = vec![0.0; n];
    for c in 0..k {
        for (i, w) in weights.iter_mut().enumerate() {
            let v = basis[(i, c)];
            *w += v * v;
        }
    }
    weights
}

/// Draw an index from the discrete distribution proportional to `weights` using the uniform
/// value `u` in `[0, 1)`. The chosen index is the first one with a positive weight whose
/// normalized cumulative weight is at least `u`. If rounding leaves the final cumulative value
/// just under `u`, the last index with a positive weight is chosen.
pub fn inverse_cdf(weights: &[f64], u: f64, iteration: usize) -> Result<usize> {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(NumericalError::DegenerateWeights { iteration, total }.into());
    }

    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if cumulative / total >= u {
            return Ok(i);
        }
    }

    last_positive.ok_or_else(|| NumericalError::DegenerateWeights { iteration, total }.into())
}

/// The first column whose entry in `row` is not numerically zero, relative to the largest entry
/// in that row (see [`PIVOT_TOL`]). Taking the first qualifying column rather than the largest
/// keeps the choice deterministic and cheap; the sampled distribution does not depend on it.
pub fn pivot_column(basis: MatRef<'_, f64>, row: usize) -> Option<usize> {
    let row_max = (0..basis.ncols()).fold(0.0_f64, |m, c| m.max(basis[(row, c)].abs()));
    let cutoff = (PIVOT_TOL * row_max).max(f64::EPSILON);
    (0..basis.ncols()).find(|&c| basis[(row, c)].abs() > cutoff)
}

/// Remove the direction of column `pivot` from the basis so that `row` becomes zero in every
/// remaining column. Each column `c` is replaced by `c - (V[row][c] / V[row][pivot]) * pivot`,
/// after which the (now zero) pivot column is dropped. The result has one column fewer and is no
/// longer orthonormal.
pub fn eliminate(basis: MatRef<'_, f64>, row: usize, pivot: usize) -> Mat<f64> {
    let (n, k) = basis.shape();
    let p = basis[(row, pivot)];
    let keep = (0..k).filter(|&c| c != pivot).collect::<Vec<_>>();

    let mut result = Mat::from_fn(n, keep.len(), |i, j| {
        let c = keep[j];
        basis[(i, c)] - basis[(row, c)] / p * basis[(i, pivot)]
    });

    // Exactly zero, not just to rounding
    for j in 0..result.ncols() {
        result[(row, j)] = 0.0;
    }
    result
}

/// Sequential sampler for an elementary determinantal process. It owns its basis exclusively
/// and shrinks it by one column per [`SequentialSampler::step`].
#[derive(Debug, Clone)]
pub struct SequentialSampler {
    basis: Mat<f64>,
    selected: Vec<usize>,
    target: usize,
}

impl SequentialSampler {
    pub fn new(subspace: SelectedSubspace) -> Self {
        Self::from_basis(subspace.into_basis())
    }

    /// Start from a basis that is assumed to have orthonormal columns.
    pub fn from_basis(basis: Mat<f64>) -> Self {
        let target = basis.ncols();
        Self {
            basis,
            selected: Vec::with_capacity(target),
            target,
        }
    }

    /// The number of points still to be drawn, equal to the current number of basis columns.
    pub fn remaining(&self) -> usize {
        self.basis.ncols()
    }

    /// The total number of points this sampler will produce.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_done(&self) -> bool {
        self.basis.ncols() == 0
    }

    /// The indices drawn so far, in the order they were drawn.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn basis(&self) -> MatRef<'_, f64> {
        self.basis.as_ref()
    }

    /// Perform one sampling step: draw a point, eliminate a basis direction, and restore an
    /// orthonormal basis for the remaining subspace. Returns the drawn index, or `None` if the
    /// sampler was already finished. Consumes exactly one uniform draw when it does any work.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<usize>> {
        if self.is_done() {
            return Ok(None);
        }

        let iteration = self.selected.len();
        let expected = self.basis.ncols() - 1;

        let weights = projection_weights(self.basis.as_ref());
        let u = rng.random::<f64>();
        let index = inverse_cdf(&weights, u, iteration)?;
        debug_assert!(!self.selected.contains(&index));

        let pivot = pivot_column(self.basis.as_ref(), index)
            .ok_or(NumericalError::NoPivot { iteration, index })?;

        let reduced = eliminate(self.basis.as_ref(), index, pivot);
        let mut basis = orthonormalize(reduced.as_ref())?;
        if basis.ncols() != expected {
            return Err(NumericalError::RankCollapse {
                iteration,
                expected,
                found: basis.ncols(),
            }
            .into());
        }

        self.selected.push(index);

        // Rows of already chosen points are zero in the exact subspace, keep them that way
        for &i in self.selected.iter() {
            for j in 0..basis.ncols() {
                basis[(i, j)] = 0.0;
            }
        }
        self.basis = basis;

        trace!(
            "iteration {}: u={:.6}, chose point {} (weight {:.4}), pivot column {}, {} left",
            iteration,
            u,
            index,
            weights[index],
            pivot,
            self.basis.ncols()
        );

        Ok(Some(index))
    }

    /// Step until the basis is empty and return the sorted sample. A zero-dimensional subspace
    /// returns an empty sample without drawing any random numbers.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<SampledIndexSet> {
        while self.step(rng)?.is_some() {}
        Ok(SampledIndexSet::from_unsorted(self.selected))
    }
}
