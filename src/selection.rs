//! Independent Bernoulli selection of eigenvectors, which reduces the L-ensemble to a mixture
//! of elementary (projection) determinantal processes.

use crate::Result;
use crate::errors::NumericalError;
use crate::spectral::EigenDecomposition;
use faer::{Mat, MatRef};
use log::debug;
use rand::Rng;

/// Run one independent Bernoulli trial per probability and return the indices of the trials
/// that succeeded, in ascending order. Trial `i` succeeds when a uniform draw from `[0, 1)` is
/// strictly below `probabilities[i]`, so a probability of zero never succeeds and a probability
/// of one always does. Exactly one draw is consumed per probability, in order.
pub fn bernoulli_trials<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> Vec<usize> {
    probabilities
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| {
            let u = rng.random::<f64>();
            if u < p { Some(i) } else { None }
        })
        .collect()
}

/// The span of the eigenvectors that survived the Bernoulli trials, stored as an `n x k` matrix
/// of orthonormal columns. Sampling from this subspace is an elementary determinantal process
/// that always yields exactly `k` points.
#[derive(Debug, Clone)]
pub struct SelectedSubspace {
    basis: Mat<f64>,
    eigen_indices: Vec<usize>,
}

impl SelectedSubspace {
    /// Gather the given eigenvector columns into a subspace. The columns of an eigenbasis are
    /// already orthonormal, so no normalization happens here.
    pub fn from_columns(vectors: MatRef<'_, f64>, columns: &[usize]) -> Result<Self> {
        if let Some(&bad) = columns.iter().find(|&&c| c >= vectors.ncols()) {
            return Err(NumericalError::ColumnOutOfRange {
                column: bad,
                available: vectors.ncols(),
            }
            .into());
        }
        let basis = Mat::from_fn(vectors.nrows(), columns.len(), |i, j| {
            vectors[(i, columns[j])]
        });
        Ok(Self {
            basis,
            eigen_indices: columns.to_vec(),
        })
    }

    /// Wrap a matrix that is already known to have orthonormal columns.
    pub fn from_basis(basis: Mat<f64>) -> Self {
        let eigen_indices = (0..basis.ncols()).collect();
        Self {
            basis,
            eigen_indices,
        }
    }

    /// The number of points, `n`.
    pub fn n_points(&self) -> usize {
        self.basis.nrows()
    }

    /// The dimension of the subspace, `k`, which is also the size of any sample drawn from it.
    pub fn dim(&self) -> usize {
        self.basis.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.basis.ncols() == 0
    }

    /// The indices of the eigenvectors (in the decomposition's order) that make up the subspace.
    pub fn eigen_indices(&self) -> &[usize] {
        &self.eigen_indices
    }

    pub fn basis(&self) -> MatRef<'_, f64> {
        self.basis.as_ref()
    }

    pub fn into_basis(self) -> Mat<f64> {
        self.basis
    }
}

/// Run the Bernoulli trials for every eigenpair of the decomposition, using the probabilities
/// `λ / (1 + λ)`, and collect the surviving eigenvectors into a subspace.
///
/// # Arguments
///
/// * `eig`: the decomposition of the kernel matrix
/// * `rng`: the random source; one uniform draw is consumed per eigenvalue
///
/// returns: Result<SelectedSubspace, DppError>
pub fn select_subspace<R: Rng + ?Sized>(
    eig: &EigenDecomposition,
    rng: &mut R,
) -> Result<SelectedSubspace> {
    let probabilities = eig.inclusion_probabilities();
    let kept = bernoulli_trials(&probabilities, rng);
    debug!(
        "kept {} of {} eigenvectors (expected {:.3})",
        kept.len(),
        probabilities.len(),
        eig.expected_count()
    );
    SelectedSubspace::from_columns(eig.vectors(), &kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ConstantRng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn certain_and_impossible_trials() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(bernoulli_trials(&[1.0, 1.0, 0.0], &mut rng), vec![0, 1]);
        }
    }

    #[test]
    fn zero_draws_keep_every_positive_probability() {
        let mut rng = ConstantRng::zero();
        let kept = bernoulli_trials(&[0.5, 0.0, 1e-9, 0.99], &mut rng);
        assert_eq!(kept, vec![0, 2, 3]);
    }

    #[test]
    fn trial_frequencies() {
        let mut rng = StdRng::seed_from_u64(42);
        let probs = [0.1, 0.5, 0.9];
        let mut counts = [0usize; 3];
        let runs = 20_000;
        for _ in 0..runs {
            for i in bernoulli_trials(&probs, &mut rng) {
                counts[i] += 1;
            }
        }
        for (c, p) in counts.iter().zip(probs.iter()) {
            let f = *c as f64 / runs as f64;
            assert!((f - p).abs() < 0.02, "frequency {f} for probability {p}");
        }
    }

    #[test]
    fn subspace_from_columns() {
        let vectors = Mat::<f64>::identity(3, 3);
        let sub = SelectedSubspace::from_columns(vectors.as_ref(), &[0, 2]).unwrap();
        assert_eq!(sub.n_points(), 3);
        assert_eq!(sub.dim(), 2);
        assert_eq!(sub.eigen_indices(), &[0, 2]);
        assert_eq!(sub.basis()[(2, 1)], 1.0);
        assert_eq!(sub.basis()[(1, 1)], 0.0);
    }

    #[test]
    fn subspace_column_out_of_range() {
        let vectors = Mat::<f64>::identity(2, 2);
        assert!(SelectedSubspace::from_columns(vectors.as_ref(), &[2]).is_err());
    }

    #[test]
    fn injected_probabilities_one_one_zero() {
        let vectors = Mat::<f64>::identity(3, 3);
        let eig = EigenDecomposition::from_parts(vec![1e300, 1e300, 0.0], vectors).unwrap();
        let mut rng = ConstantRng::zero();
        let sub = select_subspace(&eig, &mut rng).unwrap();
        assert_eq!(sub.dim(), 2);
        assert_eq!(sub.eigen_indices(), &[0, 1]);
    }
}
