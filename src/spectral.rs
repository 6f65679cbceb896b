//! Spectral decomposition of the kernel matrix and the per-eigenvalue inclusion probabilities
//! derived from it.

use crate::Result;
use crate::errors::NumericalError;
use crate::kernel::KernelMatrix;
use faer::{Mat, MatRef, Side};
use log::{debug, warn};

/// Eigenvalues smaller in magnitude than this (relative to the largest eigenvalue, or one) are
/// treated as rounding noise when they come back negative.
pub const EIGENVALUE_TOL: f64 = 1.0e-9;

/// The full eigendecomposition of a kernel matrix. Column `c` of `vectors` is the unit
/// eigenvector belonging to `values[c]`, and the columns form an orthonormal basis.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    values: Vec<f64>,
    vectors: Mat<f64>,
}

impl EigenDecomposition {
    /// Assemble a decomposition from already known eigenpairs. The vectors are taken as given,
    /// so the caller is responsible for them being orthonormal.
    pub fn from_parts(values: Vec<f64>, vectors: Mat<f64>) -> Result<Self> {
        if vectors.ncols() != values.len() || vectors.nrows() != values.len() {
            return Err(NumericalError::NotSquare {
                rows: vectors.nrows(),
                cols: vectors.ncols(),
            }
            .into());
        }
        Ok(Self { values, vectors })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn vectors(&self) -> MatRef<'_, f64> {
        self.vectors.as_ref()
    }

    /// The probability that each eigenvector is kept, `λ / (1 + λ)`. These are the eigenvalues
    /// of the marginal kernel `K = L (I + L)⁻¹`.
    pub fn inclusion_probabilities(&self) -> Vec<f64> {
        self.values.iter().map(|&l| inclusion_probability(l)).collect()
    }

    /// The expected number of points in a sample, which is the sum of the inclusion
    /// probabilities.
    pub fn expected_count(&self) -> f64 {
        self.values.iter().map(|&l| inclusion_probability(l)).sum()
    }

    /// Compute the marginal kernel `K = V diag(p) Vᵀ`. The diagonal entry `K[i][i]` is the
    /// probability that point `i` appears in a sample, and `K[i][i] K[j][j] - K[i][j]²` is the
    /// probability that points `i` and `j` both appear.
    pub fn marginal_kernel(&self) -> Mat<f64> {
        let n = self.len();
        let p = self.inclusion_probabilities();
        let scaled = Mat::from_fn(n, n, |i, c| self.vectors[(i, c)] * p[c]);
        scaled.as_ref() * self.vectors.as_ref().transpose()
    }
}

/// The eigenvalue of the marginal kernel corresponding to an eigenvalue `l` of the L-ensemble
/// kernel.
pub fn inclusion_probability(l: f64) -> f64 {
    if l <= 0.0 { 0.0 } else { l / (1.0 + l) }
}

/// The probability that both point `i` and point `j` appear in a sample, which is the
/// determinant of the marginal kernel restricted to `{i, j}`. For `i == j` this is the single
/// point inclusion probability `K[i][i]`.
///
/// # Arguments
///
/// * `marginal`: the marginal kernel, as returned by [`EigenDecomposition::marginal_kernel`]
/// * `i`, `j`: the two point indices
pub fn pair_inclusion_probability(marginal: MatRef<'_, f64>, i: usize, j: usize) -> f64 {
    if i == j {
        marginal[(i, i)]
    } else {
        marginal[(i, i)] * marginal[(j, j)] - marginal[(i, j)] * marginal[(j, i)]
    }
}

/// Compute the eigendecomposition of a kernel matrix with a solver specialized for symmetric
/// matrices, which guarantees real eigenvalues and an orthonormal set of eigenvectors.
///
/// The matrix is first checked for symmetry, since the solver only reads the lower triangle and
/// would silently produce the decomposition of a different matrix otherwise. Eigenvalues that
/// come back slightly negative from rounding are clamped to zero.
///
/// # Arguments
///
/// * `kernel`: the kernel matrix to decompose
///
/// returns: Result<EigenDecomposition, DppError>
pub fn decompose(kernel: &KernelMatrix) -> Result<EigenDecomposition> {
    kernel.check_symmetric()?;

    let n = kernel.len();
    if n == 0 {
        return Ok(EigenDecomposition {
            values: Vec::new(),
            vectors: Mat::zeros(0, 0),
        });
    }

    let eig = kernel
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| NumericalError::EigenFailed(format!("{e:?}")))?;

    let diag = eig.S();
    let mut values = Vec::with_capacity(n);
    let mut scale = 1.0_f64;
    for i in 0..diag.dim() {
        let v = diag[i];
        if !v.is_finite() {
            return Err(NumericalError::EigenFailed(format!(
                "eigenvalue {i} is not finite ({v})"
            ))
            .into());
        }
        scale = scale.max(v.abs());
        values.push(v);
    }

    let tol = EIGENVALUE_TOL * scale;
    for (i, v) in values.iter_mut().enumerate() {
        if *v < 0.0 {
            if *v < -tol {
                warn!(
                    "eigenvalue {i} is negative ({v:.3e}), kernel may not be positive \
                     semi-definite; clamping to zero"
                );
            }
            *v = 0.0;
        }
    }

    let vectors = eig.U().to_owned();
    let result = EigenDecomposition { values, vectors };
    debug!(
        "decomposed {}x{} kernel, expected sample size {:.3}",
        n,
        n,
        result.expected_count()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point2;
    use crate::config::KernelSpec;
    use crate::kernel::build_kernel;
    use crate::points::PointSet;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    fn random_points(n: usize, seed: u64) -> PointSet {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Point2::new(rng.random::<f64>(), rng.random::<f64>()))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn diagonal_matrix() {
        let kernel = KernelMatrix::from_rows(&[
            vec![3.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let eig = decompose(&kernel).unwrap();
        let mut values = eig.values().to_vec();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(values[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(values[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(values[2], 3.0, epsilon = 1e-12);

        let mut probs = eig.inclusion_probabilities();
        probs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(probs[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(probs[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(probs[2], 0.75, epsilon = 1e-12);
        assert_relative_eq!(eig.expected_count(), 1.25, epsilon = 1e-12);
    }

    #[test_case(KernelSpec::gaussian(50.0, 1.0))]
    #[test_case(KernelSpec::gaussian(5.0, 0.1))]
    #[test_case(KernelSpec::cauchy(50.0, 1.0, 1.0))]
    #[test_case(KernelSpec::cauchy(2.0, 0.3, 2.0))]
    fn eigenpairs_reconstruct_kernel(spec: KernelSpec) {
        let points = random_points(25, 5);
        let kernel = build_kernel(&points, &spec).unwrap();
        let eig = decompose(&kernel).unwrap();
        let n = kernel.len();

        assert!(eig.values().iter().all(|&v| v >= 0.0));
        let probs = eig.inclusion_probabilities();
        assert!(probs.iter().all(|&p| (0.0..1.0).contains(&p)));

        // Orthonormal columns
        let v = eig.vectors();
        let gram = v.transpose() * v;
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(gram[(i, j)], expected, epsilon = 1e-9);
            }
        }

        // V diag(λ) Vᵀ == L, up to the clamped near-zero eigenvalues
        let scale = kernel.max_abs();
        for i in 0..n {
            for j in 0..n {
                let r: f64 = (0..n).map(|c| v[(i, c)] * eig.values()[c] * v[(j, c)]).sum();
                assert!((r - kernel.get(i, j)).abs() < 1e-7 * scale);
            }
        }
    }

    #[test]
    fn marginal_kernel_matches_closed_form() {
        // For L = a I, K = a / (1 + a) I
        let kernel = KernelMatrix::from_rows(&[vec![4.0, 0.0], vec![0.0, 4.0]]).unwrap();
        let k = decompose(&kernel).unwrap().marginal_kernel();
        assert_relative_eq!(k[(0, 0)], 0.8, epsilon = 1e-12);
        assert_relative_eq!(k[(1, 1)], 0.8, epsilon = 1e-12);
        assert_relative_eq!(k[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn marginal_kernel_diagonal_sums_to_expected_count() {
        let points = random_points(15, 8);
        let kernel = build_kernel(&points, &KernelSpec::gaussian(20.0, 0.3)).unwrap();
        let eig = decompose(&kernel).unwrap();
        let k = eig.marginal_kernel();
        let trace: f64 = (0..15).map(|i| k[(i, i)]).sum();
        assert_relative_eq!(trace, eig.expected_count(), epsilon = 1e-9);
    }

    #[test]
    fn pair_probability_of_independent_points() {
        // L = diag(1, 3) gives independent inclusions with probabilities 1/2 and 3/4
        let kernel = KernelMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 3.0]]).unwrap();
        let k = decompose(&kernel).unwrap().marginal_kernel();
        let pair = |i, j| pair_inclusion_probability(k.as_ref(), i, j);
        assert_relative_eq!(pair(0, 0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(pair(1, 1), 0.75, epsilon = 1e-12);
        assert_relative_eq!(pair(0, 1), 0.375, epsilon = 1e-12);
    }

    #[test]
    fn pair_probability_below_product_for_close_points() {
        let points = PointSet::from_coords(&[0.0, 0.01], &[0.0, 0.0]);
        let kernel = build_kernel(&points, &KernelSpec::gaussian(10.0, 1.0)).unwrap();
        let k = decompose(&kernel).unwrap().marginal_kernel();
        let both = pair_inclusion_probability(k.as_ref(), 0, 1);
        let reversed = pair_inclusion_probability(k.as_ref(), 1, 0);
        assert!(both >= -1e-12);
        assert!(both < k[(0, 0)] * k[(1, 1)]);
        assert_relative_eq!(both, reversed, epsilon = 1e-12);
    }

    #[test]
    fn asymmetric_input_rejected() {
        let kernel = KernelMatrix::from_rows(&[vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
        let err = decompose(&kernel).unwrap_err();
        assert!(err.is_numerical());
    }

    #[test]
    fn empty_kernel() {
        let kernel = KernelMatrix::from_rows(&[]).unwrap();
        let eig = decompose(&kernel).unwrap();
        assert!(eig.is_empty());
        assert_eq!(eig.expected_count(), 0.0);
    }

    #[test]
    fn duplicate_points_give_zero_eigenvalue() {
        let points = PointSet::from_coords(&[0.5, 0.5, 0.1], &[0.5, 0.5, 0.9]);
        let kernel = build_kernel(&points, &KernelSpec::gaussian(10.0, 1.0)).unwrap();
        let eig = decompose(&kernel).unwrap();
        let zeros = eig.values().iter().filter(|&&v| v < 1e-9).count();
        assert_eq!(zeros, 1);
    }

    #[test]
    fn from_parts_checks_shape() {
        assert!(EigenDecomposition::from_parts(vec![1.0, 2.0], Mat::identity(3, 3)).is_err());
        assert!(EigenDecomposition::from_parts(vec![1.0, 2.0], Mat::identity(2, 2)).is_ok());
    }
}
