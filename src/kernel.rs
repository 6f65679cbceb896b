//! Construction of the dense L-ensemble kernel matrix from a point set.

use crate::Result;
use crate::config::{KernelKind, KernelSpec};
use crate::errors::NumericalError;
use crate::points::PointSet;
use faer::{Mat, MatRef};
use itertools::Itertools;

/// Relative tolerance used when checking that a kernel matrix is symmetric. The allowed absolute
/// difference is this value scaled by the largest magnitude entry (or one, if that is larger).
pub const SYMMETRY_TOL: f64 = 1.0e-9;

impl KernelSpec {
    /// Evaluate the kernel for two points separated by the squared distance `dist_sq`. This does
    /// not validate the parameters.
    pub fn value(&self, dist_sq: f64) -> f64 {
        let scaled = dist_sq / (self.sigma * self.sigma);
        match self.kind {
            KernelKind::Gaussian => self.intensity * (-scaled).exp(),
            KernelKind::Cauchy => {
                let alpha = self.alpha.unwrap_or(1.0);
                self.intensity / (1.0 + scaled).powf(alpha + 0.5)
            }
        }
    }
}

/// A dense, square similarity matrix between the points of a point set, where entry `(i, j)` is
/// the kernel evaluated at the squared distance between points `i` and `j`.
#[derive(Debug, Clone)]
pub struct KernelMatrix {
    values: Mat<f64>,
}

impl KernelMatrix {
    /// Wrap an existing matrix as a kernel matrix. The matrix must be square; symmetry is only
    /// checked when the matrix is decomposed, so that a caller-supplied matrix can be inspected
    /// before being rejected.
    pub fn from_mat(values: Mat<f64>) -> Result<Self> {
        if values.nrows() != values.ncols() {
            return Err(NumericalError::NotSquare {
                rows: values.nrows(),
                cols: values.ncols(),
            }
            .into());
        }
        Ok(Self { values })
    }

    /// Build a kernel matrix from row-major nested values, mostly useful for tests and for
    /// matrices computed somewhere else.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(NumericalError::NotSquare {
                rows: n,
                cols: bad.len(),
            }
            .into());
        }
        Self::from_mat(Mat::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// The number of points the matrix was built from.
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.values.as_ref()
    }

    pub fn max_abs(&self) -> f64 {
        let n = self.len();
        let mut m = 0.0_f64;
        for j in 0..n {
            for i in 0..n {
                m = m.max(self.values[(i, j)].abs());
            }
        }
        m
    }

    /// Check that every entry is finite and that the matrix is symmetric within
    /// [`SYMMETRY_TOL`], relative to its largest entry. The first offending entry found is
    /// reported in the error.
    pub fn check_symmetric(&self) -> Result<()> {
        let n = self.len();
        for j in 0..n {
            for i in 0..n {
                if !self.values[(i, j)].is_finite() {
                    return Err(NumericalError::NonFinite { row: i, col: j }.into());
                }
            }
        }

        let tol = SYMMETRY_TOL * self.max_abs().max(1.0);
        for (i, j) in (0..n).tuple_combinations() {
            let delta = (self.values[(i, j)] - self.values[(j, i)]).abs();
            if delta > tol {
                return Err(NumericalError::Asymmetric {
                    row: i,
                    col: j,
                    delta,
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Build the kernel matrix `L` for a point set, where `L[i][j] = kernel(|p_i - p_j|²)`.
///
/// The kernel parameters are validated before any work is done. Only the upper triangle is
/// evaluated and mirrored, so the result is exactly symmetric.
///
/// # Arguments
///
/// * `points`: the candidate points, in the order that defines their indices
/// * `spec`: the kernel kind and parameters
///
/// returns: Result<KernelMatrix, DppError>
pub fn build_kernel(points: &PointSet, spec: &KernelSpec) -> Result<KernelMatrix> {
    spec.validate()?;

    let n = points.len();
    let mut values = Mat::<f64>::zeros(n, n);
    let diagonal = spec.value(0.0);
    for i in 0..n {
        values[(i, i)] = diagonal;
    }

    for (i, j) in (0..n).tuple_combinations() {
        let v = spec.value(points.dist_sq(i, j));
        values[(i, j)] = v;
        values[(j, i)] = v;
    }

    Ok(KernelMatrix { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point2;
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

    #[test_case(0.0, 50.0)]
    #[test_case(1.0, 50.0 * 0.36787944117144233)]
    #[test_case(4.0, 50.0 * 0.01831563888873418)]
    fn gaussian_values(dist_sq: f64, expected: f64) {
        let spec = KernelSpec::gaussian(50.0, 1.0);
        assert_relative_eq!(spec.value(dist_sq), expected, epsilon = 1e-12);
    }

    #[test_case(0.0, 1.0, 10.0)]
    #[test_case(1.0, 1.0, 10.0 / 2.8284271247461903)]
    #[test_case(3.0, 0.5, 10.0 / 4.0)]
    fn cauchy_values(dist_sq: f64, alpha: f64, expected: f64) {
        let spec = KernelSpec::cauchy(10.0, 1.0, alpha);
        assert_relative_eq!(spec.value(dist_sq), expected, epsilon = 1e-12);
    }

    #[test]
    fn sigma_scales_distance() {
        let spec = KernelSpec::gaussian(1.0, 2.0);
        assert_relative_eq!(spec.value(4.0), (-1.0_f64).exp(), epsilon = 1e-14);
    }

    #[test_case(KernelSpec::gaussian(50.0, 1.0))]
    #[test_case(KernelSpec::gaussian(3.0, 0.05))]
    #[test_case(KernelSpec::cauchy(50.0, 1.0, 1.0))]
    #[test_case(KernelSpec::cauchy(7.0, 0.2, 3.5))]
    fn kernel_is_symmetric(spec: KernelSpec) {
        let points = random_points(40, 1);
        let kernel = build_kernel(&points, &spec).unwrap();
        assert_eq!(kernel.len(), 40);
        for i in 0..40 {
            assert_relative_eq!(kernel.get(i, i), spec.intensity);
            for j in 0..40 {
                assert!((kernel.get(i, j) - kernel.get(j, i)).abs() < 1e-12);
            }
        }
        assert!(kernel.check_symmetric().is_ok());
    }

    #[test]
    fn empty_point_set() {
        let kernel = build_kernel(&PointSet::default(), &KernelSpec::gaussian(1.0, 1.0)).unwrap();
        assert!(kernel.is_empty());
        assert!(kernel.check_symmetric().is_ok());
    }

    #[test]
    fn matches_pairwise_definition() {
        let points = PointSet::from_coords(&[0.0, 1.0, 0.0], &[0.0, 0.0, 2.0]);
        let spec = KernelSpec::gaussian(2.0, 1.0);
        let kernel = build_kernel(&points, &spec).unwrap();
        assert_relative_eq!(kernel.get(0, 1), 2.0 * (-1.0_f64).exp());
        assert_relative_eq!(kernel.get(0, 2), 2.0 * (-4.0_f64).exp());
        assert_relative_eq!(kernel.get(1, 2), 2.0 * (-5.0_f64).exp());
    }

    #[test]
    fn invalid_spec_rejected_before_work() {
        let points = random_points(5, 2);
        let err = build_kernel(&points, &KernelSpec::gaussian(-1.0, 1.0)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn asymmetric_matrix_reports_location() {
        let kernel = KernelMatrix::from_rows(&[
            vec![1.0, 0.5, 0.0],
            vec![0.5, 1.0, 0.2],
            vec![0.0, 0.3, 1.0],
        ])
        .unwrap();
        let err = kernel.check_symmetric().unwrap_err();
        match err {
            crate::DppError::Numerical(NumericalError::Asymmetric { row, col, .. }) => {
                assert_eq!((row, col), (1, 2));
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn non_finite_entry_rejected() {
        let kernel = KernelMatrix::from_rows(&[vec![1.0, f64::NAN], vec![f64::NAN, 1.0]]).unwrap();
        assert!(matches!(
            kernel.check_symmetric(),
            Err(crate::DppError::Numerical(NumericalError::NonFinite { .. }))
        ));
    }

    #[test]
    fn ragged_rows_rejected() {
        let result = KernelMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0]]);
        assert!(matches!(
            result,
            Err(crate::DppError::Numerical(NumericalError::NotSquare { .. }))
        ));
    }
}
