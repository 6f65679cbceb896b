//! Rank-revealing orthonormalization of a set of column vectors.

use crate::Result;
use crate::errors::NumericalError;
use faer::{Mat, MatRef};

/// Compute an orthonormal basis for the column space of `a` using a thin singular value
/// decomposition. The basis vectors are the left singular vectors whose singular values are
/// larger than `eps * max(n, m) * s_max`; directions below that cutoff are numerically redundant
/// and are dropped, so the result may have fewer columns than the input.
///
/// The returned columns are in the order of the decomposition (descending singular value). A
/// zero-width or all-zero input returns an `n x 0` matrix rather than failing, and a non-finite
/// input is rejected instead of propagating NaN into the basis.
///
/// # Arguments
///
/// * `a`: an `n x m` matrix whose columns span the subspace of interest
///
/// returns: Result<Mat<f64>, DppError>
pub fn orthonormalize(a: MatRef<'_, f64>) -> Result<Mat<f64>> {
    let (n, m) = a.shape();
    if n == 0 || m == 0 {
        return Ok(Mat::zeros(n, 0));
    }

    for j in 0..m {
        for i in 0..n {
            if !a[(i, j)].is_finite() {
                return Err(NumericalError::SvdFailed(format!(
                    "non-finite entry at ({i}, {j})"
                ))
                .into());
            }
        }
    }

    let svd = a
        .thin_svd()
        .map_err(|e| NumericalError::SvdFailed(format!("{e:?}")))?;
    let u = svd.U();
    let s = svd.S();

    let mut s_max = 0.0_f64;
    for i in 0..s.dim() {
        s_max = s_max.max(s[i]);
    }
    if s_max <= 0.0 {
        return Ok(Mat::zeros(n, 0));
    }

    let tol = f64::EPSILON * n.max(m) as f64 * s_max;
    let keep = (0..s.dim()).filter(|&i| s[i] > tol).collect::<Vec<_>>();

    Ok(Mat::from_fn(n, keep.len(), |i, j| u[(i, keep[j])]))
}

/// The largest absolute deviation of `aᵀa` from the identity. Zero for a perfectly
/// orthonormal set of columns.
pub fn orthonormality_error(a: MatRef<'_, f64>) -> f64 {
    let gram = a.transpose() * a;
    let mut worst = 0.0_f64;
    for j in 0..gram.ncols() {
        for i in 0..gram.nrows() {
            let expected = if i == j { 1.0 } else { 0.0 };
            worst = worst.max((gram[(i, j)] - expected).abs());
        }
    }
    worst
}
