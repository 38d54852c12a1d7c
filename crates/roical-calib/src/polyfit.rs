//! Weighted polynomial least squares.

use nalgebra::{DMatrix, DVector};
use roical_core::{Error, Result};

/// Fit `y ~ c0 + c1 x + ... + c_d x^d` by weighted least squares.
///
/// Pure: no state, no side effects. Returns coefficients in ascending power
/// order. Weights must be positive; pass all-ones for an unweighted fit.
/// Fails with `Computation` when there are fewer points than `degree + 1`
/// or the normal equations are singular (e.g. all x identical).
pub fn fit_polynomial(xs: &[f64], ys: &[f64], weights: &[f64], degree: usize) -> Result<Vec<f64>> {
    let n = xs.len();
    if ys.len() != n || weights.len() != n {
        return Err(Error::Validation(format!(
            "mismatched input lengths: xs={}, ys={}, weights={}",
            n,
            ys.len(),
            weights.len()
        )));
    }
    let n_coef = degree + 1;
    if n < n_coef {
        return Err(Error::Computation(format!(
            "need at least {} points for a degree-{} fit, got {}",
            n_coef, degree, n
        )));
    }
    if weights.iter().any(|&w| !(w > 0.0) || !w.is_finite()) {
        return Err(Error::Validation("weights must be positive and finite".to_string()));
    }

    // Design matrix, row i = [1, x_i, x_i^2, ...].
    let design = DMatrix::from_fn(n, n_coef, |i, j| xs[i].powi(j as i32));
    let y = DVector::from_column_slice(ys);
    let w = DMatrix::from_diagonal(&DVector::from_column_slice(weights));

    let normal = design.transpose() * &w * &design;
    let rhs = design.transpose() * &w * y;

    let chol = normal
        .cholesky()
        .ok_or_else(|| Error::Computation("singular normal equations".to_string()))?;
    Ok(chol.solve(&rhs).iter().copied().collect())
}
