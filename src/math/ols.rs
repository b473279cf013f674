//! Linear least-squares solves.
//!
//! Every Levenberg-Marquardt step in this crate is a small linear problem of the
//! form:
//!
//! ```text
//! minimize || [J; sqrt(λ) D] δ + [r; 0] ||^2
//! ```
//!
//! Implementation choices:
//! - SVD handles the tall augmented matrix directly, and degrades gracefully
//!   when columns of `J` are nearly collinear (e.g. strongly correlated
//!   parameters such as η and λ in the Maxwell model).
//! - Parameter counts are tiny (2–4 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Relative singular-value cutoff below which column-scaled `J` counts as
/// rank deficient. Finite-difference Jacobians carry ~1e-8 relative noise, so
/// anything much smaller is indistinguishable from exact collinearity.
const RANK_RTOL: f64 = 1e-7;

/// Inverse of the normal matrix `JᵀJ`, or `None` when it is singular.
///
/// Columns are scaled to unit norm first so that parameters of very different
/// magnitude do not read as collinear.
pub fn normal_inverse(jac: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = jac.ncols();
    let norms: Vec<f64> = (0..n).map(|j| jac.column(j).norm()).collect();
    if norms.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
        return None;
    }
    let scaled = DMatrix::from_fn(jac.nrows(), n, |i, j| jac[(i, j)] / norms[j]);

    let svd = scaled.svd(false, true);
    let v_t = svd.v_t?;
    let s = &svd.singular_values;
    let s_max = s.iter().copied().fold(0.0, f64::max);
    if s.len() < n || s.iter().any(|&si| si <= RANK_RTOL * s_max) {
        return None;
    }

    // (JᵀJ)⁻¹ = D⁻¹ V S⁻² Vᵀ D⁻¹
    let inv = DMatrix::from_fn(n, n, |a, b| {
        let sum: f64 = (0..n).map(|k| v_t[(k, a)] * v_t[(k, b)] / (s[k] * s[k])).sum();
        sum / (norms[a] * norms[b])
    });
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}
