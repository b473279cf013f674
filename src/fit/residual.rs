//! Residual construction.

use crate::domain::{ModelKind, Points};

/// `(y - f(x; p)) * w` for every usable point.
pub fn weighted_residual(model: ModelKind, points: &Points) -> impl Fn(&[f64]) -> Vec<f64> + '_ {
    move |p: &[f64]| {
        points
            .x
            .iter()
            .zip(&points.y)
            .zip(&points.w)
            .map(|((&x, &y), &w)| (y - model.eval(x, p)) * w)
            .collect()
    }
}

/// `(data - model) / data`, the relative residual used for the Cole-Cole arc.
pub fn relative_residual<'a>(
    x: &'a [f64],
    data: &'a [f64],
    f: impl Fn(f64, &[f64]) -> f64 + 'a,
) -> impl Fn(&[f64]) -> Vec<f64> + 'a {
    move |p: &[f64]| {
        x.iter()
            .zip(data)
            .map(|(&xi, &di)| (di - f(xi, p)) / di)
            .collect()
    }
}
