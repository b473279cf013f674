//! Model evaluation for the basic algebraic models.
//!
//! Each model is a pure function `f(x, params)`; `params` follows the order of
//! `ModelKind::param_names`.

use crate::domain::ModelKind;

/// `m*x + b`
pub fn linear(x: f64, m: f64, b: f64) -> f64 {
    m * x + b
}

/// `a*x^n + b`
pub fn power(x: f64, a: f64, n: f64, b: f64) -> f64 {
    a * x.powf(n) + b
}

/// `a*x^2 + b*x + c`
pub fn quadratic(x: f64, a: f64, b: f64, c: f64) -> f64 {
    a * x * x + b * x + c
}

/// `a*exp(-x/t) + b`
pub fn exponential(x: f64, a: f64, t: f64, b: f64) -> f64 {
    a * (-x / t).exp() + b
}

impl ModelKind {
    /// Evaluate the model at `x`.
    ///
    /// # Panics
    /// Panics if `params` is shorter than `self.param_names().len()`.
    pub fn eval(self, x: f64, params: &[f64]) -> f64 {
        match self {
            ModelKind::Linear => linear(x, params[0], params[1]),
            ModelKind::Power => power(x, params[0], params[1], params[2]),
            ModelKind::Quadratic => quadratic(x, params[0], params[1], params[2]),
            ModelKind::Exponential => exponential(x, params[0], params[1], params[2]),
        }
    }

    /// Evaluate over a slice of `x`.
    pub fn eval_all(self, x: &[f64], params: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.eval(xi, params)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_match_closed_forms() {
        assert_eq!(ModelKind::Linear.eval(2.0, &[3.0, 1.0]), 7.0);
        assert_eq!(ModelKind::Power.eval(4.0, &[2.0, 0.5, 1.0]), 5.0);
        assert_eq!(ModelKind::Quadratic.eval(2.0, &[1.0, -1.0, 3.0]), 5.0);
        let e = ModelKind::Exponential.eval(2.0, &[3.0, 2.0, 1.0]);
        assert!((e - (3.0 * (-1.0f64).exp() + 1.0)).abs() < 1e-15);
    }

    #[test]
    fn param_counts_match_names() {
        for kind in ModelKind::ALL {
            let p = vec![1.0; kind.param_names().len()];
            assert!(kind.eval(1.0, &p).is_finite(), "{kind}");
        }
    }
}
