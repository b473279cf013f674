//! Shared domain types.
//!
//! These types are kept plain and serializable so a collaborator can:
//!
//! - hand in numeric arrays without depending on any table format
//! - store or print a `FitResult` without knowing how it was produced

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::Parameters;
use crate::error::FitError;

/// Basic algebraic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `m*x + b`
    Linear,
    /// `a*x^n + b`
    Power,
    /// `a*x^2 + b*x + c`
    Quadratic,
    /// `a*exp(-x/t) + b`
    Exponential,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Linear,
        ModelKind::Power,
        ModelKind::Quadratic,
        ModelKind::Exponential,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Power => "power",
            ModelKind::Quadratic => "quadratic",
            ModelKind::Exponential => "exponential",
        }
    }

    /// Parameter names in evaluation order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["m", "b"],
            ModelKind::Power => &["a", "n", "b"],
            ModelKind::Quadratic => &["a", "b", "c"],
            ModelKind::Exponential => &["a", "t", "b"],
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = FitError;

    /// Exact (case-insensitive) match on the model name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| FitError::UnknownModel(s.to_string()))
    }
}

/// Which deterministic minimizer drives a least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Levenberg-Marquardt on the residual vector.
    #[value(name = "leastsq")]
    LeastSquares,
    /// Downhill simplex on the sum of squares (no derivatives).
    #[value(name = "nelder")]
    NelderMead,
    /// Ensemble MCMC posterior sampling.
    #[value(skip)]
    Emcee,
}

impl Method {
    pub fn label(self) -> &'static str {
        match self {
            Method::LeastSquares => "leastsq",
            Method::NelderMead => "Nelder-Mead",
            Method::Emcee => "emcee",
        }
    }
}

/// Why a minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Residuals are zero to machine precision.
    ResidualsZero,
    /// Actual and predicted relative cost reduction both fell below `ftol`.
    CostConverged,
    /// Trust region shrank below `xtol` relative to the scaled parameters.
    StepConverged,
    /// Gradient is (numerically) orthogonal to the residuals (`gtol`).
    Orthogonal,
    /// No further progress at machine precision before any tolerance was
    /// met. The iterate is returned but not flagged as converged.
    NoImprovementPossible,
    /// Evaluation budget exhausted; the best iterate is returned.
    MaxEvaluations,
    /// Nothing to optimize (all parameters fixed).
    NoFreeParameters,
    /// Posterior sampling finished.
    Sampled,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        !matches!(
            self,
            Termination::MaxEvaluations | Termination::NoImprovementPossible
        )
    }
}

/// Chi-square based goodness-of-fit statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodnessOfFit {
    pub chisqr: f64,
    pub redchi: f64,
    pub bic: f64,
    pub aic: f64,
}

/// Outcome of a fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub parameters: Parameters,
    /// `None` for Bayesian fits.
    pub goodness_of_fit: Option<GoodnessOfFit>,
    pub report: String,
    pub method: Method,
    pub converged: bool,
    pub termination: Termination,
    pub nfev: usize,
    pub ndata: usize,
    pub nvarys: usize,
    /// Names of the varying parameters, in covariance order.
    pub var_names: Vec<String>,
    /// Covariance of the varying parameters, `None` when singular.
    pub covariance: Option<Vec<Vec<f64>>>,
}

impl FitResult {
    /// Point estimate of a named parameter.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).map(|p| p.value)
    }

    /// Standard error (or credible half-width) of a named parameter.
    pub fn stderr(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(|p| p.stderr)
    }

    /// Covariance entry between two varying parameters.
    pub fn covar(&self, a: &str, b: &str) -> Option<f64> {
        let cov = self.covariance.as_ref()?;
        let i = self.var_names.iter().position(|n| n == a)?;
        let j = self.var_names.iter().position(|n| n == b)?;
        Some(cov[i][j])
    }
}
