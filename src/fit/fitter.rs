//! Weighted least-squares fits of the basic models.
//!
//! Given:
//! - a `Dataset` (`x`, `y`, optional `dy`)
//! - a model tag and optional starting values / fixed values
//!
//! we:
//! - keep the usable points (finite, nonzero weight)
//! - build starting values from the data where none were given
//! - minimize the weighted residual `(y - f(x)) / dy`
//!
//! and return estimates, standard errors and goodness-of-fit statistics.

use log::info;

use crate::domain::{Dataset, FitResult, FixSpec, InitSpec, ModelKind, ParamInit, Parameter, Parameters};
use crate::error::FitError;
use crate::fit::bayes::{SamplerConfig, fit_bayesian};
use crate::fit::chain::Chain;
use crate::fit::minimizer::{MinimizerOptions, least_squares};
use crate::fit::residual::weighted_residual;
use crate::models::init_pars;

/// How `fit` should estimate the parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FitMode {
    /// Deterministic minimization only.
    LeastSquares(MinimizerOptions),
    /// Least-squares start followed by posterior sampling.
    Bayesian(SamplerConfig),
}

impl Default for FitMode {
    fn default() -> Self {
        FitMode::LeastSquares(MinimizerOptions::default())
    }
}

/// Result of `fit`: the estimate plus the chain when one was sampled.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub result: FitResult,
    pub chain: Option<Chain>,
}

/// Fit a basic model by name.
///
/// The model name is resolved before the arrays are looked at, so an unknown
/// name fails with `FitError::UnknownModel` regardless of the data.
pub fn fit(
    x: &[f64],
    y: &[f64],
    dy: Option<&[f64]>,
    model: &str,
    init: &InitSpec,
    fix: &FixSpec,
    mode: &FitMode,
) -> Result<FitOutput, FitError> {
    let model: ModelKind = model.parse()?;
    let data = Dataset::from_slices(x, y, dy)?;
    match mode {
        FitMode::LeastSquares(opts) => Ok(FitOutput {
            result: fit_basic(&data, model, init, fix, opts)?,
            chain: None,
        }),
        FitMode::Bayesian(cfg) => {
            let (result, chain) = fit_bayesian(&data, model, init, fix, cfg)?;
            Ok(FitOutput {
                result,
                chain: Some(chain),
            })
        }
    }
}

/// Weighted least-squares fit of `model` to `data`.
pub fn fit_basic(
    data: &Dataset,
    model: ModelKind,
    init: &InitSpec,
    fix: &FixSpec,
    opts: &MinimizerOptions,
) -> Result<FitResult, FitError> {
    let points = data.usable();
    let params = build_params(model, init, fix, &points.x, &points.y)?;
    check_enough_points(points.len(), &params)?;

    let result = least_squares(weighted_residual(model, &points), &params, opts)?;
    info!(
        "{model} fit: {} points, {} free, chisqr={:.6e}, converged={}",
        result.ndata,
        result.nvarys,
        result.goodness_of_fit.map_or(f64::NAN, |g| g.chisqr),
        result.converged
    );
    Ok(result)
}

/// Starting parameters with `fix` applied on top of the initial values.
///
/// Fixed names bypass both the heuristics and any bounds given in `init`.
pub(crate) fn build_params(
    model: ModelKind,
    init: &InitSpec,
    fix: &FixSpec,
    x: &[f64],
    y: &[f64],
) -> Result<Parameters, FitError> {
    let mut start = init.clone();
    for (name, &value) in fix {
        start.insert(name.clone(), ParamInit::new(value));
    }
    let mut params = init_pars(model, &start, x, y)?;
    for (name, &value) in fix {
        params.add(Parameter::fixed(name.clone(), value));
    }
    Ok(params)
}

pub(crate) fn check_enough_points(usable: usize, params: &Parameters) -> Result<(), FitError> {
    let required = params.nvarys().max(1);
    if usable < required {
        return Err(FitError::InsufficientData { usable, required });
    }
    Ok(())
}
