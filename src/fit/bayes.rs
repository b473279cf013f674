//! Bayesian fits by ensemble MCMC.
//!
//! Pipeline:
//! 1. a Nelder-Mead least-squares fit gives the starting estimate
//! 2. a nuisance parameter `f` scales a model-proportional noise term
//! 3. an affine-invariant ensemble (Goodman-Weare stretch move) samples the
//!    posterior under a uniform prior on the parameter bounds
//! 4. the maximum-likelihood sample becomes the point estimate; marginal
//!    percentiles give the credible intervals
//!
//! Walkers in one half of the ensemble are updated in parallel against the
//! frozen other half. Each walker owns its RNG (seeded from `seed + walker`),
//! so a chain is reproducible regardless of thread scheduling.

use std::f64::consts::PI;

use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::domain::{
    CredibleInterval, Dataset, FitResult, FixSpec, InitSpec, Method, ModelKind, Parameter,
    Parameters, Points, Termination,
};
use crate::error::FitError;
use crate::fit::chain::Chain;
use crate::fit::fitter::fit_basic;
use crate::fit::minimizer::MinimizerOptions;
use crate::report::ml_report;

/// Name of the noise-scaling nuisance parameter.
pub const NUISANCE: &str = "f";
const NUISANCE_MIN: f64 = 0.001;
const NUISANCE_MAX: f64 = 2.0;

/// Relative spread of the initial walker ball around the estimate.
const INIT_JITTER: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Leading iterations to discard.
    pub burn: usize,
    /// Total iterations, burn-in included.
    pub steps: usize,
    /// Keep every `thin`-th iteration after burn-in.
    pub thin: usize,
    /// Ensemble size; even and at least twice the number of sampled parameters.
    pub n_walkers: usize,
    pub seed: u64,
    /// Stretch-move scale `a`.
    pub stretch: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            burn: 300,
            steps: 1000,
            thin: 20,
            n_walkers: 100,
            seed: 42,
            stretch: 2.0,
        }
    }
}

impl SamplerConfig {
    /// Retained iterations per walker.
    pub fn retained(&self) -> usize {
        match self.thin {
            0 => 0,
            thin => self.steps.saturating_sub(self.burn) / thin,
        }
    }

    fn keeps(&self, step: usize) -> bool {
        step >= self.burn && (step - self.burn + 1) % self.thin == 0
    }

    pub fn validate(&self, ndim: usize) -> Result<(), FitError> {
        let invalid = |msg: String| Err(FitError::InvalidSamplerConfig(msg));
        if self.thin == 0 {
            return invalid("thin must be >= 1".into());
        }
        if self.burn >= self.steps {
            return invalid(format!("burn ({}) must be < steps ({})", self.burn, self.steps));
        }
        if self.retained() == 0 {
            return invalid(format!(
                "steps - burn ({}) is smaller than thin ({})",
                self.steps - self.burn,
                self.thin
            ));
        }
        if self.n_walkers % 2 != 0 {
            return invalid(format!("n_walkers ({}) must be even", self.n_walkers));
        }
        if self.n_walkers < 2 * ndim {
            return invalid(format!(
                "n_walkers ({}) must be at least twice the number of sampled parameters ({ndim})",
                self.n_walkers
            ));
        }
        if !(self.stretch.is_finite() && self.stretch > 1.0) {
            return invalid(format!("stretch ({}) must be > 1", self.stretch));
        }
        Ok(())
    }
}

/// Log-posterior of the sampled parameters (varying model parameters, then `f`).
struct Posterior<'a> {
    model: ModelKind,
    points: &'a Points,
    params: &'a Parameters,
}

impl Posterior<'_> {
    fn ln_prob(&self, theta: &[f64]) -> f64 {
        let in_bounds = self
            .params
            .iter()
            .filter(|p| p.vary)
            .zip(theta)
            .all(|(p, &v)| p.in_bounds(v));
        if !in_bounds {
            return f64::NEG_INFINITY;
        }

        let full = self.params.values_with_free(theta);
        let f = theta[theta.len() - 1];
        let mut acc = 0.0;
        for ((&x, &y), &w) in self.points.x.iter().zip(&self.points.y).zip(&self.points.w) {
            let m = self.model.eval(x, &full);
            let invvar = 1.0 / (1.0 / (w * w) + m * m * f * f);
            acc += (y - m).powi(2) * invvar - (invvar / (2.0 * PI)).ln();
        }
        let lnp = -0.5 * acc;
        if lnp.is_nan() { f64::NEG_INFINITY } else { lnp }
    }
}

struct Walker {
    pos: Vec<f64>,
    lnp: f64,
    rng: StdRng,
    accepted: usize,
}

impl Walker {
    /// One stretch move against a randomly chosen walker of the other half.
    fn stretch(&mut self, others: &[Walker], a: f64, post: &Posterior<'_>) {
        let u: f64 = self.rng.r#gen();
        let z = ((a - 1.0) * u + 1.0).powi(2) / a;
        let partner = &others[self.rng.gen_range(0..others.len())].pos;

        let proposal: Vec<f64> = partner
            .iter()
            .zip(&self.pos)
            .map(|(c, x)| c + z * (x - c))
            .collect();
        let lnp = post.ln_prob(&proposal);
        let log_ratio = (self.pos.len() as f64 - 1.0) * z.ln() + lnp - self.lnp;

        let r: f64 = self.rng.r#gen();
        if r.ln() < log_ratio {
            self.pos = proposal;
            self.lnp = lnp;
            self.accepted += 1;
        }
    }
}

fn half_step(active: &mut [Walker], others: &[Walker], a: f64, post: &Posterior<'_>) {
    active
        .par_iter_mut()
        .for_each(|w| w.stretch(others, a, post));
}

/// Run the ensemble sampler starting from a ball around `start`.
fn run_ensemble(post: &Posterior<'_>, start: &[f64], names: Vec<String>, cfg: &SamplerConfig) -> Chain {
    let varying: Vec<&Parameter> = post.params.iter().filter(|p| p.vary).collect();
    let mut walkers: Vec<Walker> = (0..cfg.n_walkers)
        .map(|k| {
            let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(k as u64));
            let pos: Vec<f64> = start
                .iter()
                .zip(&varying)
                .map(|(&v, p)| {
                    let n: f64 = rng.sample(StandardNormal);
                    let jittered = if v != 0.0 {
                        v * (1.0 + INIT_JITTER * n)
                    } else {
                        INIT_JITTER * n
                    };
                    if p.in_bounds(jittered) { jittered } else { v }
                })
                .collect();
            let lnp = post.ln_prob(&pos);
            Walker {
                pos,
                lnp,
                rng,
                accepted: 0,
            }
        })
        .collect();

    let ndim = start.len();
    let kept = cfg.retained();
    let mut samples: Vec<Vec<f64>> = vec![Vec::with_capacity(kept * ndim); cfg.n_walkers];
    let mut lnprob: Vec<Vec<f64>> = vec![Vec::with_capacity(kept); cfg.n_walkers];

    let half = cfg.n_walkers / 2;
    for step in 0..cfg.steps {
        let (red, blue) = walkers.split_at_mut(half);
        half_step(red, blue, cfg.stretch, post);
        half_step(blue, red, cfg.stretch, post);

        if cfg.keeps(step) {
            for (k, w) in walkers.iter().enumerate() {
                samples[k].extend_from_slice(&w.pos);
                lnprob[k].push(w.lnp);
            }
        }
        if (step + 1) % 100 == 0 {
            let best = walkers.iter().map(|w| w.lnp).fold(f64::NEG_INFINITY, f64::max);
            debug!("emcee: step {}/{} best lnprob={best:.6e}", step + 1, cfg.steps);
        }
    }

    let acceptance = walkers
        .iter()
        .map(|w| w.accepted as f64 / cfg.steps as f64)
        .collect();
    Chain::new(
        cfg.n_walkers,
        kept,
        names,
        samples.concat(),
        lnprob.concat(),
        acceptance,
    )
}

/// Posterior sampling fit of `model` to `data`.
///
/// Returns the maximum-likelihood `FitResult` together with the retained chain.
pub fn fit_bayesian(
    data: &Dataset,
    model: ModelKind,
    init: &InitSpec,
    fix: &FixSpec,
    cfg: &SamplerConfig,
) -> Result<(FitResult, Chain), FitError> {
    let estimate = fit_basic(
        data,
        model,
        init,
        fix,
        &MinimizerOptions::with_method(Method::NelderMead),
    )?;

    let mut params = estimate.parameters.clone();
    params.add(Parameter::new(NUISANCE, 1.0, Some(NUISANCE_MIN), Some(NUISANCE_MAX))?);
    let ndim = params.nvarys();
    cfg.validate(ndim)?;

    let points = data.usable();
    let post = Posterior {
        model,
        points: &points,
        params: &params,
    };
    let start: Vec<f64> = params.iter().filter(|p| p.vary).map(|p| p.value).collect();
    let chain = run_ensemble(&post, &start, params.var_names(), cfg);

    let (w, s) = chain.argmax_lnprob().ok_or_else(|| {
        FitError::InvalidSamplerConfig("chain has no finite log-probability".into())
    })?;
    let best = chain.sample(w, s).to_vec();
    info!(
        "emcee: {} walkers, {} retained steps, mean acceptance {:.3}, max lnprob {:.6e}",
        chain.n_walkers,
        chain.n_steps,
        chain.mean_acceptance(),
        chain.lnprob(w, s)
    );

    let mut fitted = params.clone();
    let mut k = 0;
    for p in fitted.iter_mut() {
        p.stderr = None;
        p.credible = None;
        if p.vary {
            let q = chain.percentiles(k, &CredibleInterval::PERCENTILES);
            let ci = CredibleInterval::from_percentiles([q[0], q[1], q[2], q[3], q[4]]);
            p.value = best[k];
            p.stderr = Some(ci.half_width());
            p.credible = Some(ci);
            k += 1;
        }
    }

    let mut result = FitResult {
        parameters: fitted,
        goodness_of_fit: None,
        report: String::new(),
        method: Method::Emcee,
        converged: true,
        termination: Termination::Sampled,
        nfev: estimate.nfev + cfg.n_walkers * (cfg.steps + 1),
        ndata: points.len(),
        nvarys: ndim,
        var_names: params.var_names(),
        covariance: Some(sample_covariance(&chain)),
    };
    result.report = ml_report(&result);
    Ok((result, chain))
}

/// Covariance of the flattened chain.
fn sample_covariance(chain: &Chain) -> Vec<Vec<f64>> {
    let ndim = chain.ndim();
    let cols: Vec<Vec<f64>> = (0..ndim).map(|p| chain.flat_param(p)).collect();
    let n = chain.len() as f64;
    let means: Vec<f64> = cols.iter().map(|c| c.iter().sum::<f64>() / n).collect();
    let denom = (n - 1.0).max(1.0);
    (0..ndim)
        .map(|i| {
            (0..ndim)
                .map(|j| {
                    cols[i]
                        .iter()
                        .zip(&cols[j])
                        .map(|(a, b)| (a - means[i]) * (b - means[j]))
                        .sum::<f64>()
                        / denom
                })
                .collect()
        })
        .collect()
}
