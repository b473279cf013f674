//! Posterior chain storage.

use serde::{Deserialize, Serialize};

use crate::math::percentiles;

/// Retained ensemble samples, indexed by `(walker, step, parameter)`.
///
/// Storage is walker-major: all steps of walker 0, then walker 1, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub n_walkers: usize,
    /// Retained steps per walker (after burn-in and thinning).
    pub n_steps: usize,
    /// Names of the sampled parameters, in sample order.
    pub names: Vec<String>,
    samples: Vec<f64>,
    lnprob: Vec<f64>,
    /// Fraction of accepted proposals per walker over all iterations.
    pub acceptance: Vec<f64>,
}

impl Chain {
    pub(crate) fn new(
        n_walkers: usize,
        n_steps: usize,
        names: Vec<String>,
        samples: Vec<f64>,
        lnprob: Vec<f64>,
        acceptance: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(samples.len(), n_walkers * n_steps * names.len());
        debug_assert_eq!(lnprob.len(), n_walkers * n_steps);
        Self {
            n_walkers,
            n_steps,
            names,
            samples,
            lnprob,
            acceptance,
        }
    }

    pub fn ndim(&self) -> usize {
        self.names.len()
    }

    /// Number of retained samples across all walkers.
    pub fn len(&self) -> usize {
        self.n_walkers * self.n_steps
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Value of parameter `p` for walker `w` at retained step `s`.
    pub fn get(&self, w: usize, s: usize, p: usize) -> f64 {
        self.samples[(w * self.n_steps + s) * self.ndim() + p]
    }

    /// Full parameter vector for walker `w` at retained step `s`.
    pub fn sample(&self, w: usize, s: usize) -> &[f64] {
        let start = (w * self.n_steps + s) * self.ndim();
        &self.samples[start..start + self.ndim()]
    }

    pub fn lnprob(&self, w: usize, s: usize) -> f64 {
        self.lnprob[w * self.n_steps + s]
    }

    /// All retained values of parameter `p`, walker-major.
    pub fn flat_param(&self, p: usize) -> Vec<f64> {
        self.samples
            .chunks_exact(self.ndim())
            .map(|row| row[p])
            .collect()
    }

    pub fn flat_lnprob(&self) -> &[f64] {
        &self.lnprob
    }

    /// `(walker, step)` of the highest log-probability sample.
    ///
    /// Ties keep the first occurrence. Non-finite entries (NaN, or `-inf`
    /// outside the prior support) are never selected, so a chain without a
    /// finite log-probability yields `None`.
    pub fn argmax_lnprob(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &lp) in self.lnprob.iter().enumerate() {
            if !lp.is_finite() {
                continue;
            }
            if best.is_none_or(|(_, b)| lp > b) {
                best = Some((i, lp));
            }
        }
        best.map(|(i, _)| (i / self.n_steps, i % self.n_steps))
    }

    /// Percentiles `qs` (0..=100) of parameter `p`'s flattened marginal.
    pub fn percentiles(&self, p: usize, qs: &[f64]) -> Vec<f64> {
        percentiles(&self.flat_param(p), qs)
    }

    pub fn mean_acceptance(&self) -> f64 {
        if self.acceptance.is_empty() {
            return 0.0;
        }
        self.acceptance.iter().sum::<f64>() / self.acceptance.len() as f64
    }
}
