//! Named, optionally bounded fit parameters.
//!
//! Minimizers work in an unbounded "internal" space. Each bounded parameter is
//! mapped to it with the transforms used by MINUIT/lmfit:
//!
//! - two bounds: `v = min + (sin(u) + 1) * (max - min) / 2`
//! - lower only: `v = min - 1 + sqrt(u^2 + 1)`
//! - upper only: `v = max + 1 - sqrt(u^2 + 1)`
//!
//! so any internal value maps to a value inside the bounds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Caller-supplied starting value with optional bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamInit {
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParamInit {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            min: None,
            max: None,
        }
    }

    pub fn bounded(value: f64, min: Option<f64>, max: Option<f64>) -> Self {
        Self { value, min, max }
    }

    /// The same init with `value` moved onto the nearest bound when outside.
    pub fn clamped(self) -> Self {
        let mut value = self.value;
        if let Some(lo) = self.min {
            value = value.max(lo);
        }
        if let Some(hi) = self.max {
            value = value.min(hi);
        }
        Self { value, ..self }
    }
}

/// Initial values keyed by parameter name.
pub type InitSpec = BTreeMap<String, ParamInit>;

/// Values to hold constant, keyed by parameter name.
pub type FixSpec = BTreeMap<String, f64>;

/// Percentiles of a parameter's marginal posterior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibleInterval {
    pub p02_28: f64,
    pub p15_9: f64,
    pub p50: f64,
    pub p84_2: f64,
    pub p97_7: f64,
}

impl CredibleInterval {
    pub const PERCENTILES: [f64; 5] = [2.28, 15.9, 50.0, 84.2, 97.7];

    pub fn from_percentiles(q: [f64; 5]) -> Self {
        Self {
            p02_28: q[0],
            p15_9: q[1],
            p50: q[2],
            p84_2: q[3],
            p97_7: q[4],
        }
    }

    /// Half the 15.9–84.2 percentile distance (a 1-sigma proxy).
    pub fn half_width(&self) -> f64 {
        0.5 * (self.p84_2 - self.p15_9)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub vary: bool,
    pub init_value: f64,
    pub stderr: Option<f64>,
    pub credible: Option<CredibleInterval>,
}

impl Parameter {
    /// A varying parameter; fails if `value` is not inside `[min, max]`.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self, FitError> {
        let p = Self {
            name: name.into(),
            value,
            min,
            max,
            vary: true,
            init_value: value,
            stderr: None,
            credible: None,
        };
        p.check_bounds(value)?;
        Ok(p)
    }

    /// A parameter held at `value`.
    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min: None,
            max: None,
            vary: false,
            init_value: value,
            stderr: None,
            credible: None,
        }
    }

    pub fn in_bounds(&self, v: f64) -> bool {
        v.is_finite() && self.min.is_none_or(|lo| v >= lo) && self.max.is_none_or(|hi| v <= hi)
    }

    fn check_bounds(&self, v: f64) -> Result<(), FitError> {
        let inverted = matches!((self.min, self.max), (Some(lo), Some(hi)) if lo > hi);
        if inverted || !self.in_bounds(v) {
            return Err(FitError::InvalidBounds {
                name: self.name.clone(),
                value: v,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub(crate) fn to_internal(&self, v: f64) -> f64 {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if hi > lo => {
                (2.0 * (v - lo) / (hi - lo) - 1.0).clamp(-1.0, 1.0).asin()
            }
            (Some(_), Some(_)) => 0.0,
            (Some(lo), None) => ((v - lo + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (None, Some(hi)) => ((hi - v + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (None, None) => v,
        }
    }

    pub(crate) fn from_internal(&self, u: f64) -> f64 {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => lo + (u.sin() + 1.0) * (hi - lo) / 2.0,
            (Some(lo), None) => lo - 1.0 + (u * u + 1.0).sqrt(),
            (None, Some(hi)) => hi + 1.0 - (u * u + 1.0).sqrt(),
            (None, None) => u,
        }
    }

    /// `dv/du` at internal value `u`.
    pub(crate) fn internal_scale(&self, u: f64) -> f64 {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => u.cos() * (hi - lo) / 2.0,
            (Some(_), None) => u / (u * u + 1.0).sqrt(),
            (None, Some(_)) => -u / (u * u + 1.0).sqrt(),
            (None, None) => 1.0,
        }
    }
}

/// Ordered set of uniquely named parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a parameter, replacing an existing one of the same name in place.
    pub fn add(&mut self, param: Parameter) {
        match self.0.iter_mut().find(|p| p.name == param.name) {
            Some(slot) => *slot = param,
            None => self.0.push(param),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.0.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|p| p.name.clone()).collect()
    }

    /// Number of parameters that take part in optimization.
    pub fn nvarys(&self) -> usize {
        self.0.iter().filter(|p| p.vary).count()
    }

    pub fn var_names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|p| p.vary)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Current values of all parameters, in order.
    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.value).collect()
    }

    /// Internal-space starting point for the varying parameters.
    pub(crate) fn internal_start(&self) -> Vec<f64> {
        self.0
            .iter()
            .filter(|p| p.vary)
            .map(|p| p.to_internal(p.value))
            .collect()
    }

    /// Full value vector with the varying parameters taken from internal `u`.
    pub(crate) fn values_from_internal(&self, u: &[f64]) -> Vec<f64> {
        let mut k = 0;
        self.0
            .iter()
            .map(|p| {
                if p.vary {
                    let v = p.from_internal(u[k]);
                    k += 1;
                    v
                } else {
                    p.value
                }
            })
            .collect()
    }

    /// Full value vector with the varying parameters replaced by `free`.
    pub(crate) fn values_with_free(&self, free: &[f64]) -> Vec<f64> {
        let mut k = 0;
        self.0
            .iter()
            .map(|p| {
                if p.vary {
                    k += 1;
                    free[k - 1]
                } else {
                    p.value
                }
            })
            .collect()
    }

    /// `dv/du` for each varying parameter at internal `u`.
    pub(crate) fn internal_scales(&self, u: &[f64]) -> Vec<f64> {
        self.0
            .iter()
            .filter(|p| p.vary)
            .zip(u)
            .map(|(p, &ui)| p.internal_scale(ui))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
