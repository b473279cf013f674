//! Single-mode Maxwell model.
//!
//! ```text
//! G'(ω)  = η λ ω² / (1 + ω² λ²)
//! G''(ω) = η ω / (1 + ω² λ²)
//! ```
//!
//! Both moduli are fitted jointly by stacking their residuals. The plateau
//! modulus `gp = η / λ` is reported as a derived, non-varying parameter.

use log::info;

use crate::domain::{FitResult, Parameter, Parameters};
use crate::error::FitError;
use crate::fit::minimizer::{MinimizerOptions, least_squares};
use crate::report::fit_report;
use crate::rheo::MaxwellData;

pub fn storage_modulus(omega: f64, eta: f64, lmbd: f64) -> f64 {
    eta * lmbd * omega * omega / (1.0 + omega * omega * lmbd * lmbd)
}

pub fn loss_modulus(omega: f64, eta: f64, lmbd: f64) -> f64 {
    eta * omega / (1.0 + omega * omega * lmbd * lmbd)
}

#[derive(Debug, Clone)]
pub struct Maxwell {
    data: MaxwellData,
    omega_max: f64,
}

impl Maxwell {
    /// Samples with `ω >= omega_max` are excluded from the fit.
    pub fn new(data: MaxwellData, omega_max: f64) -> Self {
        Self { data, omega_max }
    }

    fn initial_params() -> Result<Parameters, FitError> {
        let mut p = Parameters::new();
        p.add(Parameter::new("eta", 1.0, Some(0.0), None)?);
        p.add(Parameter::new("lmbd", 10.0, Some(0.0), None)?);
        Ok(p)
    }

    pub fn fit(&self, opts: &MinimizerOptions) -> Result<FitResult, FitError> {
        let d = &self.data;
        let idx = d.indices(|i| d.omega[i] < self.omega_max);
        let omega: Vec<f64> = idx.iter().map(|&i| d.omega[i]).collect();
        let gs: Vec<f64> = idx.iter().map(|&i| d.g_storage[i]).collect();
        let gl: Vec<f64> = idx.iter().map(|&i| d.g_loss[i]).collect();

        // [G' residuals..., G'' residuals...]
        let residual = |p: &[f64]| -> Vec<f64> {
            let (eta, lmbd) = (p[0], p[1]);
            let storage = omega
                .iter()
                .zip(&gs)
                .map(|(&w, &g)| g - storage_modulus(w, eta, lmbd));
            let loss = omega
                .iter()
                .zip(&gl)
                .map(|(&w, &g)| g - loss_modulus(w, eta, lmbd));
            storage.chain(loss).collect()
        };

        let mut result = least_squares(residual, &Self::initial_params()?, opts)?;
        let gp = plateau_modulus(&result);
        info!(
            "Maxwell fit on {} frequencies: eta={:.6e}, lambda={:.6e}, gp={:.6e}",
            omega.len(),
            result.value("eta").unwrap_or(f64::NAN),
            result.value("lmbd").unwrap_or(f64::NAN),
            gp.value
        );
        result.parameters.add(gp);
        result.report = fit_report(&result);
        Ok(result)
    }

    /// `(G', G'')` of a fitted model at `omega`.
    pub fn predict(fit: &FitResult, omega: f64) -> Option<(f64, f64)> {
        let eta = fit.value("eta")?;
        let lmbd = fit.value("lmbd")?;
        Some((
            storage_modulus(omega, eta, lmbd),
            loss_modulus(omega, eta, lmbd),
        ))
    }
}

/// `gp = η/λ` with first-order error propagation including the η-λ covariance.
fn plateau_modulus(fit: &FitResult) -> Parameter {
    let eta = fit.value("eta").unwrap_or(f64::NAN);
    let lmbd = fit.value("lmbd").unwrap_or(f64::NAN);
    let mut gp = Parameter::fixed("gp", eta / lmbd);
    gp.stderr = match (
        fit.covar("eta", "eta"),
        fit.covar("lmbd", "lmbd"),
        fit.covar("eta", "lmbd"),
    ) {
        (Some(v_eta), Some(v_lmbd), Some(c)) => {
            let d_eta = 1.0 / lmbd;
            let d_lmbd = -eta / (lmbd * lmbd);
            let var = d_eta * d_eta * v_eta + d_lmbd * d_lmbd * v_lmbd + 2.0 * d_eta * d_lmbd * c;
            Some(var.max(0.0).sqrt())
        }
        _ => None,
    };
    gp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(eta: f64, lmbd: f64, noise: &[f64]) -> MaxwellData {
        let omega: Vec<f64> = (0..30).map(|i| 0.05 * 10f64.powf(i as f64 / 11.0)).collect();
        let gs = omega
            .iter()
            .enumerate()
            .map(|(i, &w)| storage_modulus(w, eta, lmbd) * (1.0 + noise[i % noise.len()]))
            .collect();
        let gl = omega
            .iter()
            .enumerate()
            .map(|(i, &w)| loss_modulus(w, eta, lmbd) * (1.0 - noise[(i + 1) % noise.len()]))
            .collect();
        MaxwellData::new(omega, gs, gl).unwrap()
    }

    #[test]
    fn recovers_viscosity_relaxation_time_and_plateau() {
        let data = sweep(20.0, 2.0, &[0.0]);
        let fit = Maxwell::new(data, f64::INFINITY)
            .fit(&MinimizerOptions::default())
            .unwrap();

        assert!(fit.converged);
        assert!((fit.value("eta").unwrap() - 20.0).abs() < 1e-6);
        assert!((fit.value("lmbd").unwrap() - 2.0).abs() < 1e-6);
        assert!((fit.value("gp").unwrap() - 10.0).abs() < 1e-6);
        assert!(!fit.parameters.get("gp").unwrap().vary);
        assert_eq!(fit.ndata, 60);
        assert!(fit.report.contains("gp:"));
    }

    #[test]
    fn plateau_stderr_includes_covariance() {
        let data = sweep(20.0, 2.0, &[0.02, -0.01, 0.015, -0.03, 0.005]);
        let fit = Maxwell::new(data, f64::INFINITY)
            .fit(&MinimizerOptions::default())
            .unwrap();

        let (eta, lmbd) = (fit.value("eta").unwrap(), fit.value("lmbd").unwrap());
        let v_eta = fit.covar("eta", "eta").unwrap();
        let v_lmbd = fit.covar("lmbd", "lmbd").unwrap();
        let c = fit.covar("eta", "lmbd").unwrap();
        let expected = (v_eta / (lmbd * lmbd) + v_lmbd * eta * eta / lmbd.powi(4)
            - 2.0 * c * eta / lmbd.powi(3))
        .sqrt();
        let got = fit.stderr("gp").unwrap();
        assert!((got - expected).abs() <= 1e-12 * expected.max(1.0), "{got} vs {expected}");
        assert!((fit.value("gp").unwrap() - eta / lmbd).abs() < 1e-12);
    }

    #[test]
    fn frequency_cutoff_drops_high_omega() {
        let data = sweep(20.0, 2.0, &[0.0]);
        let n_low = data.omega.iter().filter(|&&w| w < 5.0).count();
        let fit = Maxwell::new(data, 5.0).fit(&MinimizerOptions::default()).unwrap();
        assert_eq!(fit.ndata, 2 * n_low);

        let (gs, gl) = Maxwell::predict(&fit, 0.5).unwrap();
        assert!((gs - storage_modulus(0.5, 20.0, 2.0)).abs() < 1e-6);
        assert!((gl - loss_modulus(0.5, 20.0, 2.0)).abs() < 1e-6);
    }
}
