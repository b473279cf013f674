//! Cole-Cole representation: `G''` plotted against `G'`.
//!
//! A single Maxwell mode traces a semicircle
//!
//! ```text
//! G'' = sqrt(|G'² - gosc·G'|)
//! ```
//!
//! whose diameter `gosc` is fitted; the apex height `gmax` is read off the
//! data. Optionally, the low-`G''` tail at high frequency is extrapolated
//! linearly to its `G''=0` intercept `g0`.

use log::info;

use crate::domain::{Dataset, FitResult, FixSpec, InitSpec, ModelKind, ParamInit, Parameter, Parameters};
use crate::error::FitError;
use crate::fit::fitter::fit_basic;
use crate::fit::minimizer::{MinimizerOptions, least_squares};
use crate::fit::residual::relative_residual;
use crate::report::fit_report;
use crate::rheo::MaxwellData;

/// Semicircle of diameter `gosc` evaluated at storage modulus `g_storage`.
pub fn arc(g_storage: f64, gosc: f64) -> f64 {
    (g_storage * g_storage - gosc * g_storage).abs().sqrt()
}

#[derive(Debug, Clone)]
pub struct ColeCole {
    data: MaxwellData,
    omega_max: f64,
    gpmax: f64,
}

impl ColeCole {
    /// `omega_max` bounds `G'/G''max` of the samples entering the arc fit;
    /// `gpmax` bounds the frequencies searched for `G''max`.
    pub fn new(data: MaxwellData, omega_max: f64, gpmax: f64) -> Self {
        Self {
            data,
            omega_max,
            gpmax,
        }
    }

    /// Largest finite `G''` among samples with `ω < gpmax`.
    fn loss_peak(&self) -> Option<f64> {
        let d = &self.data;
        d.indices(|i| d.omega[i] < self.gpmax && d.g_loss[i].is_finite())
            .into_iter()
            .map(|i| d.g_loss[i])
            .reduce(f64::max)
    }

    /// Fit the arc; with `fit_g0`, also fit the line through the samples with
    /// `g0_range.0 < ω < g0_range.1` and report its intercept `g0` and slope
    /// `gslp` as derived parameters.
    pub fn fit(
        &self,
        fit_g0: bool,
        g0_range: (f64, f64),
        opts: &MinimizerOptions,
    ) -> Result<FitResult, FitError> {
        let d = &self.data;
        let gpp_max = self
            .loss_peak()
            .ok_or(FitError::InsufficientData { usable: 0, required: 1 })?;

        let mut params = Parameters::new();
        params.add(Parameter::new("gosc", 2.0 * gpp_max, Some(0.0), None)?);
        params.add(Parameter::fixed("gmax", gpp_max));

        let idx = d.indices(|i| d.g_storage[i] / gpp_max < self.omega_max);
        let gs: Vec<f64> = idx.iter().map(|&i| d.g_storage[i]).collect();
        let gl: Vec<f64> = idx.iter().map(|&i| d.g_loss[i]).collect();
        let residual = relative_residual(&gs, &gl, |x, p| arc(x, p[0]));

        let mut result = least_squares(residual, &params, opts)?;
        let gosc = result.value("gosc").unwrap_or(f64::NAN);
        info!("Cole-Cole fit on {} samples: gosc={gosc:.6e}, gmax={gpp_max:.6e}", result.ndata);

        if fit_g0 {
            let (lo, hi) = g0_range;
            let tail = Dataset::from_slices(&d.g_storage, &d.g_loss, None)?
                .select(|i| lo < d.omega[i] && d.omega[i] < hi);
            let (g0, gslp) = extrapolate_intercept(&tail, gosc, opts)?;
            info!("Cole-Cole intercept: g0={:.6e}, slope={:.6e}", g0.value, gslp.value);
            result.parameters.add(g0);
            result.parameters.add(gslp);
        }
        result.report = fit_report(&result);
        Ok(result)
    }

    /// `G''` on the fitted semicircle at storage modulus `g_storage`.
    pub fn curve(fit: &FitResult, g_storage: f64) -> Option<f64> {
        Some(arc(g_storage, fit.value("gosc")?))
    }
}

/// Linear fit `G'' = m G' + b` of the tail, returning `g0 = -b/m` and
/// `gslp = m` with propagated standard errors.
fn extrapolate_intercept(
    tail: &Dataset,
    gosc: f64,
    opts: &MinimizerOptions,
) -> Result<(Parameter, Parameter), FitError> {
    let mut init = InitSpec::new();
    init.insert("m".into(), ParamInit::bounded(-gosc / 2.0, None, Some(0.0)));
    init.insert("b".into(), ParamInit::bounded(2.0 * gosc, Some(0.0), None));
    let line = fit_basic(tail, ModelKind::Linear, &init, &FixSpec::new(), opts)?;

    let m = line.value("m").unwrap_or(f64::NAN);
    let b = line.value("b").unwrap_or(f64::NAN);
    let sm = line.stderr("m").unwrap_or(0.0);
    let sb = line.stderr("b").unwrap_or(0.0);

    let mut g0 = Parameter::fixed("g0", -b / m);
    g0.stderr = Some(((sb / m).powi(2) + (b * sm / (m * m)).powi(2)).sqrt());
    let mut gslp = Parameter::fixed("gslp", m);
    gslp.stderr = Some(sm);
    Ok((g0, gslp))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on a semicircle of diameter 10 at ω = 1..=14.
    fn arc_samples() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let gs: Vec<f64> = (0..14).map(|k| 0.5 + 0.7 * k as f64).collect();
        let gl: Vec<f64> = gs.iter().map(|&g| arc(g, 10.0)).collect();
        let omega: Vec<f64> = (1..=14).map(f64::from).collect();
        (omega, gs, gl)
    }

    #[test]
    fn recovers_diameter_and_peak() {
        let (omega, gs, gl) = arc_samples();
        let peak = gl.iter().copied().fold(f64::MIN, f64::max);
        let data = MaxwellData::new(omega, gs, gl).unwrap();

        let fit = ColeCole::new(data, f64::INFINITY, f64::INFINITY)
            .fit(false, (0.0, 200.0), &MinimizerOptions::default())
            .unwrap();

        assert!((fit.value("gosc").unwrap() - 10.0).abs() < 1e-6);
        assert_eq!(fit.value("gmax").unwrap(), peak);
        assert!(!fit.parameters.get("gmax").unwrap().vary);
        assert!(fit.parameters.get("g0").is_none());
        assert!((ColeCole::curve(&fit, 5.0).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn peak_search_respects_frequency_mask() {
        let (omega, gs, gl) = arc_samples();
        // Only ω < 5 (the first four, still rising, samples) are searched.
        let expected = gl[3];
        let data = MaxwellData::new(omega, gs, gl).unwrap();
        let fit = ColeCole::new(data, f64::INFINITY, 5.0)
            .fit(false, (0.0, 200.0), &MinimizerOptions::default())
            .unwrap();
        assert_eq!(fit.value("gmax").unwrap(), expected);
    }

    #[test]
    fn no_sample_below_gpmax_is_insufficient_data() {
        let (omega, gs, gl) = arc_samples();
        let data = MaxwellData::new(omega, gs, gl).unwrap();
        let err = ColeCole::new(data, f64::INFINITY, 0.5)
            .fit(false, (0.0, 200.0), &MinimizerOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn intercept_from_linear_tail() {
        let (mut omega, mut gs, mut gl) = arc_samples();
        // Tail G'' = -0.5 G' + 8 at ω = 101..=110, G' = 10..14.5.
        for k in 0..10 {
            let g = 10.0 + 0.5 * k as f64;
            omega.push(101.0 + k as f64);
            gs.push(g);
            gl.push(-0.5 * g + 8.0);
        }
        let data = MaxwellData::new(omega, gs, gl).unwrap();

        // G'/G''max < 1.95 keeps the arc samples and drops the tail.
        let fit = ColeCole::new(data, 1.95, f64::INFINITY)
            .fit(true, (100.0, 200.0), &MinimizerOptions::default())
            .unwrap();

        assert_eq!(fit.ndata, 14);
        assert!((fit.value("gosc").unwrap() - 10.0).abs() < 1e-6);
        assert!((fit.value("g0").unwrap() - 16.0).abs() < 1e-6);
        assert!((fit.value("gslp").unwrap() + 0.5).abs() < 1e-6);

        let gslp = fit.parameters.get("gslp").unwrap();
        assert!(!gslp.vary);
        // Exact line: the slope error is its own (vanishing) error, not the intercept.
        assert!(gslp.stderr.unwrap() < 1e-6);
        assert!(fit.stderr("g0").unwrap().is_finite());
    }
}
