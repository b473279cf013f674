//! Steady-shear flow curve `η(γ̇)`.
//!
//! The zero-shear viscosity `eta0` is read off the Newtonian plateau: the mean
//! of `η` over a window in shear rate and viscosity, with the spread of the
//! window as its error. Shear rates at or below `MIN_SHEAR_RATE` are dropped
//! first since the rheometer torque there is unreliable.

use log::info;

use crate::domain::Parameter;
use crate::error::FitError;

pub const MIN_SHEAR_RATE: f64 = 0.01;

/// `eta0 ± d_eta0` from the samples with `gp_range.0 < γ̇ < gp_range.1` and
/// `eta_range.0 < η < eta_range.1` (both open).
///
/// The error is the population standard deviation of the window. NaN samples
/// never fall inside a window.
pub fn zero_shear_viscosity(
    shear_rate: &[f64],
    eta: &[f64],
    gp_range: (f64, f64),
    eta_range: (f64, f64),
) -> Result<Parameter, FitError> {
    if shear_rate.len() != eta.len() {
        return Err(FitError::DimensionMismatch {
            x: shear_rate.len(),
            y: eta.len(),
            dy: None,
        });
    }

    let window: Vec<f64> = shear_rate
        .iter()
        .zip(eta)
        .filter(|&(&gp, &v)| {
            gp > MIN_SHEAR_RATE
                && gp > gp_range.0
                && gp < gp_range.1
                && v > eta_range.0
                && v < eta_range.1
        })
        .map(|(_, &v)| v)
        .collect();
    if window.is_empty() {
        return Err(FitError::InsufficientData {
            usable: 0,
            required: 1,
        });
    }

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let std = (window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    info!(
        "Zero-shear viscosity from {} samples: eta0={mean:.6e} +/- {std:.3e}",
        window.len()
    );

    let mut eta0 = Parameter::fixed("eta0", mean);
    eta0.stderr = Some(std);
    Ok(eta0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plateau at 12 Pa s up to 0.5 1/s, shear thinning beyond.
    fn flow_curve() -> (Vec<f64>, Vec<f64>) {
        let gp = vec![0.005, 0.008, 0.03, 0.05, 0.1, 0.15, 0.5, 2.0, 10.0];
        let eta = vec![400.0, 55.0, 11.0, 13.0, 12.5, 11.5, 12.0, 6.0, 1.5];
        (gp, eta)
    }

    #[test]
    fn mean_and_spread_over_plateau_window() {
        let (gp, eta) = flow_curve();
        let p = zero_shear_viscosity(&gp, &eta, (0.02, 0.2), (0.0, 100.0)).unwrap();
        // Window: 11, 13, 12.5, 11.5.
        assert_eq!(p.name, "eta0");
        assert!(!p.vary);
        assert!((p.value - 12.0).abs() < 1e-12);
        let expected = ((1.0 + 1.0 + 0.25 + 0.25) / 4.0f64).sqrt();
        assert!((p.stderr.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn low_shear_rates_and_outliers_are_dropped() {
        let (gp, eta) = flow_curve();
        // 0.005 and 0.008 1/s lie inside the shear window but below the cut.
        let p = zero_shear_viscosity(&gp, &eta, (0.0, 1.0), (0.0, 100.0)).unwrap();
        assert!((p.value - 12.0).abs() < 1e-12);
        // The viscosity window removes the thinning sample at 2 1/s.
        let p = zero_shear_viscosity(&gp, &eta, (0.0, 5.0), (10.0, 100.0)).unwrap();
        assert!((p.value - 12.0).abs() < 1e-12);

        let mut eta = eta;
        eta[4] = f64::NAN;
        let p = zero_shear_viscosity(&gp, &eta, (0.02, 0.2), (0.0, 100.0)).unwrap();
        assert!((p.value - 35.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_window_is_insufficient_data() {
        let (gp, eta) = flow_curve();
        let err = zero_shear_viscosity(&gp, &eta, (20.0, 30.0), (0.0, 100.0)).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { usable: 0, .. }));
        let err = zero_shear_viscosity(&gp[..3], &eta, (0.02, 0.2), (0.0, 100.0)).unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { .. }));
    }
}
