//! Rheological models fitted to oscillatory shear data.
//!
//! - `maxwell`: single-mode Maxwell fit of `G'(ω)` and `G''(ω)` jointly
//! - `colecole`: semicircle fit of `G''` against `G'`, with an optional
//!   linear extrapolation to the `G''=0` intercept
//! - `flow_curve`: zero-shear viscosity from a steady-shear flow curve

pub mod colecole;
pub mod flow_curve;
pub mod maxwell;

pub use colecole::*;
pub use flow_curve::*;
pub use maxwell::*;

use crate::error::FitError;

/// Default column names of an oscillatory measurement table.
pub const OMEGA_COLUMN: &str = "omega in rad/s";
pub const STORAGE_COLUMN: &str = "G' in Pa";
pub const LOSS_COLUMN: &str = "G'' in Pa";

/// Default column names of a flow curve table.
pub const SHEAR_RATE_COLUMN: &str = "GP in 1/s";
pub const VISCOSITY_COLUMN: &str = "Eta in Pas";

/// Angular frequency sweep with storage and loss moduli.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxwellData {
    pub omega: Vec<f64>,
    pub g_storage: Vec<f64>,
    pub g_loss: Vec<f64>,
}

impl MaxwellData {
    pub fn new(omega: Vec<f64>, g_storage: Vec<f64>, g_loss: Vec<f64>) -> Result<Self, FitError> {
        if omega.len() != g_storage.len() || omega.len() != g_loss.len() {
            return Err(FitError::DimensionMismatch {
                x: omega.len(),
                y: g_storage.len(),
                dy: Some(g_loss.len()),
            });
        }
        Ok(Self {
            omega,
            g_storage,
            g_loss,
        })
    }

    pub fn len(&self) -> usize {
        self.omega.len()
    }

    pub fn is_empty(&self) -> bool {
        self.omega.is_empty()
    }

    /// Indices whose sample satisfies `keep`.
    pub(crate) fn indices(&self, keep: impl Fn(usize) -> bool) -> Vec<usize> {
        (0..self.len()).filter(|&i| keep(i)).collect()
    }
}
