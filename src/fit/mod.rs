//! Fitting orchestration.
//!
//! Responsibilities:
//!
//! - build residuals for a model and dataset
//! - minimize them (Levenberg-Marquardt or Nelder-Mead) with bound transforms
//! - optionally sample the posterior with an ensemble MCMC and extract the
//!   maximum-likelihood estimate

pub mod bayes;
pub mod chain;
pub mod fitter;
pub mod minimizer;
pub mod residual;

pub use bayes::*;
pub use chain::*;
pub use fitter::*;
pub use minimizer::*;
pub use residual::*;
