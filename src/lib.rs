//! Curve fitting for small rheology datasets.
//!
//! Basic algebraic models (linear, power, quadratic, exponential) are fitted
//! by weighted least squares ([`fit::fit`]), optionally followed by ensemble
//! MCMC sampling of the posterior with a fractional error-inflation term.
//! The oscillatory shear models live in [`rheo`]: a joint Maxwell fit of
//! `G'`/`G''`, the Cole-Cole arc, and the zero-shear viscosity of a flow curve.
//!
//! Layering, bottom up: `domain` and `math` carry no fitting logic, `models`
//! and `fit` do the numerics, `report` renders results, and `io`, `cli` and
//! `app` make up the `rheofit` binary.

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod rheo;
