//! Mathematical utilities: linear least squares and percentile statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
