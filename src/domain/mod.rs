//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the measured data handed to a fit (`Dataset`)
//! - named, bounded fit parameters (`Parameters`)
//! - model tags and fit outputs (`ModelKind`, `FitResult`)

pub mod dataset;
pub mod params;
pub mod types;

pub use dataset::*;
pub use params::*;
pub use types::*;
