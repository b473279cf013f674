//! Reporting utilities: formatted fit summaries.

pub mod format;

pub use format::*;
