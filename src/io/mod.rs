//! Input helpers.
//!
//! - delimited-text ingest into numeric columns (`ingest`)

pub mod ingest;

pub use ingest::*;
