//! Basic model library.
//!
//! Models are implemented as small, pure functions so that the fitting code
//! can stay generic over them.

pub mod init;
pub mod model;

pub use init::*;
pub use model::*;
