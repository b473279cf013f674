//! Error types.
//!
//! `FitError` covers everything the fitting core can refuse to do. All of these
//! are detected before a minimizer runs; a minimizer that runs out of budget is
//! not an error, it is reported through `FitResult::converged`.
//!
//! `AppError` is the binary-facing wrapper that carries a process exit code.

/// Fatal conditions raised by the fitting core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// Model name is not one of the recognized tags.
    #[error("Model '{0}' not defined (expected one of: linear, power, quadratic, exponential)")]
    UnknownModel(String),

    /// An init/fix entry names a parameter the model does not have.
    #[error("Model {model} has no parameter '{name}'")]
    UnknownParameter { model: String, name: String },

    /// Fewer usable points than free parameters.
    #[error("Insufficient data: {usable} usable points for {required} free parameters")]
    InsufficientData { usable: usize, required: usize },

    /// Initial value outside its bounds, or bounds inverted.
    #[error("Parameter '{name}' = {value} lies outside its bounds [{min:?}, {max:?}]")]
    InvalidBounds {
        name: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// `x`, `y` and `dy` lengths disagree.
    #[error("Array lengths differ: x={x}, y={y}, dy={dy:?}")]
    DimensionMismatch { x: usize, y: usize, dy: Option<usize> },

    /// Sampler settings that cannot produce a chain.
    #[error("Invalid sampler configuration: {0}")]
    InvalidSamplerConfig(String),
}

impl FitError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::UnknownModel(_) | FitError::UnknownParameter { .. } => 2,
            FitError::InvalidBounds { .. } | FitError::InvalidSamplerConfig(_) => 2,
            FitError::InsufficientData { .. } | FitError::DimensionMismatch { .. } => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
