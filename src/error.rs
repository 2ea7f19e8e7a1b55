//! Error types.
//!
//! - `FitError` is what the library (evaluator, solver, sample validation) returns.
//! - `AppError` is what the binary surfaces: a message plus a process exit code.

use std::fmt;

use crate::domain::ModelFamily;

/// Errors raised by the model evaluator and the solver.
///
/// All of these are caller contract violations; the solver never retries.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// The parameter vector is shorter than the model family requires.
    InvalidParameterCount {
        family: ModelFamily,
        expected: usize,
        actual: usize,
    },
    /// A model family name outside the supported set.
    UnsupportedModel(String),
    /// Sample arrays are empty, mismatched, or contain non-finite values.
    InvalidSamples(String),
    /// Solver options out of range.
    InvalidOptions(String),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameterCount {
                family,
                expected,
                actual,
            } => write!(
                f,
                "{} model needs at least {expected} parameters, got {actual}",
                family.display_name()
            ),
            Self::UnsupportedModel(name) => write!(
                f,
                "unsupported model '{name}' (expected exponential, polynomial or sinusoidal)"
            ),
            Self::InvalidSamples(msg) => write!(f, "invalid samples: {msg}"),
            Self::InvalidOptions(msg) => write!(f, "invalid solver options: {msg}"),
        }
    }
}

impl std::error::Error for FitError {}

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
        let exit_code = match err {
            FitError::InvalidSamples(_) => 3,
            FitError::InvalidParameterCount { .. }
            | FitError::UnsupportedModel(_)
            | FitError::InvalidOptions(_) => 2,
        };
        AppError::new(exit_code, err.to_string())
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
