//! Error types for mmea-fusion
//!
//! Only `ShapeMismatch` and configuration problems surface as errors.
//! A missing modality is a normal input and a degenerate vector is recovered
//! in place, so neither has a variant here.

use thiserror::Error;

/// Fusion pipeline error type
#[derive(Debug, Error)]
pub enum FusionError {
    /// Category sets or cardinalities do not line up across inputs
    ///
    /// Fatal to the call that raised it, never to the process.
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// Ensemble weight vector is empty, negative, or does not sum to 1
    #[error("Invalid ensemble weights: {0}")]
    InvalidWeights(String),

    /// Pipeline settings out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// mmea-common error
    #[error("Common error: {0}")]
    Common(#[from] mmea_common::Error),
}

impl FusionError {
    pub(crate) fn shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
        FusionError::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type for fusion pipeline operations
pub type Result<T> = std::result::Result<T, FusionError>;
