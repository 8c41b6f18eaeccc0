//! Error types for the apnea detection system.
//!
//! Error handling uses [`thiserror`] for automatic `Display` and `Error`
//! trait implementations.
//!
//! # Error Hierarchy
//!
//! - [`CoreError`]: Top-level error type that encompasses all subsystem errors
//! - [`SignalError`]: Errors from epoch segmentation and feature extraction
//! - [`InferenceError`]: Errors from model loading and classification
//! - [`StorageError`]: Errors from epoch stores and alert logs
//!
//! # Example
//!
//! ```rust
//! use apnea_core::error::{CoreError, SignalError};
//!
//! fn extract() -> Result<(), CoreError> {
//!     Err(SignalError::InsufficientSamples { required: 2, available: 0 }.into())
//! }
//! ```

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for the apnea detection system.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Signal processing error
    #[error("Signal processing error: {0}")]
    Signal(#[from] SignalError),

    /// Classifier / model error
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Data storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },
}

impl CoreError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Signal(e) => e.is_recoverable(),
            Self::Inference(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Configuration { .. } => false,
        }
    }
}

/// Errors from epoch segmentation and feature extraction.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SignalError {
    /// Insufficient samples for processing
    #[error("Insufficient samples: need at least {required}, got {available}")]
    InsufficientSamples {
        /// Minimum required samples
        required: usize,
        /// Available samples
        available: usize,
    },

    /// Numerically degenerate signal (e.g. constant epoch) for a
    /// nonlinear measure. Callers substitute a neutral value and continue.
    #[error("Degenerate signal for {measure}: {reason}")]
    DegenerateSignal {
        /// The measure that could not be computed
        measure: &'static str,
        /// Why the computation is degenerate
        reason: String,
    },

    /// Epoch sample count does not match the declared geometry
    #[error("Invalid epoch length: expected {expected}, got {actual}")]
    InvalidEpochLength {
        /// Expected number of samples
        expected: usize,
        /// Actual number of samples
        actual: usize,
    },
}

impl SignalError {
    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientSamples { .. } | Self::DegenerateSignal { .. } => true,
            Self::InvalidEpochLength { .. } => false,
        }
    }
}

/// Errors from model loading and classification.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum InferenceError {
    /// Model file not found, unreadable, or structurally invalid.
    /// Fatal at startup: the service must not serve predictions without
    /// a loaded classifier.
    #[error("Failed to load model from '{path}': {reason}")]
    ModelLoadFailed {
        /// Path to the model file
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// Model was trained against a different feature schema
    #[error("Feature schema mismatch: model expects {expected:?}, pipeline provides {actual:?}")]
    SchemaMismatch {
        /// Feature names the model was trained with
        expected: Vec<String>,
        /// Feature names the pipeline produces
        actual: Vec<String>,
    },

    /// Named feature input is missing required schema fields.
    /// Caller-correctable; surfaced as a 400-equivalent.
    #[error("Missing features: {missing:?}")]
    MissingFeatures {
        /// The schema fields absent from the input
        missing: Vec<String>,
    },

    /// Model produced an unusable probability distribution
    #[error("Inference failed: {message}")]
    InferenceFailed {
        /// Description of the failure
        message: String,
    },
}

impl InferenceError {
    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingFeatures { .. } | Self::InferenceFailed { .. } => true,
            Self::ModelLoadFailed { .. } | Self::SchemaMismatch { .. } => false,
        }
    }
}

/// Errors from epoch stores and alert logs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    /// Requested epoch index is not present in the store
    #[error("Epoch {index} not found in store")]
    EpochNotFound {
        /// The missing 1-based epoch index
        index: u64,
    },

    /// Underlying I/O failure
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path involved in the failed operation
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Row could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error
        message: String,
    },
}

impl StorageError {
    /// Creates an I/O error tagged with the offending path.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::EpochNotFound { .. } => true,
            Self::Io { .. } | Self::Serialization { .. } => false,
        }
    }
}
