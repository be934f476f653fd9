//! Error types for the spendsort crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, encoding, clustering or labeling
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameters
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Error message
        message: String,
    },

    /// Empty or invalid data
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message
        message: String,
    },

    /// A vector and a centroid (or layout) disagree on dimensionality
    #[error("Dimension mismatch: expected {expected} columns, found {found}")]
    DimensionMismatch {
        /// Expected number of columns
        expected: usize,
        /// Number of columns actually seen
        found: usize,
    },

    /// Initialization failure
    #[error("Initialization failure: {message}")]
    InitializationFailure {
        /// Error message
        message: String,
    },

    /// Mathematical computation error
    #[error("Computation error: {message}")]
    ComputationError {
        /// Error message
        message: String,
    },

    /// The operator gave up (or kept answering badly) during labeling
    #[error("No valid answer after {attempts} attempts")]
    InputExhausted {
        /// Number of prompts issued before giving up
        attempts: usize,
    },

    /// The input file type is not one we can read
    #[error("Unsupported file format: {}", path.display())]
    UnsupportedFormat {
        /// Offending path
        path: PathBuf,
    },

    /// Refused to overwrite an existing file
    #[error("File already exists: {}", path.display())]
    FileExists {
        /// Existing path
        path: PathBuf,
    },

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Delimited-text parse or write failure
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a new InvalidParameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a new InvalidData error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new DimensionMismatch error
    pub fn dimension_mismatch(expected: usize, found: usize) -> Self {
        Self::DimensionMismatch { expected, found }
    }

    /// Create a new InitializationFailure error
    pub fn initialization_failure(message: impl Into<String>) -> Self {
        Self::InitializationFailure {
            message: message.into(),
        }
    }

    /// Create a new ComputationError
    pub fn computation_error(message: impl Into<String>) -> Self {
        Self::ComputationError {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's parameters rather than the data
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::DimensionMismatch { .. }
        )
    }
}
