//! Error types shared across Emberfall crates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading TOML data files (tuning, skill catalogues,
/// scenarios).
#[derive(Debug, Error)]
pub enum DataFileError {
    /// File not found.
    #[error("Data file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the file.
    #[error("Failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Parsed data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level error type for Emberfall operations.
#[derive(Debug, Error)]
pub enum EmberfallError {
    /// Data file errors
    #[error("Data error: {0}")]
    Data(#[from] DataFileError),

    /// A gameplay action was rejected
    #[error("Action rejected: {0}")]
    Rejected(String),
}

/// Result type alias for data file loading.
pub type DataFileResult<T> = Result<T, DataFileError>;

/// Result type alias for Emberfall operations.
pub type EmberfallResult<T> = Result<T, EmberfallError>;
