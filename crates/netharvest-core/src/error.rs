//! Error types for netharvest-core

use thiserror::Error;

/// Result type alias for netharvest-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in netharvest-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A `modify_header` entry referenced a column absent from the current header
    #[error("header column '{column}' not found in result set")]
    HeaderColumnNotFound {
        /// The old column name that could not be located
        column: String,
    },

    /// An output column had neither a passthrough match nor a transformation entry
    #[error("output column '{column}' cannot be resolved: no matching input column and no transformation configured")]
    ColumnUnresolved {
        /// Name of the unresolvable output column
        column: String,
    },

    /// Delimited encoding/decoding error
    #[error("delimited data error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
