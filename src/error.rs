//! Error types for the dataset tools.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Errors that can occur while preparing or publishing a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    Json(String),

    /// Error reading a CSV source.
    #[error("CSV error in '{path}': {message}")]
    Csv { path: PathBuf, message: String },

    /// A required CSV column is absent from the header row.
    #[error("Column '{column}' not found in '{path}'")]
    MissingColumn { path: PathBuf, column: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model identifiers must look like `<namespace>/<model-name>`.
    #[error("Invalid model id '{0}': expected <namespace>/<model-name>")]
    InvalidModelId(String),

    /// The registry rejected a request.
    #[error("Registry error: {0}")]
    Registry(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl DatasetError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for DatasetError {
    fn from(err: reqwest::Error) -> Self {
        DatasetError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Json(err.to_string())
    }
}
