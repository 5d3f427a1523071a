use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// The three failure classes a caller has to distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Decode,
    Computation,
}

/// Custom error types for the MLI engine
#[derive(Error, Debug)]
pub enum MliError {
    #[error("Invalid analysis configuration: {0}")]
    Validation(String),

    #[error("Unable to decode image: {0}")]
    Decode(String),

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl MliError {
    /// Collapse boundary errors onto the kinds reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MliError::Validation(_) | MliError::Config(_) | MliError::ConfigLoad { .. } => {
                ErrorKind::Validation
            }
            MliError::Decode(_) | MliError::InvalidPath(_) => ErrorKind::Decode,
            _ => ErrorKind::Computation,
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, MliError>;
