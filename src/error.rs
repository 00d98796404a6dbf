//! Error types for the airfuse pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for airfuse operations
pub type Result<T> = std::result::Result<T, AirfuseError>;

/// Main error type for the pipeline.
///
/// Only conditions that make a run impossible are errors. Recoverable
/// degradations are reported as [`crate::pipeline::PipelineWarning`] values.
#[derive(Error, Debug)]
pub enum AirfuseError {
    #[error("Missing required {role} input: {}", path.display())]
    MissingInput { role: String, path: PathBuf },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Scaler not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for AirfuseError {
    fn from(err: polars::error::PolarsError) -> Self {
        AirfuseError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AirfuseError {
    fn from(err: serde_json::Error) -> Self {
        AirfuseError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AirfuseError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_missing_input_names_file() {
        let err = AirfuseError::MissingInput {
            role: "weather".to_string(),
            path: PathBuf::from("data/weather_data_enhanced.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("weather"));
        assert!(msg.contains("weather_data_enhanced.csv"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AirfuseError = io_err.into();
        assert!(matches!(err, AirfuseError::IoError(_)));
    }
}
