//! Error types shared by the experiment harness
//!
//! Three families surface to callers:
//! - configuration errors (bad percentile, bin size, split sizes)
//! - contract violations (a loader without noisy indices handed to a
//!   detection experiment)
//! - numeric degeneracies (constant value arrays, zero normalizers)
//!
//! Model fit failures are wrapped in [`BenchError::Model`] and propagate
//! unchanged; no experiment retries or returns partial curves.

use thiserror::Error;

/// Errors produced by loaders, models and experiments
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Missing capability: {0}")]
    MissingCapability(String),

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Dataset '{0}' has been registered, names must be unique")]
    DuplicateDataset(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = BenchError::InsufficientData {
            required: 5,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: need at least 5 points, got 3"
        );
    }

    #[test]
    fn test_duplicate_dataset_message() {
        let err = BenchError::DuplicateDataset("iris".to_string());
        assert!(err.to_string().contains("names must be unique"));
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/valora/values.csv")?)
        }
        assert!(matches!(open_missing(), Err(BenchError::Io(_))));
    }
}
