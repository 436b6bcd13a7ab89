//! Error types for the simulator

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, SimError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum SimError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader/writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Requested feature column is not in the CSV header
    #[error("Column '{0}' not found in data file")]
    MissingColumn(String),

    /// A cell could not be parsed as a number
    #[error("Failed to parse value '{value}' in column '{column}' at row {row}")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    /// Not enough rows to build a single window
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Checkpoint content does not fit the model
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Tensor shape mismatch
    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl SimError {
    /// Shortcut for a shape mismatch error.
    pub fn shape(name: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        SimError::Shape {
            name: name.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
