// src/error.rs
//! Error types for log loading and settings input.
//!
//! The analysis stages themselves never fail; only the collaborators that touch
//! files or assemble the flight-data model return these errors.

use std::io;
use thiserror::Error;

/// Result type for log loading and settings operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No line looked like a blackbox CSV column header row
    #[error("Could not find CSV headers in the log")]
    NoHeaderRow,

    #[error("Missing essential headers: {0}")]
    MissingHeaders(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Series '{series}' has {actual} samples, expected {expected}")]
    SeriesLengthMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },
}
