//! Core error type.
//!
//! Every variant is fatal to the run: a bad configuration or interarrival
//! table aborts construction before the first step.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("interarrival distribution error: {0}")]
    Distribution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand result type for all `ca-*` crates.
pub type CaResult<T> = Result<T, CaError>;
