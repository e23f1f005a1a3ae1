//! Error types for Tacho Flux

use thiserror::Error;

/// Errors raised by ingestion adapters and configuration loading.
///
/// The analysis stages themselves never fail: malformed cells degrade to zero,
/// unknown labels are ignored and missing rules are skipped.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
