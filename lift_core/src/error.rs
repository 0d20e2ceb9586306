//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed set input (negative numbers, RPE out of range, ...)
    ///
    /// The session is left untouched; the caller re-prompts.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation invoked in a session phase that does not support it
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Drop set rejected at confirmation time
    #[error("Drop set configuration error: {0}")]
    DropSetConfiguration(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog or plan validation error
    #[error("Catalog validation error: {0}")]
    Catalog(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can recover by re-prompting for input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::DropSetConfiguration(_))
    }
}
