//! Core error types for the Tonal engine
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type shared across Tonal crates
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid band/engine configuration (e.g. reconfiguring bands while playing)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input values (gains, frequencies, positions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Decode collaborator failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output device failure
    #[error("Device error: {0}")]
    Device(String),

    /// Preset storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
