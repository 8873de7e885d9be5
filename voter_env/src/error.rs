//! Error types for the voter model workspace.

use thiserror::Error;

/// Errors that can occur while configuring, running or exporting a simulation.
///
/// Running out of step budget is not an error: it is the
/// `StepLimitReached` outcome of the driver.
#[derive(Debug, Error)]
pub enum VoterError {
    /// A configuration value is out of range (rejected before any work starts)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Writing trajectory, snapshot or export output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or export file could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A runtime resource (e.g. a worker thread pool) could not be set up
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl VoterError {
    /// Creates an invalid configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a runtime resource error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Returns true if this error was raised by configuration validation.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}

impl From<serde_json::Error> for VoterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for `Result<T, VoterError>`.
pub type VoterResult<T> = Result<T, VoterError>;
