//! Error types for sluice-sinks

use sluice_core::FlowError;
use thiserror::Error;

/// Errors that can occur when working with sinks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// An IO error occurred
    #[error("IO error: {0}")]
    Io(String),

    /// A custom error occurred
    #[error("{0}")]
    Custom(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<FlowError> for SinkError {
    fn from(err: FlowError) -> Self {
        Self::Custom(err.to_string())
    }
}

impl From<SinkError> for FlowError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err.to_string())
    }
}

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;
