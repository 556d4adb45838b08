//! Error types for sluice-sources

use sluice_core::FlowError;
use thiserror::Error;

/// Errors that can occur when working with sources
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// An IO error occurred
    #[error("IO error: {0}")]
    Io(String),

    /// A reader-backed source was streamed a second time
    #[error("input already consumed")]
    Consumed,

    /// A custom error occurred
    #[error("{0}")]
    Custom(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<FlowError> for SourceError {
    fn from(err: FlowError) -> Self {
        Self::Custom(err.to_string())
    }
}

impl From<SourceError> for FlowError {
    fn from(err: SourceError) -> Self {
        Self::Source(err.to_string())
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;
