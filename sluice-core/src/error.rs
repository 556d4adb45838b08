use thiserror::Error;

/// Error type shared by every transform, inspector and pipeline edge.
///
/// Errors are `Clone` because they travel through the message bus and are
/// matched against `error_messages` patterns by their string form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The requested component type is not registered.
    #[error("invalid factory input: type {0:?}")]
    InvalidFactoryInput(String),

    /// A setting was present but its value is not acceptable.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// A required setting was not provided.
    #[error("missing required option: {0}")]
    MissingRequiredOption(String),

    /// Settings could not be decoded into the component's configuration.
    #[error("config: {0}")]
    Config(String),

    /// An error raised inside a meta-transform, tagged with its id.
    #[error("transform {id}: {source}")]
    Component {
        id: String,
        #[source]
        source: Box<FlowError>,
    },

    /// `meta_retry` exhausted its attempts without a success.
    #[error("transform {id}: retry limit reached")]
    RetryLimitReached { id: String },

    /// Reading or writing a message payload failed.
    #[error("message: {0}")]
    Message(String),

    #[error("source: {0}")]
    Source(String),

    #[error("sink: {0}")]
    Sink(String),

    #[error("context cancelled")]
    Cancelled,

    /// Runtime error raised by a leaf component. Displays as the bare detail.
    #[error("{0}")]
    Custom(String),
}

impl FlowError {
    /// Wraps `self` with the id of the component that observed it.
    #[must_use]
    pub fn within(self, id: impl Into<String>) -> Self {
        Self::Component {
            id: id.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error, or any error it wraps, is a retry-limit error.
    #[must_use]
    pub fn is_retry_limit(&self) -> bool {
        match self {
            Self::RetryLimitReached { .. } => true,
            Self::Component { source, .. } => source.is_retry_limit(),
            _ => false,
        }
    }

    /// Returns true if this error, or any error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Component { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<regex::Error> for FlowError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidOption(err.to_string())
    }
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
