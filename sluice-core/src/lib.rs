pub mod composer;
pub mod condition;
pub mod config;
pub mod error;
pub mod flow;
pub mod message;
pub mod registry;
pub mod transform;

// Re-export main types for easier access
pub use composer::{Pipeline, RunSummary};
pub use condition::{Always, Combinator, Operator};
pub use config::{Config, ObjectSettings, PipelineConfig, RetrySettings};
pub use error::{FlowError, Result};
pub use flow::inspector::{Inspector, SharedInspector};
pub use flow::sink::Sink;
pub use flow::source::Source;
pub use flow::transformer::{apply, SharedTransformer, Transformer};
pub use flow::types::{ConditionFuture, Context, FlowFuture, SourceReceiver};
pub use message::{Message, Value};
pub use registry::Registry;
