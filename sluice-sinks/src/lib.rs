//! Sluice Sinks
//!
//! Ready-made sinks that receive the data messages a `sluice_core::Pipeline`
//! emits.

#![warn(missing_docs)]

pub mod collect;
pub mod error;
pub mod file;
pub mod stdout;
pub mod types;

pub use collect::CollectSink;
pub use error::SinkError;
pub use file::FileSink;
pub use stdout::StdoutSink;
pub use types::FileSinkConfig;
