//! Sluice Sources
//!
//! Ready-made sources that feed data messages into a `sluice_core::Pipeline`.

#![warn(missing_docs)]

pub mod error;
pub mod lines;
pub mod memory;

pub use error::SourceError;
pub use lines::LineSource;
pub use memory::MemorySource;
