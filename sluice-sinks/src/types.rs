//! Common types used across different sinks

use std::path::PathBuf;

/// Configuration for file system sinks
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Path to write output to
    pub path: PathBuf,
    /// Whether to append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Appends to the file at `path`, creating it if needed.
    pub fn append(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: true,
        }
    }

    /// Truncates the file at `path`, creating it if needed.
    pub fn truncate(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
        }
    }
}
