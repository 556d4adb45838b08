//! Configuration nodes and the settings blocks shared between components.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{FlowError, Result};

/// Environment variable consulted when a pipeline does not set its concurrency.
pub const CONCURRENCY_ENV: &str = "SLUICE_CONCURRENCY";

/// Selects and parametrizes a transformer or inspector by type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_settings")]
    pub settings: Json,
}

fn empty_settings() -> Json {
    Json::Object(serde_json::Map::new())
}

impl Config {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            settings: empty_settings(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Json) -> Self {
        self.settings = settings;
        self
    }

    /// Decodes the settings into a component's typed configuration.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Config` if the settings do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        decode_settings(&self.settings)
    }
}

/// Decodes a settings value; `null` is treated as an empty object.
///
/// # Errors
///
/// Returns `FlowError::Config` if the settings do not match `T`.
pub fn decode_settings<T: DeserializeOwned>(settings: &Json) -> Result<T> {
    let settings = if settings.is_null() {
        empty_settings()
    } else {
        settings.clone()
    };
    serde_json::from_value(settings).map_err(|e| FlowError::Config(e.to_string()))
}

/// Renders a component as `{"type": ..., "settings": ...}` for `Display`.
///
/// # Errors
///
/// Fails if the settings cannot be serialized.
pub fn fmt_component<T: Serialize>(
    f: &mut std::fmt::Formatter<'_>,
    type_name: &str,
    settings: &T,
) -> std::fmt::Result {
    let settings = serde_json::to_value(settings).map_err(|_| std::fmt::Error)?;
    let component = serde_json::json!({ "type": type_name, "settings": settings });
    write!(f, "{component}")
}

/// Where a component reads its input from and writes its output to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSettings {
    pub source_key: String,
    pub target_key: String,
}

impl ObjectSettings {
    #[must_use]
    pub fn source(key: impl Into<String>) -> Self {
        Self {
            source_key: key.into(),
            target_key: String::new(),
        }
    }

    #[must_use]
    pub fn source_key(&self) -> Option<&str> {
        Some(self.source_key.as_str()).filter(|k| !k.is_empty())
    }

    #[must_use]
    pub fn target_key(&self) -> Option<&str> {
        Some(self.target_key.as_str()).filter(|k| !k.is_empty())
    }
}

/// Attempt budget and constant backoff for retrying components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retries after the first attempt; 0 retries forever.
    pub count: usize,
    /// Fixed delay between attempts, e.g. `"1s"` or `"250ms"`.
    #[serde(with = "duration")]
    pub delay: Duration,
}

/// Serde helper for human-readable durations.
pub mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        if text.trim().is_empty() {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
    }
}

/// Top-level configuration of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent transform workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Transforms applied in series to every message.
    #[serde(default)]
    pub transforms: Vec<Config>,
}

impl PipelineConfig {
    /// Loads a pipeline configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parses a pipeline configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Resolves the worker count: the configured value, then
    /// `SLUICE_CONCURRENCY`, then the number of available processors.
    ///
    /// # Errors
    ///
    /// Fails if the resolved value is zero or the variable is not a number.
    pub fn resolve_concurrency(&self) -> Result<usize> {
        let concurrency = match self.concurrency {
            Some(n) => n,
            None => match std::env::var(CONCURRENCY_ENV) {
                Ok(value) => value.trim().parse().map_err(|_| {
                    FlowError::InvalidOption(format!("{CONCURRENCY_ENV}: {value:?} is not a number"))
                })?,
                Err(_) => default_concurrency(),
            },
        };

        if concurrency == 0 {
            return Err(FlowError::InvalidOption(
                "concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(concurrency)
    }
}

/// Number of available processors, or one if it cannot be determined.
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Parses a component's `Display` back into JSON so meta components can
/// nest their children's configuration.
pub(crate) fn describe(component: &dyn std::fmt::Display) -> Json {
    let text = component.to_string();
    serde_json::from_str(&text).unwrap_or(Json::String(text))
}
