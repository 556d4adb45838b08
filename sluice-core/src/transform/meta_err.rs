use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{compile_patterns, id_or, matches_any};
use crate::config::{describe, fmt_component, Config};
use crate::error::{FlowError, Result};
use crate::flow::transformer::{apply, SharedTransformer, Transformer};
use crate::flow::types::{Context, FlowFuture};
use crate::message::Message;
use crate::registry::Registry;

const TYPE_NAME: &str = "meta_err";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaErrSettings {
    /// Transforms applied in series to each message.
    pub transforms: Vec<Config>,
    /// Patterns matched against the error text. Empty catches every error.
    pub error_messages: Vec<String>,
    pub id: String,
}

/// Suppresses errors raised by an inner chain.
///
/// When the chain fails with an error whose text matches one of the
/// configured patterns, the unmodified input is returned instead. Any other
/// error propagates unchanged. Cancellation is never suppressed.
pub struct MetaErr {
    id: String,
    transformers: Vec<SharedTransformer>,
    patterns: Vec<Regex>,
}

impl MetaErr {
    /// # Errors
    ///
    /// Fails if `transformers` is empty.
    pub fn new(transformers: Vec<SharedTransformer>) -> Result<Self> {
        if transformers.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: transforms"
            )));
        }

        Ok(Self {
            id: TYPE_NAME.to_string(),
            transformers,
            patterns: Vec::new(),
        })
    }

    /// Restricts suppression to errors matching any of `patterns`.
    ///
    /// # Errors
    ///
    /// Fails if a pattern is not a valid regular expression.
    pub fn with_error_messages<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.patterns = compile_patterns(patterns)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode, no transforms are configured, a
    /// pattern does not compile, or any child cannot be constructed.
    pub fn from_config(registry: &Registry, config: &Config) -> Result<Self> {
        let settings: MetaErrSettings = config.decode()?;
        let id = id_or(settings.id, TYPE_NAME);
        let transformers = registry
            .new_transformers(&settings.transforms)
            .map_err(|e| e.within(&id))?;

        Self::new(transformers)
            .and_then(|t| t.with_error_messages(&settings.error_messages))
            .map(|t| t.with_id(id.clone()))
            .map_err(|e| e.within(id))
    }

    fn catches(&self, err: &FlowError) -> bool {
        if err.is_cancelled() {
            return false;
        }
        self.patterns.is_empty() || matches_any(&self.patterns, err)
    }
}

impl Transformer for MetaErr {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            match apply(ctx, &self.transformers, vec![msg.clone()]).await {
                Ok(msgs) => Ok(msgs),
                Err(err) if self.catches(&err) => {
                    debug!(id = %self.id, error = %err, "Suppressed transform error");
                    Ok(vec![msg])
                }
                Err(err) => Err(err),
            }
        })
    }
}

impl fmt::Display for MetaErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transforms: Vec<_> = self.transformers.iter().map(|t| describe(t)).collect();
        let patterns: Vec<_> = self.patterns.iter().map(Regex::as_str).collect();
        fmt_component(
            f,
            TYPE_NAME,
            &json!({
                "id": self.id,
                "transforms": transforms,
                "error_messages": patterns,
            }),
        )
    }
}
