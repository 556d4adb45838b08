use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{compile_patterns, id_or, matches_any};
use crate::config::{describe, fmt_component, Config, RetrySettings};
use crate::error::{FlowError, Result};
use crate::flow::inspector::SharedInspector;
use crate::flow::transformer::{apply, SharedTransformer, Transformer};
use crate::flow::types::{Context, FlowFuture};
use crate::message::Message;
use crate::registry::Registry;

const TYPE_NAME: &str = "meta_retry";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaRetrySettings {
    /// Transforms applied in series to each attempt.
    pub transforms: Vec<Config>,
    /// Inspector every non-control output must pass for an attempt to succeed.
    pub condition: Option<Config>,
    pub retry: RetrySettings,
    /// Patterns matched against the error text. Matching errors are retried.
    pub error_messages: Vec<String>,
    pub id: String,
}

/// Re-runs an inner chain until its outputs pass a condition.
///
/// Every attempt runs on a fresh copy of the input. An attempt is retried
/// when the chain fails with an error matching `error_messages` or when any
/// non-control output fails the condition; attempts after the first wait a
/// constant delay. A `count` of zero retries forever.
pub struct MetaRetry {
    id: String,
    transformers: Vec<SharedTransformer>,
    condition: Option<SharedInspector>,
    count: usize,
    delay: Duration,
    patterns: Vec<Regex>,
}

impl MetaRetry {
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
            condition: None,
            count: 0,
            delay: Duration::ZERO,
            patterns: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_condition(mut self, condition: SharedInspector) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the number of retries after the first attempt and the delay between attempts.
    #[must_use]
    pub const fn with_retry(mut self, count: usize, delay: Duration) -> Self {
        self.count = count;
        self.delay = delay;
        self
    }

    /// Retries chain errors matching any of `patterns`.
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
        let settings: MetaRetrySettings = config.decode()?;
        let id = id_or(settings.id, TYPE_NAME);
        let transformers = registry
            .new_transformers(&settings.transforms)
            .map_err(|e| e.within(&id))?;
        let condition = settings
            .condition
            .as_ref()
            .map(|c| registry.new_inspector(c))
            .transpose()
            .map_err(|e| e.within(&id))?;

        let mut retry = Self::new(transformers)
            .and_then(|t| t.with_error_messages(&settings.error_messages))
            .map_err(|e| e.within(&id))?
            .with_retry(settings.retry.count, settings.retry.delay)
            .with_id(id);
        retry.condition = condition;
        Ok(retry)
    }

    async fn passes(&self, ctx: &Context, msgs: &[Message]) -> Result<bool> {
        let Some(condition) = &self.condition else {
            return Ok(true);
        };

        for msg in msgs.iter().filter(|m| !m.is_control()) {
            if !condition.inspect(ctx, msg).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn run(&self, ctx: &Context, msg: Message) -> Result<Vec<Message>> {
        let mut attempts = 0;
        loop {
            if self.count > 0 && attempts > self.count {
                break;
            }

            if attempts > 0 {
                tokio::select! {
                    () = ctx.cancelled() => return Err(FlowError::Cancelled),
                    () = tokio::time::sleep(self.delay) => {}
                }
            }
            attempts += 1;

            match apply(ctx, &self.transformers, vec![msg.clone()]).await {
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) if matches_any(&self.patterns, &err) => {
                    debug!(id = %self.id, attempts, error = %err, "Retrying after error");
                }
                Err(err) => return Err(err.within(&self.id)),
                Ok(msgs) => {
                    if self.passes(ctx, &msgs).await.map_err(|e| e.within(&self.id))? {
                        return Ok(msgs);
                    }
                    debug!(id = %self.id, attempts, "Retrying after failed condition");
                }
            }
        }

        Err(FlowError::RetryLimitReached {
            id: self.id.clone(),
        })
    }
}

impl Transformer for MetaRetry {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(self.run(ctx, msg))
    }
}

impl fmt::Display for MetaRetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transforms: Vec<_> = self.transformers.iter().map(|t| describe(t)).collect();
        let condition = self.condition.as_ref().map(|c| describe(c));
        let patterns: Vec<_> = self.patterns.iter().map(Regex::as_str).collect();
        fmt_component(
            f,
            TYPE_NAME,
            &json!({
                "id": self.id,
                "transforms": transforms,
                "condition": condition,
                "retry": RetrySettings { count: self.count, delay: self.delay },
                "error_messages": patterns,
            }),
        )
    }
}
