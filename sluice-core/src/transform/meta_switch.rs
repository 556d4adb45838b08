use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::trace;

use super::id_or;
use crate::config::{describe, fmt_component, Config};
use crate::error::{FlowError, Result};
use crate::flow::inspector::SharedInspector;
use crate::flow::transformer::{apply, SharedTransformer, Transformer};
use crate::flow::types::{Context, FlowFuture};
use crate::message::Message;
use crate::registry::Registry;

const TYPE_NAME: &str = "meta_switch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseSettings {
    /// Inspector that selects the case. A case without one always matches.
    pub condition: Option<Config>,
    pub transforms: Vec<Config>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaSwitchSettings {
    pub cases: Vec<CaseSettings>,
    pub id: String,
}

/// A conditional transform chain.
#[derive(Clone)]
pub struct Case {
    condition: Option<SharedInspector>,
    transformers: Vec<SharedTransformer>,
}

impl Case {
    #[must_use]
    pub fn when(condition: SharedInspector, transformers: Vec<SharedTransformer>) -> Self {
        Self {
            condition: Some(condition),
            transformers,
        }
    }

    /// A case that matches every message.
    #[must_use]
    pub fn otherwise(transformers: Vec<SharedTransformer>) -> Self {
        Self {
            condition: None,
            transformers,
        }
    }

    async fn matches(&self, ctx: &Context, msg: &Message) -> Result<bool> {
        match &self.condition {
            Some(condition) => condition.inspect(ctx, msg).await,
            None => Ok(true),
        }
    }
}

/// Routes each message through the chain of the first matching case.
///
/// Messages that match no case pass through unchanged. A control message is
/// sent through every case; their data outputs are returned followed by the
/// control message itself.
pub struct MetaSwitch {
    id: String,
    cases: Vec<Case>,
}

impl MetaSwitch {
    /// # Errors
    ///
    /// Fails if `cases` is empty or any case has no transforms.
    pub fn new(cases: Vec<Case>) -> Result<Self> {
        if cases.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: cases"
            )));
        }
        if cases.iter().any(|c| c.transformers.is_empty()) {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: cases.transforms"
            )));
        }

        Ok(Self {
            id: TYPE_NAME.to_string(),
            cases,
        })
    }

    /// Builds a switch without validating that every case has transforms.
    /// A matching case with no transforms passes the message through.
    pub(crate) fn from_cases(cases: Vec<Case>) -> Self {
        Self {
            id: TYPE_NAME.to_string(),
            cases,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode, no cases are configured, or any
    /// condition or transform cannot be constructed.
    pub fn from_config(registry: &Registry, config: &Config) -> Result<Self> {
        let settings: MetaSwitchSettings = config.decode()?;
        let id = id_or(settings.id, TYPE_NAME);

        let cases = settings
            .cases
            .iter()
            .map(|case| -> Result<Case> {
                let condition = case
                    .condition
                    .as_ref()
                    .map(|c| registry.new_inspector(c))
                    .transpose()?;
                let transformers = registry.new_transformers(&case.transforms)?;
                Ok(Case {
                    condition,
                    transformers,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.within(&id))?;

        Self::new(cases)
            .map(|t| t.with_id(id.clone()))
            .map_err(|e| e.within(id))
    }

    async fn flush(&self, ctx: &Context, msg: Message) -> Result<Vec<Message>> {
        let mut results = Vec::new();
        for case in &self.cases {
            let outputs = apply(ctx, &case.transformers, vec![msg.clone()]).await?;
            results.extend(outputs.into_iter().filter(|m| !m.is_control()));
        }
        results.push(msg);
        Ok(results)
    }

    async fn route(&self, ctx: &Context, msg: Message) -> Result<Vec<Message>> {
        if msg.is_control() {
            return self.flush(ctx, msg).await;
        }

        for (index, case) in self.cases.iter().enumerate() {
            if case.matches(ctx, &msg).await? {
                trace!(id = %self.id, case = index, "Matched case");
                return apply(ctx, &case.transformers, vec![msg]).await;
            }
        }
        Ok(vec![msg])
    }
}

impl Transformer for MetaSwitch {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move { self.route(ctx, msg).await.map_err(|e| e.within(&self.id)) })
    }
}

impl fmt::Display for MetaSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cases: Vec<_> = self
            .cases
            .iter()
            .map(|case| {
                let transforms: Vec<_> = case.transformers.iter().map(|t| describe(t)).collect();
                json!({
                    "condition": case.condition.as_ref().map(|c| describe(c)),
                    "transforms": transforms,
                })
            })
            .collect();
        fmt_component(f, TYPE_NAME, &json!({ "id": self.id, "cases": cases }))
    }
}
