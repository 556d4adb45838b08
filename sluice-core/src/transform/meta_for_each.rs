use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use super::id_or;
use crate::config::{describe, fmt_component, Config, ObjectSettings};
use crate::error::{FlowError, Result};
use crate::flow::transformer::{apply, SharedTransformer, Transformer};
use crate::flow::types::{Context, FlowFuture};
use crate::message::{bytes_to_json, Message};
use crate::registry::Registry;

const TYPE_NAME: &str = "meta_for_each";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaForEachSettings {
    /// `source_key` selects the array, `target_key` receives the results.
    pub object: ObjectSettings,
    /// Transforms applied in series to each element.
    pub transforms: Vec<Config>,
    pub id: String,
}

/// Applies an inner chain to every element of an array field.
///
/// Each element becomes a message of its own; the single data message the
/// chain returns for it becomes the transformed element. Control messages
/// are passed to the chain so buffering children can flush.
pub struct MetaForEach {
    id: String,
    source_key: String,
    target_key: String,
    transformers: Vec<SharedTransformer>,
}

impl MetaForEach {
    /// # Errors
    ///
    /// Fails if either key is empty or `transformers` is empty.
    pub fn new(
        source_key: impl Into<String>,
        target_key: impl Into<String>,
        transformers: Vec<SharedTransformer>,
    ) -> Result<Self> {
        let source_key = source_key.into();
        let target_key = target_key.into();
        if source_key.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: object.source_key"
            )));
        }
        if target_key.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: object.target_key"
            )));
        }
        if transformers.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{TYPE_NAME}: transforms"
            )));
        }

        Ok(Self {
            id: TYPE_NAME.to_string(),
            source_key,
            target_key,
            transformers,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode, a required option is missing, or
    /// any child cannot be constructed.
    pub fn from_config(registry: &Registry, config: &Config) -> Result<Self> {
        let settings: MetaForEachSettings = config.decode()?;
        let id = id_or(settings.id, TYPE_NAME);
        let transformers = registry
            .new_transformers(&settings.transforms)
            .map_err(|e| e.within(&id))?;

        Self::new(
            settings.object.source_key,
            settings.object.target_key,
            transformers,
        )
        .map(|t| t.with_id(id.clone()))
        .map_err(|e| e.within(id))
    }

    async fn run(&self, ctx: &Context, mut msg: Message) -> Result<Vec<Message>> {
        if msg.is_control() {
            return apply(ctx, &self.transformers, vec![msg]).await;
        }

        let value = msg.get_value(&self.source_key);
        if !value.is_array() {
            return Err(FlowError::Message(format!(
                "{}: value is not an array",
                self.source_key
            )));
        }

        let mut results = Vec::new();
        for (index, element) in value.array().iter().enumerate() {
            let outputs = apply(ctx, &self.transformers, vec![msg.derive(element.bytes())]).await?;
            let mut data = outputs.into_iter().filter(|m| !m.is_control());
            match (data.next(), data.next()) {
                (Some(output), None) => results.push(bytes_to_json(output.data())),
                _ => {
                    return Err(FlowError::Message(format!(
                        "element {index}: expected exactly one result"
                    )))
                }
            }
        }

        msg.set_value(&self.target_key, Json::Array(results))?;
        Ok(vec![msg])
    }
}

impl Transformer for MetaForEach {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move { self.run(ctx, msg).await.map_err(|e| e.within(&self.id)) })
    }
}

impl fmt::Display for MetaForEach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transforms: Vec<_> = self.transformers.iter().map(|t| describe(t)).collect();
        fmt_component(
            f,
            TYPE_NAME,
            &json!({
                "id": self.id,
                "object": {
                    "source_key": self.source_key,
                    "target_key": self.target_key,
                },
                "transforms": transforms,
            }),
        )
    }
}
