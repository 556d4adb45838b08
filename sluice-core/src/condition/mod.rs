//! Boolean combinators over inspectors.
//!
//! `meta_all`, `meta_any` and `meta_none` evaluate every child inspector
//! against a message. With an `object.source_key` they evaluate against the
//! addressed field instead, and against each element in turn when that field
//! is an array, so nested and repeated fields can be tested with arbitrary
//! boolean expressions.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::trace;

use crate::config::{describe, fmt_component, Config, ObjectSettings};
use crate::error::{FlowError, Result};
use crate::flow::inspector::{Inspector, SharedInspector};
use crate::flow::types::{ConditionFuture, Context};
use crate::message::Message;
use crate::registry::Registry;
use crate::transform::id_or;

/// How a combinator folds its children's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// True if every result is true.
    All,
    /// True if at least one result is true.
    Any,
    /// True if every result is false.
    None,
}

impl Operator {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::All => "meta_all",
            Self::Any => "meta_any",
            Self::None => "meta_none",
        }
    }

    /// The result that ends evaluation early, if `result` is one.
    const fn short_circuit(self, result: bool) -> Option<bool> {
        match (self, result) {
            (Self::All, false) => Some(false),
            (Self::Any, true) => Some(true),
            (Self::None, true) => Some(false),
            _ => None,
        }
    }

    /// The result when no child short-circuited, including the empty case.
    const fn exhausted(self) -> bool {
        match self {
            Self::All | Self::None => true,
            Self::Any => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinatorSettings {
    pub object: ObjectSettings,
    pub conditions: Vec<Config>,
    /// Name used in logs and rendered settings. Defaults to the type name.
    pub id: String,
}

/// Combines child inspectors with AND, OR or NOR semantics.
pub struct Combinator {
    op: Operator,
    id: String,
    object: ObjectSettings,
    inspectors: Vec<SharedInspector>,
}

impl Combinator {
    /// # Errors
    ///
    /// Fails if `inspectors` is empty.
    pub fn new(op: Operator, inspectors: Vec<SharedInspector>) -> Result<Self> {
        if inspectors.is_empty() {
            return Err(FlowError::MissingRequiredOption(format!(
                "{}: conditions",
                op.type_name()
            )));
        }

        Ok(Self {
            op,
            id: op.type_name().to_string(),
            object: ObjectSettings::default(),
            inspectors,
        })
    }

    /// # Errors
    ///
    /// Fails if `inspectors` is empty.
    pub fn all(inspectors: Vec<SharedInspector>) -> Result<Self> {
        Self::new(Operator::All, inspectors)
    }

    /// # Errors
    ///
    /// Fails if `inspectors` is empty.
    pub fn any(inspectors: Vec<SharedInspector>) -> Result<Self> {
        Self::new(Operator::Any, inspectors)
    }

    /// # Errors
    ///
    /// Fails if `inspectors` is empty.
    pub fn none(inspectors: Vec<SharedInspector>) -> Result<Self> {
        Self::new(Operator::None, inspectors)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Evaluates the children against the field at `key` instead of the payload.
    #[must_use]
    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.object.source_key = key.into();
        self
    }

    /// Builds a combinator from `{"object": {...}, "conditions": [...]}` settings.
    ///
    /// # Errors
    ///
    /// Fails if the settings do not decode, no conditions are configured, or
    /// any child cannot be constructed.
    pub fn from_config(registry: &Registry, op: Operator, config: &Config) -> Result<Self> {
        let settings: CombinatorSettings = config.decode()?;
        let inspectors = registry.new_inspectors(&settings.conditions)?;
        let mut combinator =
            Self::new(op, inspectors)?.with_id(id_or(settings.id, op.type_name()));
        combinator.object = settings.object;
        Ok(combinator)
    }

    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.op
    }

    async fn evaluate(&self, ctx: &Context, msg: &Message) -> Result<bool> {
        if msg.is_control() {
            return Ok(false);
        }

        let Some(key) = self.object.source_key() else {
            return self.fold(ctx, std::slice::from_ref(msg)).await;
        };

        let value = msg.get_value(key);
        if !value.exists() {
            trace!(id = %self.id, key, "Source key not found");
            return Ok(false);
        }

        let elements = if value.is_array() {
            value.array()
        } else {
            vec![value]
        };
        let msgs: Vec<Message> = elements.iter().map(|v| msg.derive(v.bytes())).collect();
        self.fold(ctx, &msgs).await
    }

    async fn fold(&self, ctx: &Context, msgs: &[Message]) -> Result<bool> {
        for msg in msgs {
            for inspector in &self.inspectors {
                let result = inspector.inspect(ctx, msg).await?;
                if let Some(decided) = self.op.short_circuit(result) {
                    return Ok(decided);
                }
            }
        }
        Ok(self.op.exhausted())
    }
}

impl Inspector for Combinator {
    fn inspect<'a>(&'a self, ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(self.evaluate(ctx, msg))
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions: Vec<_> = self.inspectors.iter().map(|i| describe(i)).collect();
        fmt_component(
            f,
            self.op.type_name(),
            &json!({
                "id": self.id,
                "object": self.object,
                "conditions": conditions,
            }),
        )
    }
}

/// Inspector that always passes. Stands in for an absent condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Inspector for Always {
    fn inspect<'a>(&'a self, _ctx: &'a Context, _msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async { Ok(true) })
    }
}

impl fmt::Display for Always {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"{"type":"always"}"#)
    }
}
