//! Leaf transforms for message data and fields.
//!
//! Every transform here passes control messages through unchanged. Those that
//! take `object.source_key` operate on the whole payload when it is unset.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use sluice_core::config::{duration, fmt_component};
use sluice_core::{
    Config, Context, FlowError, FlowFuture, Message, ObjectSettings, Result, Transformer,
};
use tracing::debug;

/// Drops every data message.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtilityDrop;

impl Transformer for UtilityDrop {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            Ok(Vec::new())
        })
    }
}

impl fmt::Display for UtilityDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "utility_drop", &json!({}))
    }
}

/// Settings of [`UtilityErr`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityErrSettings {
    /// Text of the raised error.
    pub message: String,
}

/// Fails every data message with a fixed error.
#[derive(Debug, Clone)]
pub struct UtilityErr {
    settings: UtilityErrSettings,
}

impl UtilityErr {
    /// # Errors
    ///
    /// Fails if `message` is empty.
    pub fn new(message: impl Into<String>) -> Result<Self> {
        let message = message.into();
        if message.is_empty() {
            return Err(FlowError::MissingRequiredOption(
                "utility_err: message".to_string(),
            ));
        }
        Ok(Self {
            settings: UtilityErrSettings { message },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or `message` is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: UtilityErrSettings = config.decode()?;
        Self::new(settings.message)
    }
}

impl Transformer for UtilityErr {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            Err(FlowError::Custom(self.settings.message.clone()))
        })
    }
}

impl fmt::Display for UtilityErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "utility_err", &self.settings)
    }
}

/// Settings of [`UtilityDelay`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityDelaySettings {
    /// How long each data message is held, e.g. `"100ms"`.
    #[serde(with = "duration")]
    pub duration: Duration,
}

/// Holds every data message for a fixed duration.
#[derive(Debug, Clone)]
pub struct UtilityDelay {
    settings: UtilityDelaySettings,
}

impl UtilityDelay {
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            settings: UtilityDelaySettings { duration },
        }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: UtilityDelaySettings = config.decode()?;
        Ok(Self::new(settings.duration))
    }
}

impl Transformer for UtilityDelay {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            tokio::select! {
                () = ctx.cancelled() => Err(FlowError::Cancelled),
                () = tokio::time::sleep(self.settings.duration) => Ok(vec![msg]),
            }
        })
    }
}

impl fmt::Display for UtilityDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "utility_delay", &self.settings)
    }
}

/// Settings shared by transforms that only read and write keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectOnlySettings {
    pub object: ObjectSettings,
}

/// Copies a value between keys, or between a key and the payload.
///
/// With both keys the value is copied field to field. With only
/// `source_key` the value replaces the payload. With only `target_key` the
/// payload is embedded at that key of a new object.
#[derive(Debug, Clone)]
pub struct ObjectCopy {
    settings: ObjectOnlySettings,
}

impl ObjectCopy {
    /// # Errors
    ///
    /// Fails if neither key is set.
    pub fn new(object: ObjectSettings) -> Result<Self> {
        if object.source_key().is_none() && object.target_key().is_none() {
            return Err(FlowError::MissingRequiredOption(
                "object_copy: object.source_key or object.target_key".to_string(),
            ));
        }
        Ok(Self {
            settings: ObjectOnlySettings { object },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or neither key is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: ObjectOnlySettings = config.decode()?;
        Self::new(settings.object)
    }

    fn copy(&self, msg: &mut Message) -> Result<()> {
        let object = &self.settings.object;
        match (object.source_key(), object.target_key()) {
            (Some(source), target) => {
                let value = msg.get_value(source);
                if !value.exists() {
                    return Ok(());
                }
                match target {
                    Some(target) => msg.set_value(target, value.into_json())?,
                    None => {
                        msg.set_data(value.bytes());
                    }
                }
            }
            (None, Some(target)) => {
                let data = msg.data().to_vec();
                msg.set_data(Vec::new());
                msg.set_bytes(target, &data)?;
            }
            (None, None) => {}
        }
        Ok(())
    }
}

impl Transformer for ObjectCopy {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if !msg.is_control() {
                self.copy(&mut msg)?;
            }
            Ok(vec![msg])
        })
    }
}

impl fmt::Display for ObjectCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "object_copy", &self.settings)
    }
}

/// Settings of [`ObjectInsert`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectInsertSettings {
    pub object: ObjectSettings,
    /// Value written at `object.target_key`.
    pub value: Json,
}

/// Writes a constant value at `object.target_key`.
#[derive(Debug, Clone)]
pub struct ObjectInsert {
    settings: ObjectInsertSettings,
}

impl ObjectInsert {
    /// # Errors
    ///
    /// Fails if `target_key` is empty.
    pub fn new(target_key: impl Into<String>, value: impl Into<Json>) -> Result<Self> {
        let object = ObjectSettings {
            source_key: String::new(),
            target_key: target_key.into(),
        };
        if object.target_key().is_none() {
            return Err(FlowError::MissingRequiredOption(
                "object_insert: object.target_key".to_string(),
            ));
        }
        Ok(Self {
            settings: ObjectInsertSettings {
                object,
                value: value.into(),
            },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or `target_key` is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: ObjectInsertSettings = config.decode()?;
        Self::new(settings.object.target_key, settings.value)
    }
}

impl Transformer for ObjectInsert {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            msg.set_value(&self.settings.object.target_key, self.settings.value.clone())?;
            Ok(vec![msg])
        })
    }
}

impl fmt::Display for ObjectInsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "object_insert", &self.settings)
    }
}

/// Removes the value at `object.source_key`.
#[derive(Debug, Clone)]
pub struct ObjectDelete {
    settings: ObjectOnlySettings,
}

impl ObjectDelete {
    /// # Errors
    ///
    /// Fails if `source_key` is empty.
    pub fn new(source_key: impl Into<String>) -> Result<Self> {
        let object = ObjectSettings::source(source_key);
        if object.source_key().is_none() {
            return Err(FlowError::MissingRequiredOption(
                "object_delete: object.source_key".to_string(),
            ));
        }
        Ok(Self {
            settings: ObjectOnlySettings { object },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or `source_key` is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: ObjectOnlySettings = config.decode()?;
        Self::new(settings.object.source_key)
    }
}

impl Transformer for ObjectDelete {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            msg.delete_value(&self.settings.object.source_key)?;
            Ok(vec![msg])
        })
    }
}

impl fmt::Display for ObjectDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "object_delete", &self.settings)
    }
}

/// Rewrites the payload, or the string at `source_key`, with `map`.
///
/// The result goes to `target_key`, or back to `source_key` when unset. A
/// missing source value leaves the message untouched.
fn map_text(msg: &mut Message, object: &ObjectSettings, map: impl Fn(&str) -> String) -> Result<()> {
    let Some(source) = object.source_key() else {
        let text = map(&String::from_utf8_lossy(msg.data()));
        msg.set_data(text);
        return Ok(());
    };

    let value = msg.get_value(source);
    if !value.exists() {
        return Ok(());
    }
    let text = map(&value.string());
    msg.set_value(object.target_key().unwrap_or(source), text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    Upper,
    Lower,
}

impl Casing {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Upper => "string_to_upper",
            Self::Lower => "string_to_lower",
        }
    }
}

/// Changes the case of the payload or a string field.
#[derive(Debug, Clone)]
pub struct StringCase {
    casing: Casing,
    settings: ObjectOnlySettings,
}

impl StringCase {
    #[must_use]
    pub const fn new(casing: Casing, object: ObjectSettings) -> Self {
        Self {
            casing,
            settings: ObjectOnlySettings { object },
        }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(casing: Casing, config: &Config) -> Result<Self> {
        let settings: ObjectOnlySettings = config.decode()?;
        Ok(Self::new(casing, settings.object))
    }
}

impl Transformer for StringCase {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if !msg.is_control() {
                match self.casing {
                    Casing::Upper => map_text(&mut msg, &self.settings.object, str::to_uppercase)?,
                    Casing::Lower => map_text(&mut msg, &self.settings.object, str::to_lowercase)?,
                }
            }
            Ok(vec![msg])
        })
    }
}

impl fmt::Display for StringCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, self.casing.type_name(), &self.settings)
    }
}

/// Settings of [`StringAppend`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StringAppendSettings {
    pub object: ObjectSettings,
    pub suffix: String,
}

/// Appends a suffix to the payload or a string field.
#[derive(Debug, Clone)]
pub struct StringAppend {
    settings: StringAppendSettings,
}

impl StringAppend {
    /// # Errors
    ///
    /// Fails if `suffix` is empty.
    pub fn new(suffix: impl Into<String>, object: ObjectSettings) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() {
            return Err(FlowError::MissingRequiredOption(
                "string_append: suffix".to_string(),
            ));
        }
        Ok(Self {
            settings: StringAppendSettings { object, suffix },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or `suffix` is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: StringAppendSettings = config.decode()?;
        Self::new(settings.suffix, settings.object)
    }
}

impl Transformer for StringAppend {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if !msg.is_control() {
                let suffix = &self.settings.suffix;
                map_text(&mut msg, &self.settings.object, |text| format!("{text}{suffix}"))?;
            }
            Ok(vec![msg])
        })
    }
}

impl fmt::Display for StringAppend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "string_append", &self.settings)
    }
}

/// Settings of [`StringSplit`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StringSplitSettings {
    pub object: ObjectSettings,
    pub separator: String,
}

/// Splits text on a separator.
///
/// Without `source_key` every piece of the payload becomes a message of its
/// own, carrying the original metadata. With `source_key` the pieces are
/// written as an array to `target_key` (or back to `source_key`).
#[derive(Debug, Clone)]
pub struct StringSplit {
    settings: StringSplitSettings,
}

impl StringSplit {
    /// # Errors
    ///
    /// Fails if `separator` is empty.
    pub fn new(separator: impl Into<String>, object: ObjectSettings) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(FlowError::MissingRequiredOption(
                "string_split: separator".to_string(),
            ));
        }
        Ok(Self {
            settings: StringSplitSettings { object, separator },
        })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or `separator` is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: StringSplitSettings = config.decode()?;
        Self::new(settings.separator, settings.object)
    }

    fn split(&self, mut msg: Message) -> Result<Vec<Message>> {
        let separator = self.settings.separator.as_str();
        let object = &self.settings.object;

        let Some(source) = object.source_key() else {
            let text = String::from_utf8_lossy(msg.data()).into_owned();
            let pieces: Vec<_> = text
                .split(separator)
                .map(|piece| msg.derive(piece.to_string()))
                .collect();
            debug!(pieces = pieces.len(), "Split payload");
            return Ok(pieces);
        };

        let value = msg.get_value(source);
        if !value.exists() {
            return Ok(vec![msg]);
        }
        let pieces: Vec<Json> = value
            .string()
            .split(separator)
            .map(|piece| Json::String(piece.to_string()))
            .collect();
        msg.set_value(object.target_key().unwrap_or(source), Json::Array(pieces))?;
        Ok(vec![msg])
    }
}

impl Transformer for StringSplit {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            self.split(msg)
        })
    }
}

impl fmt::Display for StringSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "string_split", &self.settings)
    }
}
