//! Leaf inspectors.
//!
//! Each inspector reads the payload, or the value at `object.source_key`, and
//! compares it against its settings. `negate` inverts the result. Control
//! messages never pass.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sluice_core::config::fmt_component;
use sluice_core::message::bytes_to_json;
use sluice_core::{
    ConditionFuture, Config, Context, FlowError, Inspector, Message, ObjectSettings, Result, Value,
};

/// The inspected text: the value at `source_key`, or the payload.
fn text(msg: &Message, object: &ObjectSettings) -> String {
    match object.source_key() {
        Some(key) => msg.get_value(key).string(),
        None => String::from_utf8_lossy(msg.data()).into_owned(),
    }
}

/// The inspected value: the value at `source_key`, or the payload read as JSON.
fn value(msg: &Message, object: &ObjectSettings) -> Value {
    match object.source_key() {
        Some(key) => msg.get_value(key),
        None => Value::from(bytes_to_json(msg.data())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Contains,
    EqualTo,
    StartsWith,
    EndsWith,
}

impl StringOp {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Contains => "string_contains",
            Self::EqualTo => "string_equal_to",
            Self::StartsWith => "string_starts_with",
            Self::EndsWith => "string_ends_with",
        }
    }

    fn matches(self, text: &str, value: &str) -> bool {
        match self {
            Self::Contains => text.contains(value),
            Self::EqualTo => text == value,
            Self::StartsWith => text.starts_with(value),
            Self::EndsWith => text.ends_with(value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StringSettings {
    pub object: ObjectSettings,
    pub value: String,
    pub negate: bool,
}

/// Compares text against a fixed string.
#[derive(Debug, Clone)]
pub struct StringInspector {
    op: StringOp,
    settings: StringSettings,
}

impl StringInspector {
    #[must_use]
    pub const fn new(op: StringOp, settings: StringSettings) -> Self {
        Self { op, settings }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(op: StringOp, config: &Config) -> Result<Self> {
        Ok(Self::new(op, config.decode()?))
    }
}

impl Inspector for StringInspector {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(false);
            }
            let matched = self
                .op
                .matches(&text(msg, &self.settings.object), &self.settings.value);
            Ok(matched != self.settings.negate)
        })
    }
}

impl fmt::Display for StringInspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, self.op.type_name(), &self.settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StringMatchSettings {
    pub object: ObjectSettings,
    /// Regular expression searched for in the text.
    pub pattern: String,
    pub negate: bool,
}

/// Searches text for a regular expression.
#[derive(Debug, Clone)]
pub struct StringMatch {
    settings: StringMatchSettings,
    regex: Regex,
}

impl StringMatch {
    /// # Errors
    ///
    /// Fails if `pattern` is empty or does not compile.
    pub fn new(settings: StringMatchSettings) -> Result<Self> {
        if settings.pattern.is_empty() {
            return Err(FlowError::MissingRequiredOption(
                "string_match: pattern".to_string(),
            ));
        }
        let regex = Regex::new(&settings.pattern)?;
        Ok(Self { settings, regex })
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode or the pattern is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.decode()?)
    }
}

impl Inspector for StringMatch {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(false);
            }
            let matched = self.regex.is_match(&text(msg, &self.settings.object));
            Ok(matched != self.settings.negate)
        })
    }
}

impl fmt::Display for StringMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "string_match", &self.settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOp {
    EqualTo,
    GreaterThan,
    LessThan,
}

impl NumberOp {
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::EqualTo => "number_equal_to",
            Self::GreaterThan => "number_greater_than",
            Self::LessThan => "number_less_than",
        }
    }

    #[allow(clippy::float_cmp)]
    fn matches(self, number: f64, value: f64) -> bool {
        match self {
            Self::EqualTo => number == value,
            Self::GreaterThan => number > value,
            Self::LessThan => number < value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberSettings {
    pub object: ObjectSettings,
    pub value: f64,
    pub negate: bool,
}

/// Compares a number against a fixed value.
///
/// Values that are not numbers, including missing ones, read as zero.
#[derive(Debug, Clone)]
pub struct NumberInspector {
    op: NumberOp,
    settings: NumberSettings,
}

impl NumberInspector {
    #[must_use]
    pub const fn new(op: NumberOp, settings: NumberSettings) -> Self {
        Self { op, settings }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(op: NumberOp, config: &Config) -> Result<Self> {
        Ok(Self::new(op, config.decode()?))
    }
}

impl Inspector for NumberInspector {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(false);
            }
            let number = value(msg, &self.settings.object).float();
            let matched = self.op.matches(number, self.settings.value);
            Ok(matched != self.settings.negate)
        })
    }
}

impl fmt::Display for NumberInspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, self.op.type_name(), &self.settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatJsonSettings {
    pub object: ObjectSettings,
    pub negate: bool,
}

/// Passes when the inspected text is valid JSON.
#[derive(Debug, Clone, Default)]
pub struct FormatJson {
    settings: FormatJsonSettings,
}

impl FormatJson {
    #[must_use]
    pub const fn new(settings: FormatJsonSettings) -> Self {
        Self { settings }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.decode()?))
    }
}

impl Inspector for FormatJson {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(false);
            }
            let valid = match self.settings.object.source_key() {
                Some(key) => {
                    let value = msg.get_value(key);
                    value.exists() && serde_json::from_slice::<Json>(&value.bytes()).is_ok()
                }
                None => serde_json::from_slice::<Json>(msg.data()).is_ok(),
            };
            Ok(valid != self.settings.negate)
        })
    }
}

impl fmt::Display for FormatJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "format_json", &self.settings)
    }
}
