//! The unit of data that flows through a pipeline.

pub mod path;
mod value;

use std::fmt;

use base64::Engine as _;
use bytes::Bytes;
use serde_json::Value as Json;

use crate::error::{FlowError, Result};

pub use self::path::THIS;
pub use self::value::Value;

/// Key prefix that addresses the metadata field instead of the data field.
const META_PREFIX: &str = "meta ";

/// Data handled by transforms and interpreted by inspectors.
///
/// The payload can be handled as raw bytes (`data`/`set_data`) or, when it
/// holds JSON text, addressed by path (`get_value`/`set_value`). Keys prefixed
/// with `"meta "` address the metadata field the same way.
///
/// A control message carries no data or metadata. It signals the end of a
/// stream so buffering transforms can flush; setters ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    data: Bytes,
    meta: Bytes,
    control: bool,
}

enum Field {
    Data,
    Meta,
}

fn resolve(key: &str) -> (Field, &str) {
    match key.strip_prefix(META_PREFIX) {
        Some(rest) => (Field::Meta, rest.trim()),
        None => (Field::Data, key.trim()),
    }
}

impl Message {
    /// An empty data message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new control message.
    #[must_use]
    pub fn control() -> Self {
        Self::new().as_control()
    }

    /// Turns this message into a control message, dropping data and metadata.
    #[must_use]
    pub fn as_control(mut self) -> Self {
        self.data = Bytes::new();
        self.meta = Bytes::new();
        self.control = true;
        self
    }

    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.control
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.set_data(data);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, meta: impl Into<Bytes>) -> Self {
        self.set_metadata(meta);
        self
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<Bytes>) -> &mut Self {
        if !self.control {
            self.data = data.into();
        }
        self
    }

    #[must_use]
    pub fn metadata(&self) -> &[u8] {
        &self.meta
    }

    pub fn set_metadata(&mut self, meta: impl Into<Bytes>) -> &mut Self {
        if !self.control {
            self.meta = meta.into();
        }
        self
    }

    /// A new data message holding `data` and a copy of this message's metadata.
    #[must_use]
    pub fn derive(&self, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            meta: self.meta.clone(),
            control: false,
        }
    }

    fn field(&self, field: &Field) -> &Bytes {
        match field {
            Field::Data => &self.data,
            Field::Meta => &self.meta,
        }
    }

    /// Reads the value at `key`. Missing keys and non-JSON payloads yield a
    /// value that does not exist.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Value {
        let (field, key) = resolve(key);
        let segments = path::segments(key);
        if segments.is_empty() && key != THIS {
            return Value::missing();
        }

        serde_json::from_slice::<Json>(self.field(&field))
            .ok()
            .and_then(|doc| path::get(&doc, &segments))
            .map_or_else(Value::missing, Value::from)
    }

    /// Writes `value` at `key`, creating intermediate objects and arrays.
    ///
    /// # Errors
    ///
    /// Fails if the current payload is not empty and not a JSON object or
    /// array, or if the path addresses an array with a non-numeric key.
    pub fn set_value(&mut self, key: &str, value: impl Into<Json>) -> Result<()> {
        if self.control {
            return Ok(());
        }

        let (field, key) = resolve(key);
        let segments = path::segments(key);
        if segments.is_empty() && key != THIS {
            return Err(FlowError::Message("empty key".to_string()));
        }

        let current = self.field(&field);
        let mut doc = if current.is_empty() || segments.is_empty() {
            Json::Object(serde_json::Map::new())
        } else {
            let doc: Json = serde_json::from_slice(current)
                .map_err(|e| FlowError::Message(format!("payload is not valid JSON: {e}")))?;
            if !doc.is_object() && !doc.is_array() {
                return Err(FlowError::Message(
                    "payload is not a JSON object or array".to_string(),
                ));
            }
            doc
        };

        path::set(&mut doc, &segments, value.into())?;
        let encoded = serde_json::to_vec(&doc).map_err(|e| FlowError::Message(e.to_string()))?;
        match field {
            Field::Data => self.data = Bytes::from(encoded),
            Field::Meta => self.meta = Bytes::from(encoded),
        }
        Ok(())
    }

    /// Writes already-encoded JSON text at `key`.
    ///
    /// # Errors
    ///
    /// Fails if `raw` is not valid JSON or the write itself fails.
    pub fn set_raw(&mut self, key: &str, raw: &[u8]) -> Result<()> {
        let value: Json = serde_json::from_slice(raw)
            .map_err(|e| FlowError::Message(format!("value is not valid JSON: {e}")))?;
        self.set_value(key, value)
    }

    /// Writes bytes at `key`: valid JSON is embedded as JSON, other UTF-8
    /// text is stored as a string and anything else as base64.
    ///
    /// # Errors
    ///
    /// Fails if the write itself fails.
    pub fn set_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let value = bytes_to_json(bytes);
        self.set_value(key, value)
    }

    /// Removes the value at `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not empty and not valid JSON.
    pub fn delete_value(&mut self, key: &str) -> Result<()> {
        if self.control {
            return Ok(());
        }

        let (field, key) = resolve(key);
        let segments = path::segments(key);
        let current = self.field(&field);
        if current.is_empty() || segments.is_empty() {
            return Ok(());
        }

        let mut doc: Json = serde_json::from_slice(current)
            .map_err(|e| FlowError::Message(format!("payload is not valid JSON: {e}")))?;
        if !path::delete(&mut doc, &segments) {
            return Ok(());
        }

        let encoded = serde_json::to_vec(&doc).map_err(|e| FlowError::Message(e.to_string()))?;
        match field {
            Field::Data => self.data = Bytes::from(encoded),
            Field::Meta => self.meta = Bytes::from(encoded),
        }
        Ok(())
    }
}

/// Interprets bytes as a JSON value: valid JSON text is parsed, other UTF-8
/// text becomes a string and anything else is base64 encoded.
#[must_use]
pub fn bytes_to_json(bytes: &[u8]) -> Json {
    if let Ok(value) = serde_json::from_slice::<Json>(bytes) {
        return value;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Json::String(text.to_string()),
        Err(_) => Json::String(base64::engine::general_purpose::STANDARD.encode(bytes)),
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}
