//! Buffering transforms that release data in batches.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sluice_core::config::fmt_component;
use sluice_core::message::bytes_to_json;
use sluice_core::{Config, Context, FlowFuture, Message, ObjectSettings, Result, Transformer};
use tokio::sync::Mutex;
use tracing::debug;

/// Settings of [`AggregateToArray`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSettings {
    /// `target_key` receives the array; unset makes the array the payload.
    pub object: ObjectSettings,
    /// Items per batch. Zero buffers until the next control message.
    pub count: usize,
}

/// Collects the payloads of data messages into JSON arrays.
///
/// A batch is emitted as a new message once `count` items are buffered. A
/// control message emits whatever is buffered, followed by the control
/// message itself.
#[derive(Debug)]
pub struct AggregateToArray {
    settings: AggregateSettings,
    buffer: Mutex<Vec<Json>>,
}

impl AggregateToArray {
    #[must_use]
    pub fn new(count: usize, object: ObjectSettings) -> Self {
        Self {
            settings: AggregateSettings { object, count },
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// # Errors
    ///
    /// Fails if the settings do not decode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings: AggregateSettings = config.decode()?;
        Ok(Self::new(settings.count, settings.object))
    }

    fn batch(&self, items: Vec<Json>) -> Result<Message> {
        let array = Json::Array(items);
        match self.settings.object.target_key() {
            Some(target) => {
                let mut msg = Message::new();
                msg.set_value(target, array)?;
                Ok(msg)
            }
            None => Ok(Message::new().with_data(array.to_string())),
        }
    }

    async fn flush(&self, control: Message) -> Result<Vec<Message>> {
        let items = std::mem::take(&mut *self.buffer.lock().await);
        let mut out = Vec::with_capacity(2);
        if !items.is_empty() {
            debug!(items = items.len(), "Flushing aggregate");
            out.push(self.batch(items)?);
        }
        out.push(control);
        Ok(out)
    }

    async fn add(&self, msg: &Message) -> Result<Vec<Message>> {
        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(bytes_to_json(msg.data()));
            if self.settings.count > 0 && buffer.len() >= self.settings.count {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        match full {
            Some(items) => Ok(vec![self.batch(items)?]),
            None => Ok(Vec::new()),
        }
    }
}

impl Transformer for AggregateToArray {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return self.flush(msg).await;
            }
            self.add(&msg).await
        })
    }
}

impl fmt::Display for AggregateToArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_component(f, "aggregate_to_array", &self.settings)
    }
}
