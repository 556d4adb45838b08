//! Sink keeping every message in memory.

use std::sync::Arc;

use sluice_core::{Context, FlowFuture, Message, Sink};
use tokio::sync::Mutex;

/// Collects messages in arrival order.
///
/// Clones share the same buffer, so a handle kept by the caller observes what
/// the pipeline wrote.
///
/// # Examples
///
/// ```
/// use sluice_core::{Context, Message, Sink};
/// use sluice_sinks::CollectSink;
///
/// # tokio_test::block_on(async {
/// let sink = CollectSink::new();
/// let handle = sink.clone();
/// let ctx = Context::new();
/// sink.sink(&ctx, Message::new().with_data("a")).await.unwrap();
/// sink.close(&ctx).await.unwrap();
///
/// assert_eq!(handle.payloads().await, vec!["a"]);
/// assert!(handle.is_closed().await);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectSink {
    messages: Arc<Mutex<Vec<Message>>>,
    closed: Arc<Mutex<bool>>,
}

impl CollectSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the collected messages.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// The collected payloads as (lossy) UTF-8.
    pub async fn payloads(&self) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Whether the pipeline has closed the sink.
    pub async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }
}

impl Sink for CollectSink {
    fn sink<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            if !msg.is_control() {
                self.messages.lock().await.push(msg);
            }
            Ok(())
        })
    }

    fn close<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            *self.closed.lock().await = true;
            Ok(())
        })
    }
}
