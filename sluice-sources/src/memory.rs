//! Source backed by a fixed list of payloads.

use bytes::Bytes;
use sluice_core::{Context, FlowFuture, Message, Source, SourceReceiver};
use tracing::debug;

/// Emits one data message per payload, in order, every time it is streamed.
///
/// # Examples
///
/// ```
/// use sluice_core::{Context, Source};
/// use sluice_sources::MemorySource;
///
/// # tokio_test::block_on(async {
/// let source = MemorySource::new(["a", "b"]);
/// let rx = source.stream(&Context::new()).await.unwrap();
///
/// let payloads: Vec<String> = rx.drain().map(|m| m.unwrap().to_string()).collect();
/// assert_eq!(payloads, vec!["a", "b"]);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    payloads: Vec<Bytes>,
    metadata: Option<Bytes>,
}

impl MemorySource {
    /// Creates a source over `payloads`.
    pub fn new<I, B>(payloads: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            payloads: payloads.into_iter().map(Into::into).collect(),
            metadata: None,
        }
    }

    /// Attaches `metadata` to every emitted message.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Number of payloads the source emits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Whether the source emits nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl Source for MemorySource {
    fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            let (tx, rx) = flume::unbounded();
            for payload in &self.payloads {
                let mut msg = Message::new().with_data(payload.clone());
                if let Some(metadata) = &self.metadata {
                    msg.set_metadata(metadata.clone());
                }
                // The receiver is held locally, so the send cannot fail.
                let _ = tx.send(Ok(msg));
            }
            debug!(messages = self.payloads.len(), "Memory source loaded");
            Ok(rx)
        })
    }
}
