//! Source reading newline-delimited records.

use std::path::PathBuf;

use bytes::Bytes;
use sluice_core::{Context, FlowError, FlowFuture, Message, Source, SourceReceiver};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Default capacity of the bus between the reader task and the pipeline.
pub const DEFAULT_CAPACITY: usize = 1024;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

enum Input {
    Path(PathBuf),
    Reader(Mutex<Option<BoxedReader>>),
}

/// Emits one data message per line of a file or reader.
///
/// Line endings are stripped and empty lines skipped. A read failure is sent
/// on the bus as an error and ends the stream. A path-backed source can be
/// streamed repeatedly; a reader-backed one only once.
pub struct LineSource {
    input: Input,
    metadata: Option<Bytes>,
    capacity: usize,
}

impl LineSource {
    /// Reads lines from the file at `path`, opened when the source is streamed.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_input(Input::Path(path.into()))
    }

    /// Reads lines from `reader`.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::with_input(Input::Reader(Mutex::new(Some(Box::new(reader)))))
    }

    const fn with_input(input: Input) -> Self {
        Self {
            input,
            metadata: None,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Attaches `metadata` to every emitted message.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Sets how many lines may be read ahead of the pipeline.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    async fn open(&self) -> Result<BoxedReader, SourceError> {
        match &self.input {
            Input::Path(path) => {
                let file = File::open(path)
                    .await
                    .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
                Ok(Box::new(file))
            }
            Input::Reader(slot) => slot.lock().await.take().ok_or(SourceError::Consumed),
        }
    }
}

impl Source for LineSource {
    fn stream<'a>(&'a self, ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            let reader = self.open().await?;
            let (tx, rx) = flume::bounded(self.capacity.max(1));
            let metadata = self.metadata.clone();
            let ctx = ctx.clone();

            tokio::spawn(async move {
                let mut lines = BufReader::new(reader).lines();
                let mut sent = 0_usize;
                loop {
                    let line = tokio::select! {
                        biased;
                        () = ctx.cancelled() => break,
                        line = lines.next_line() => line,
                    };

                    let item = match line {
                        Ok(Some(line)) if line.is_empty() => continue,
                        Ok(Some(line)) => {
                            let mut msg = Message::new().with_data(line);
                            if let Some(metadata) = &metadata {
                                msg.set_metadata(metadata.clone());
                            }
                            Ok(msg)
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(error = %e, "Failed to read line");
                            Err(FlowError::from(SourceError::from(e)))
                        }
                    };

                    let failed = item.is_err();
                    let sent_ok = tokio::select! {
                        biased;
                        () = ctx.cancelled() => false,
                        sent = tx.send_async(item) => sent.is_ok(),
                    };
                    if !sent_ok || failed {
                        break;
                    }
                    sent += 1;
                }
                debug!(lines = sent, "Line source finished");
            });

            Ok(rx)
        })
    }
}
