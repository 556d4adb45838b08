//! Sink writing one line per message to a file.

use sluice_core::{Context, FlowFuture, Message, Sink};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SinkError};
use crate::types::FileSinkConfig;

/// Writes each message's payload followed by a newline.
///
/// Writes from concurrent workers are serialized; output is buffered and
/// flushed when the pipeline closes the sink.
#[derive(Debug)]
pub struct FileSink {
    config: FileSinkConfig,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Opens the file described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened for writing.
    pub async fn open(config: FileSinkConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)
            .await
            .map_err(|e| SinkError::Io(format!("{}: {e}", config.path.display())))?;

        debug!(path = %config.path.display(), append = config.append, "Opened file sink");
        Ok(Self {
            config,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// The configuration the sink was opened with.
    #[must_use]
    pub const fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    async fn write(&self, msg: &Message) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(msg.data()).await?;
        writer.write_all(b"\n").await?;
        Ok(())
    }
}

impl Sink for FileSink {
    fn sink<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(());
            }
            Ok(self.write(&msg).await?)
        })
    }

    fn close<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            let mut writer = self.writer.lock().await;
            writer.flush().await.map_err(SinkError::from)?;
            Ok(())
        })
    }
}
