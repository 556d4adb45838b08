//! Sink printing one line per message to standard output.

use sluice_core::{Context, FlowFuture, Message, Sink};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::error::SinkError;

/// Prints each message's payload followed by a newline.
#[derive(Debug)]
pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl StdoutSink {
    /// Creates a sink writing to the process's standard output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for StdoutSink {
    fn sink<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(());
            }
            let mut line = msg.data().to_vec();
            line.push(b'\n');
            let mut out = self.out.lock().await;
            out.write_all(&line).await.map_err(SinkError::from)?;
            Ok(())
        })
    }

    fn close<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            self.out.lock().await.flush().await.map_err(SinkError::from)?;
            Ok(())
        })
    }
}
