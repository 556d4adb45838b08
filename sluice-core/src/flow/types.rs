use std::future::Future;
use std::pin::Pin;

use flume::Receiver;
use tokio_util::sync::CancellationToken;

use crate::error::FlowError;
use crate::message::Message;

// For general flow operations
pub type FlowFuture<'a, T, E = FlowError> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

// For inspector evaluations specifically
pub type ConditionFuture<'a, E = FlowError> = FlowFuture<'a, bool, E>;

/// Receiving half of the message bus. Sources report ingest failures in-band.
pub type SourceReceiver = Receiver<Result<Message, FlowError>>;

/// Cancellable context shared by a pipeline run and every component it drives.
pub type Context = CancellationToken;
