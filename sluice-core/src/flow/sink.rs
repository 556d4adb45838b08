use super::types::{Context, FlowFuture};
use crate::message::Message;

/// Consumes the data messages a pipeline's chain emits.
///
/// Workers call `sink` concurrently; implementations serialize their own
/// writes.
pub trait Sink: Send + Sync {
    fn sink<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, ()>;

    /// Called once after the flush barrier has drained.
    fn close<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}
