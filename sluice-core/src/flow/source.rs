use super::types::{Context, FlowFuture, SourceReceiver};

/// Produces the data messages of a pipeline run.
///
/// Implementations spawn their own ingest task and close the bus by dropping
/// the sender once input is exhausted. They never send control messages.
pub trait Source: Send + Sync {
    fn stream<'a>(&'a self, ctx: &'a Context) -> FlowFuture<'a, SourceReceiver>;
}
