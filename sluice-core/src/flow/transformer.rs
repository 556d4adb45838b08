use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::types::{Context, FlowFuture};
use crate::error::Result;
use crate::message::Message;

/// A configured stage that maps one message to zero or more messages.
///
/// Transformers are shared by every worker of a pipeline, so any mutable
/// state must be synchronized internally. Unless a transformer reacts to
/// end-of-stream, it returns a control message unchanged. `Display` renders
/// the transformer's configuration.
pub trait Transformer: fmt::Display + Send + Sync {
    fn transform<'a>(&'a self, ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>>;
}

pub type SharedTransformer = Arc<dyn Transformer>;

/// Applies a chain of transformers to a set of messages.
///
/// Each stage runs over the whole working set in order and the flattened
/// outputs become the next working set. The first error aborts the chain and
/// no partial output is returned. An empty chain returns its input.
///
/// # Errors
///
/// Returns the first error raised by any transformer in the chain.
pub async fn apply(
    ctx: &Context,
    transformers: &[SharedTransformer],
    msgs: Vec<Message>,
) -> Result<Vec<Message>> {
    let mut results = msgs;
    for (stage, transformer) in transformers.iter().enumerate() {
        if results.is_empty() {
            break;
        }

        let mut next = Vec::with_capacity(results.len());
        for msg in results {
            next.extend(transformer.transform(ctx, msg).await?);
        }
        trace!(stage, outputs = next.len(), "Applied transform stage");
        results = next;
    }
    Ok(results)
}
