use std::fmt;
use std::sync::Arc;

use super::types::{ConditionFuture, Context};
use crate::message::Message;

/// A boolean predicate evaluated against a message.
///
/// Leaf inspectors return `false` for control messages. `Display` renders the
/// inspector's configuration.
pub trait Inspector: fmt::Display + Send + Sync {
    fn inspect<'a>(&'a self, ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a>;
}

pub type SharedInspector = Arc<dyn Inspector>;
