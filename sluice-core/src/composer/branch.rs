use std::sync::Arc;

use tracing::debug;

use super::{OtherwiseBuilder, Pipeline};
use crate::flow::inspector::{Inspector, SharedInspector};
use crate::flow::transformer::{SharedTransformer, Transformer};
use crate::transform::{Case, MetaSwitch};

/// A builder for a conditional stage of a pipeline.
///
/// Each `when` opens a case; the first case whose condition passes handles
/// the message. `end` adds the finished stage to the pipeline as a
/// `meta_switch`.
///
/// # Examples
///
/// ```
/// use sluice_core::condition::Always;
/// use sluice_core::Pipeline;
///
/// let pipeline = Pipeline::new()
///     .when(Always)
///     .otherwise()
///     .end();
/// assert_eq!(pipeline.transforms().len(), 1);
/// ```
pub struct BranchBuilder {
    cases: Vec<Case>,
    condition: SharedInspector,
    then_branch: Vec<SharedTransformer>,
    parent: Pipeline,
}

impl BranchBuilder {
    #[must_use]
    pub(crate) fn new(condition: SharedInspector, parent: Pipeline) -> Self {
        debug!("Creating new branch builder");
        Self {
            cases: Vec::new(),
            condition,
            then_branch: Vec::new(),
            parent,
        }
    }

    /// Adds a transform to the current case.
    #[must_use]
    pub fn transform<T>(mut self, transformer: T) -> Self
    where
        T: Transformer + 'static,
    {
        debug!("Adding transform to then branch");
        self.then_branch.push(Arc::new(transformer));
        self
    }

    /// Closes the current case and opens another, tried only if every
    /// earlier case failed.
    #[must_use]
    pub fn when<I>(mut self, condition: I) -> Self
    where
        I: Inspector + 'static,
    {
        debug!("Adding case");
        self.close_case();
        self.condition = Arc::new(condition);
        self
    }

    /// Closes the current case and starts the fallback case.
    #[must_use]
    pub fn otherwise(mut self) -> OtherwiseBuilder {
        debug!("Creating otherwise builder");
        self.close_case();
        OtherwiseBuilder::new(self.cases, self.parent)
    }

    /// Closes the current case and returns to the pipeline.
    #[must_use]
    pub fn end(mut self) -> Pipeline {
        debug!("Ending branch");
        self.close_case();
        self.parent
            .stage(Arc::new(MetaSwitch::from_cases(self.cases)))
    }

    fn close_case(&mut self) {
        let transformers = std::mem::take(&mut self.then_branch);
        self.cases
            .push(Case::when(Arc::clone(&self.condition), transformers));
    }
}
