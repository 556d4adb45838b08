use std::sync::Arc;

use tracing::{debug, instrument};

use super::Pipeline;
use crate::flow::transformer::{SharedTransformer, Transformer};
use crate::transform::{Case, MetaSwitch};

/// Builds the fallback case of a conditional stage.
///
/// Messages that match none of the earlier cases are applied to the
/// transforms added here. Without any, they pass through unchanged.
pub struct OtherwiseBuilder {
    cases: Vec<Case>,
    else_branch: Vec<SharedTransformer>,
    parent: Pipeline,
}

impl OtherwiseBuilder {
    #[instrument(skip_all)]
    pub(crate) fn new(cases: Vec<Case>, parent: Pipeline) -> Self {
        debug!("Creating new otherwise builder");
        Self {
            cases,
            else_branch: Vec::new(),
            parent,
        }
    }

    #[instrument(skip_all)]
    #[must_use]
    pub fn transform<T>(mut self, transformer: T) -> Self
    where
        T: Transformer + 'static,
    {
        debug!("Adding transform to else branch");
        self.else_branch.push(Arc::new(transformer));
        self
    }

    #[instrument(skip_all)]
    #[must_use]
    pub fn end(self) -> Pipeline {
        debug!("Finalizing branch construction");
        let mut cases = self.cases;
        if !self.else_branch.is_empty() {
            cases.push(Case::otherwise(self.else_branch));
        }

        let pipeline = self
            .parent
            .stage(Arc::new(MetaSwitch::from_cases(cases)));
        debug!("Branch added to pipeline");
        pipeline
    }
}
