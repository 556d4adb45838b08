use std::sync::Arc;

use serde_json::Value as Json;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::BranchBuilder;
use crate::config::{describe, PipelineConfig};
use crate::error::{FlowError, Result};
use crate::flow::inspector::Inspector;
use crate::flow::sink::Sink;
use crate::flow::source::Source;
use crate::flow::transformer::{apply, SharedTransformer, Transformer};
use crate::flow::types::Context;
use crate::message::Message;
use crate::registry::Registry;

/// Counts reported by a completed pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Data messages received from the source.
    pub ingested: usize,
    /// Data messages delivered to the sink, including those emitted on flush.
    pub emitted: usize,
}

/// A source, a chain of transforms and an optional sink, run concurrently.
///
/// Data messages are read from the source and each one is applied to the
/// whole chain by one of `concurrency` workers, so data messages are not
/// ordered relative to each other. Once the source is exhausted and every
/// worker has finished, a single control message is applied to the chain
/// so buffering transforms can flush.
///
/// # Examples
///
/// ```
/// use sluice_core::{Context, Message, Pipeline};
/// use sluice_core::flow::source::Source;
/// use sluice_core::flow::types::{FlowFuture, SourceReceiver};
///
/// struct OneMessage;
///
/// impl Source for OneMessage {
///     fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
///         Box::pin(async move {
///             let (tx, rx) = flume::unbounded();
///             let _ = tx.send(Ok(Message::new().with_data("hello")));
///             Ok(rx)
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let summary = Pipeline::new()
///     .source(OneMessage)
///     .concurrency(1)
///     .run(&Context::new())
///     .await
///     .unwrap();
/// assert_eq!(summary.ingested, 1);
/// assert_eq!(summary.emitted, 1);
/// # });
/// ```
pub struct Pipeline {
    pub(crate) source: Option<Arc<dyn Source>>,
    pub(crate) transformers: Vec<SharedTransformer>,
    pub(crate) sink: Option<Arc<dyn Sink>>,
    pub(crate) concurrency: Option<usize>,
}

impl Pipeline {
    /// Creates a new empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            transformers: Vec::new(),
            sink: None,
            concurrency: None,
        }
    }

    /// Builds the transform chain and worker count from a configuration.
    ///
    /// # Errors
    ///
    /// Fails if no transforms are configured, the concurrency is invalid, or
    /// any transform cannot be constructed.
    pub fn from_config(registry: &Registry, config: &PipelineConfig) -> Result<Self> {
        if config.transforms.is_empty() {
            return Err(FlowError::MissingRequiredOption("transforms".to_string()));
        }

        let mut pipeline = Self::new();
        pipeline.transformers = registry.new_transformers(&config.transforms)?;
        pipeline.concurrency = Some(config.resolve_concurrency()?);
        Ok(pipeline)
    }

    /// Sets the source that produces data messages.
    #[must_use]
    pub fn source<S>(mut self, source: S) -> Self
    where
        S: Source + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Appends a transform to the chain.
    #[must_use]
    pub fn transform<T>(self, transformer: T) -> Self
    where
        T: Transformer + 'static,
    {
        self.stage(Arc::new(transformer))
    }

    /// Appends an already shared transform to the chain.
    #[must_use]
    pub fn stage(mut self, transformer: SharedTransformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Starts a conditional stage. Messages that pass `condition` are
    /// applied to the transforms added to the returned builder.
    #[must_use]
    pub fn when<I>(self, condition: I) -> BranchBuilder
    where
        I: Inspector + 'static,
    {
        BranchBuilder::new(Arc::new(condition), self)
    }

    /// Sets the sink that receives every data message the chain emits.
    #[must_use]
    pub fn sink<S>(mut self, sink: S) -> Self
    where
        S: Sink + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets the number of messages transformed at the same time.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    #[must_use]
    pub fn transforms(&self) -> &[SharedTransformer] {
        &self.transformers
    }

    fn resolve_concurrency(&self) -> Result<usize> {
        PipelineConfig {
            concurrency: self.concurrency,
            transforms: Vec::new(),
        }
        .resolve_concurrency()
    }

    /// Runs the pipeline until the source is exhausted.
    ///
    /// The first ingest or transform error cancels every other worker and
    /// is returned; nothing is flushed in that case. Cancelling `ctx` stops
    /// the run with `FlowError::Cancelled`.
    ///
    /// # Errors
    ///
    /// Fails if no source is set, the concurrency is zero, the source
    /// cannot start, or any message fails to transform or sink.
    #[instrument(skip_all, fields(concurrency = tracing::field::Empty))]
    pub async fn run(self, ctx: &Context) -> Result<RunSummary> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| FlowError::MissingRequiredOption("source".to_string()))?;
        let concurrency = self.resolve_concurrency()?;
        tracing::Span::current().record("concurrency", concurrency);
        info!(stages = self.transformers.len(), "Starting pipeline");

        let token = ctx.child_token();
        let transformers: Arc<[SharedTransformer]> = self.transformers.into();
        let sink = self.sink;
        let receiver = source.stream(&token).await?;

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut workers: JoinSet<Result<usize>> = JoinSet::new();
        let mut failure: Option<FlowError> = None;
        let mut summary = RunSummary::default();

        loop {
            while let Some(joined) = workers.try_join_next() {
                reap(joined, &token, &mut failure, &mut summary);
            }
            if failure.is_some() {
                break;
            }

            let item = tokio::select! {
                biased;
                () = token.cancelled() => break,
                item = receiver.recv_async() => item,
            };
            let msg = match item {
                Ok(Ok(msg)) => msg,
                Ok(Err(err)) => {
                    error!(error = %err, "Source error");
                    token.cancel();
                    failure = Some(err);
                    break;
                }
                Err(_) => {
                    debug!("Source channel closed");
                    break;
                }
            };

            let permit = tokio::select! {
                biased;
                () = token.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(err) => {
                        token.cancel();
                        failure = Some(FlowError::Custom(err.to_string()));
                        break;
                    }
                },
            };

            summary.ingested += 1;
            let transformers = Arc::clone(&transformers);
            let sink = sink.clone();
            let token = token.clone();
            workers.spawn(async move {
                let _permit = permit;
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => Err(FlowError::Cancelled),
                    result = process(&token, &transformers, sink.as_deref(), msg) => result,
                };
                if result.is_err() {
                    token.cancel();
                }
                result
            });
        }

        while let Some(joined) = workers.join_next().await {
            reap(joined, &token, &mut failure, &mut summary);
        }

        if let Some(err) = failure {
            error!(error = %err, ingested = summary.ingested, "Pipeline failed");
            return Err(err);
        }
        if token.is_cancelled() {
            warn!(ingested = summary.ingested, "Pipeline cancelled");
            return Err(FlowError::Cancelled);
        }

        debug!("Flushing transforms");
        summary.emitted += process(&token, &transformers, sink.as_deref(), Message::control())
            .await
            .map_err(|e| if e.is_cancelled() { FlowError::Cancelled } else { e })?;
        if let Some(sink) = &sink {
            sink.close(&token).await?;
        }

        info!(
            ingested = summary.ingested,
            emitted = summary.emitted,
            "Pipeline completed"
        );
        Ok(summary)
    }
}

/// Applies the chain to one message and delivers the data outputs.
///
/// A transform error is tagged with the failing stage.
async fn process(
    ctx: &Context,
    transformers: &[SharedTransformer],
    sink: Option<&dyn Sink>,
    msg: Message,
) -> Result<usize> {
    let mut outputs = vec![msg];
    for (stage, transformer) in transformers.iter().enumerate() {
        outputs = apply(ctx, std::slice::from_ref(transformer), outputs)
            .await
            .map_err(|e| e.within(stage_id(stage, transformer)))?;
    }
    let mut emitted = 0;
    for output in outputs.into_iter().filter(|m| !m.is_control()) {
        if let Some(sink) = sink {
            sink.sink(ctx, output).await?;
        }
        emitted += 1;
    }
    Ok(emitted)
}

/// Names a stage by its position and component type, e.g. `stage 1 (utility_err)`.
fn stage_id(stage: usize, transformer: &SharedTransformer) -> String {
    match describe(transformer).get("type").and_then(Json::as_str) {
        Some(type_name) => format!("stage {stage} ({type_name})"),
        None => format!("stage {stage}"),
    }
}

fn reap(
    joined: std::result::Result<Result<usize>, JoinError>,
    token: &Context,
    failure: &mut Option<FlowError>,
    summary: &mut RunSummary,
) {
    let err = match joined {
        Ok(Ok(emitted)) => {
            summary.emitted += emitted;
            return;
        }
        Ok(Err(err)) => err,
        Err(err) => FlowError::Custom(format!("worker failed: {err}")),
    };

    // Workers stopped by a failure elsewhere or by the caller report cancellation.
    if err.is_cancelled() {
        return;
    }
    error!(error = %err, "Worker failed");
    token.cancel();
    failure.get_or_insert(err);
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
