use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sluice_core::{Context, Pipeline, PipelineConfig, Registry};
use sluice_sinks::{FileSink, FileSinkConfig, StdoutSink};
use sluice_sources::LineSource;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Streams newline-delimited records through a pipeline described in JSON.
#[derive(Debug, Parser)]
#[command(name = "sluice-sample", version)]
struct Args {
    /// Pipeline configuration: `{"concurrency": n, "transforms": [...]}`.
    #[arg(short, long, env = "SLUICE_CONFIG")]
    config: PathBuf,

    /// Records to ingest, one per line. Reads standard input when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File the results are written to. Prints to standard output when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cancels the run after this long, e.g. `30s` or `2m`.
    #[arg(short, long, default_value = "10s", value_parser = humantime::parse_duration)]
    timeout: Duration,
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut registry = Registry::new();
    sluice_processors::register(&mut registry);

    let config = PipelineConfig::from_file(&args.config)?;
    let mut pipeline = Pipeline::from_config(&registry, &config)?;

    pipeline = match &args.input {
        Some(path) => pipeline.source(LineSource::from_path(path)),
        None => pipeline.source(LineSource::from_reader(tokio::io::stdin())),
    };
    pipeline = match &args.output {
        Some(path) => pipeline.sink(FileSink::open(FileSinkConfig::truncate(path)).await?),
        None => pipeline.sink(StdoutSink::new()),
    };

    let ctx = Context::new();
    let handle = tokio::spawn({
        let ctx = ctx.clone();
        async move { pipeline.run(&ctx).await }
    });

    // Cancel the run if it outlives the timeout
    let watchdog = tokio::spawn({
        let ctx = ctx.clone();
        let timeout = args.timeout;
        async move {
            tokio::select! {
                () = ctx.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    error!(?timeout, "Timed out, cancelling pipeline");
                    ctx.cancel();
                }
            }
        }
    });

    let result = handle.await?;
    watchdog.abort();

    let summary = result?;
    info!(
        ingested = summary.ingested,
        emitted = summary.emitted,
        "Pipeline finished"
    );
    eprintln!(
        "ingested {} messages, emitted {}",
        summary.ingested, summary.emitted
    );
    Ok(())
}
