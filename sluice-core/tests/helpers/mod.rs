#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flume::unbounded;
use sluice_core::{
    ConditionFuture, Context, FlowError, FlowFuture, Inspector, Message, Pipeline, RunSummary,
    Sink, Source, SourceReceiver, Transformer,
};
use tracing_subscriber::EnvFilter;

// Test Components

/// Appends a suffix to the payload.
#[derive(Debug, Clone)]
pub struct AppendTransform(pub &'static str);

/// Turns one message into `copies` messages, suffixed with their index.
#[derive(Debug, Clone)]
pub struct FanoutTransform(pub usize);

/// Always fails with the given message.
#[derive(Debug, Clone)]
pub struct ErrorTransform(pub &'static str);

/// Drops every data message.
#[derive(Debug, Clone)]
pub struct DropTransform;

/// Fails the first `failures` data messages it sees, then appends `"_ok"`.
#[derive(Debug)]
pub struct FlakyTransform {
    pub failures: usize,
    pub calls: AtomicUsize,
}

/// Records every call, marking data with its payload and control as `"control"`.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransform {
    pub delay: Duration,
    pub events: Arc<Mutex<Vec<String>>>,
    pub in_flight: Arc<AtomicUsize>,
    pub in_flight_at_control: Arc<Mutex<Option<usize>>>,
}

/// Inspector with a fixed answer for data messages.
#[derive(Debug, Clone)]
pub struct FixedInspector(pub bool);

/// True if the payload contains the needle.
#[derive(Debug, Clone)]
pub struct ContainsInspector(pub &'static str);

/// Inspector that always fails.
#[derive(Debug, Clone)]
pub struct ErrorInspector;

pub struct TestSource {
    pub data: Vec<String>,
}

pub struct EmptySource;

pub struct ErrorSource;

pub struct StreamErrorSource;

/// A source that never closes its bus.
pub struct PendingSource;

#[derive(Clone, Default)]
pub struct TestSink {
    pub received: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
}

// Implementations

impl FlakyTransform {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TestSource {
    pub fn new(data: &[&str]) -> Self {
        Self {
            data: data.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TestSink {
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl RecordingTransform {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Transformer for AppendTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if !msg.is_control() {
                let data = format!("{msg}{}", self.0);
                msg.set_data(data);
            }
            Ok(vec![msg])
        })
    }
}

impl Transformer for FanoutTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            Ok((0..self.0)
                .map(|i| msg.derive(format!("{msg}{i}")))
                .collect())
        })
    }
}

impl Transformer for ErrorTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, _msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move { Err(FlowError::Custom(self.0.to_string())) })
    }
}

impl Transformer for DropTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            Ok(Vec::new())
        })
    }
}

impl Transformer for FlakyTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, mut msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                return Ok(vec![msg]);
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(FlowError::Custom("flaky".to_string()));
            }
            let data = format!("{msg}_ok");
            msg.set_data(data);
            Ok(vec![msg])
        })
    }
}

impl Transformer for RecordingTransform {
    fn transform<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if msg.is_control() {
                *self.in_flight_at_control.lock().unwrap() =
                    Some(self.in_flight.load(Ordering::SeqCst));
                self.events.lock().unwrap().push("control".to_string());
                return Ok(vec![msg]);
            }

            self.in_flight.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.events.lock().unwrap().push(msg.to_string());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![msg])
        })
    }
}

impl Inspector for FixedInspector {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move { Ok(!msg.is_control() && self.0) })
    }
}

impl Inspector for ContainsInspector {
    fn inspect<'a>(&'a self, _ctx: &'a Context, msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move { Ok(!msg.is_control() && msg.to_string().contains(self.0)) })
    }
}

impl Inspector for ErrorInspector {
    fn inspect<'a>(&'a self, _ctx: &'a Context, _msg: &'a Message) -> ConditionFuture<'a> {
        Box::pin(async move { Err(FlowError::Custom("inspect failed".to_string())) })
    }
}

macro_rules! display_as_type {
    ($($component:ty => $name:literal),* $(,)?) => {
        $(
            impl fmt::Display for $component {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, r#"{{"type":"{}"}}"#, $name)
                }
            }
        )*
    };
}

display_as_type! {
    AppendTransform => "test_append",
    FanoutTransform => "test_fanout",
    ErrorTransform => "test_error",
    DropTransform => "test_drop",
    FlakyTransform => "test_flaky",
    RecordingTransform => "test_recording",
    FixedInspector => "test_fixed",
    ContainsInspector => "test_contains",
    ErrorInspector => "test_error",
}

impl Source for TestSource {
    fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            let (tx, rx) = unbounded();
            for data in &self.data {
                tx.send(Ok(Message::new().with_data(data.clone()))).unwrap();
            }
            drop(tx);
            Ok(rx)
        })
    }
}

impl Source for EmptySource {
    fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            let (tx, rx) = unbounded();
            // Don't send any data, just close the channel
            drop(tx);
            Ok(rx)
        })
    }
}

impl Source for ErrorSource {
    fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            let (tx, rx) = unbounded();
            tx.send(Err(FlowError::Source("Source error".to_string())))
                .unwrap();
            drop(tx);
            Ok(rx)
        })
    }
}

impl Source for StreamErrorSource {
    fn stream<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        Box::pin(async move {
            Err(FlowError::Source(
                "Stream initialization error".to_string(),
            ))
        })
    }
}

impl Source for PendingSource {
    fn stream<'a>(&'a self, ctx: &'a Context) -> FlowFuture<'a, SourceReceiver> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let (tx, rx) = unbounded();
            tokio::spawn(async move {
                ctx.cancelled().await;
                drop(tx);
            });
            Ok(rx)
        })
    }
}

impl Sink for TestSink {
    fn sink<'a>(&'a self, _ctx: &'a Context, msg: Message) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            self.received.lock().unwrap().push(msg.to_string());
            Ok(())
        })
    }

    fn close<'a>(&'a self, _ctx: &'a Context) -> FlowFuture<'a, ()> {
        Box::pin(async move {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

// Helper Functions

pub fn data(msgs: &[Message]) -> Vec<String> {
    msgs.iter().map(ToString::to_string).collect()
}

pub fn msg(data: &str) -> Message {
    Message::new().with_data(data.to_string())
}

pub async fn run_pipeline_with_timeout(
    pipeline: Pipeline,
    timeout: Duration,
) -> Result<RunSummary, FlowError> {
    let ctx = Context::new();
    let cancel = ctx.clone();
    let guard = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        cancel.cancel();
    });

    let result = pipeline.run(&ctx).await;
    guard.abort();
    result
}

// Add this function to initialize tracing for tests
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sluice_core=debug".parse().unwrap())
                .add_directive("integration=debug".parse().unwrap()),
        )
        .with_test_writer() // Write to test output
        .with_thread_ids(true) // Show thread IDs
        .with_file(true) // Show file names
        .with_line_number(true) // Show line numbers
        .with_target(false) // Hide target
        .compact() // Use compact format
        .try_init();

    if subscriber.is_err() {
        println!("Warning: tracing already initialized");
    }
}
