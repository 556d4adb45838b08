use crate::helpers::{
    init_tracing, run_pipeline_with_timeout, AppendTransform, DropTransform, EmptySource,
    ErrorSource, ErrorTransform, FanoutTransform, PendingSource, RecordingTransform,
    StreamErrorSource, TestSink, TestSource,
};
use sluice_core::{Config, Context, FlowError, Pipeline, PipelineConfig, Registry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_error_when_source_not_set() {
        // Given
        let pipeline = Pipeline::new().transform(AppendTransform("_x"));

        // When
        let result = pipeline.run(&Context::new()).await;

        // Then
        assert_eq!(
            result.unwrap_err().to_string(),
            "missing required option: source"
        );
    }

    #[tokio::test]
    async fn it_should_reject_zero_concurrency() {
        // Given
        let pipeline = Pipeline::new().source(EmptySource).concurrency(0);

        // When
        let result = pipeline.run(&Context::new()).await;

        // Then
        assert!(matches!(result, Err(FlowError::InvalidOption(_))));
    }

    #[tokio::test]
    async fn it_should_handle_source_stream_error() {
        // Given
        let pipeline = Pipeline::new().source(StreamErrorSource);

        // When
        let result = pipeline.run(&Context::new()).await;

        // Then
        assert_eq!(
            result.unwrap_err().to_string(),
            "source: Stream initialization error"
        );
    }

    #[tokio::test]
    async fn it_should_handle_in_band_source_error() {
        // Given
        let sink = TestSink::default();
        let pipeline = Pipeline::new()
            .source(ErrorSource)
            .transform(AppendTransform("_x"))
            .sink(sink.clone());

        // When
        let result = pipeline.run(&Context::new()).await;

        // Then
        assert_eq!(result.unwrap_err().to_string(), "source: Source error");
        assert_eq!(sink.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn it_should_deliver_transformed_messages_to_sink() {
        // Given
        init_tracing();
        let sink = TestSink::default();
        let pipeline = Pipeline::new()
            .source(TestSource::new(&["a", "b", "c"]))
            .transform(AppendTransform("_x"))
            .transform(FanoutTransform(2))
            .sink(sink.clone())
            .concurrency(4);

        // When
        let summary = pipeline.run(&Context::new()).await.unwrap();

        // Then
        assert_eq!(summary.ingested, 3);
        assert_eq!(summary.emitted, 6);
        let mut received = sink.received();
        received.sort();
        assert_eq!(received, vec!["a_x0", "a_x1", "b_x0", "b_x1", "c_x0", "c_x1"]);
        assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn it_should_flush_after_every_worker_finished() {
        // Given
        let recorder = RecordingTransform {
            delay: Duration::from_millis(20),
            ..RecordingTransform::default()
        };
        let inputs: Vec<String> = (0..16).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let pipeline = Pipeline::new()
            .source(TestSource::new(&refs))
            .transform(recorder.clone())
            .concurrency(8);

        // When
        let summary = pipeline.run(&Context::new()).await.unwrap();

        // Then
        let events = recorder.events();
        assert_eq!(summary.ingested, 16);
        assert_eq!(events.len(), 17);
        assert_eq!(events.last().map(String::as_str), Some("control"));
        assert_eq!(events.iter().filter(|e| *e == "control").count(), 1);
        assert_eq!(*recorder.in_flight_at_control.lock().unwrap(), Some(0));
    }

    #[tokio::test]
    async fn it_should_flush_empty_source() {
        // Given
        let recorder = RecordingTransform::default();
        let pipeline = Pipeline::new()
            .source(EmptySource)
            .transform(recorder.clone());

        // When
        let summary = pipeline.run(&Context::new()).await.unwrap();

        // Then
        assert_eq!(summary.ingested, 0);
        assert_eq!(summary.emitted, 0);
        assert_eq!(recorder.events(), vec!["control"]);
    }

    #[tokio::test]
    async fn it_should_fail_without_flushing_on_transform_error() {
        // Given
        let recorder = RecordingTransform::default();
        let sink = TestSink::default();
        let pipeline = Pipeline::new()
            .source(TestSource::new(&["a", "b"]))
            .transform(AppendTransform("_x"))
            .transform(ErrorTransform("Processing failed"))
            .transform(recorder.clone())
            .sink(sink.clone())
            .concurrency(1);

        // When
        let result = pipeline.run(&Context::new()).await;

        // Then
        assert_eq!(
            result,
            Err(FlowError::Custom("Processing failed".to_string()).within("stage 1 (test_error)"))
        );
        assert!(recorder.events().is_empty());
        assert_eq!(sink.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn it_should_name_the_failing_stage() {
        // Given
        let pipeline = Pipeline::new()
            .source(TestSource::new(&["a"]))
            .transform(AppendTransform("_x"))
            .transform(AppendTransform("_y"))
            .transform(ErrorTransform("boom"))
            .transform(AppendTransform("_z"));

        // When
        let err = pipeline.run(&Context::new()).await.unwrap_err();

        // Then
        assert_eq!(err.to_string(), "transform stage 2 (test_error): boom");
    }

    #[tokio::test]
    async fn it_should_name_the_stage_failing_during_flush() {
        // Given
        let pipeline = Pipeline::new()
            .source(EmptySource)
            .transform(ErrorTransform("flush failed"));

        // When
        let err = pipeline.run(&Context::new()).await.unwrap_err();

        // Then
        assert_eq!(
            err,
            FlowError::Custom("flush failed".to_string()).within("stage 0 (test_error)")
        );
    }

    #[tokio::test]
    async fn it_should_not_deliver_dropped_messages() {
        // Given
        let sink = TestSink::default();
        let pipeline = Pipeline::new()
            .source(TestSource::new(&["a", "b"]))
            .transform(DropTransform)
            .sink(sink.clone());

        // When
        let summary = pipeline.run(&Context::new()).await.unwrap();

        // Then
        assert_eq!(summary.ingested, 2);
        assert_eq!(summary.emitted, 0);
        assert!(sink.received().is_empty());
    }

    #[tokio::test]
    async fn it_should_stop_when_cancelled() {
        // Given
        let pipeline = Pipeline::new()
            .source(PendingSource)
            .transform(AppendTransform("_x"));

        // When
        let result = run_pipeline_with_timeout(pipeline, Duration::from_millis(50)).await;

        // Then
        assert_eq!(result, Err(FlowError::Cancelled));
    }

    #[tokio::test]
    async fn it_should_report_nested_construction_errors() {
        // Given
        let config = PipelineConfig {
            concurrency: Some(2),
            transforms: vec![Config::new("meta_switch").with_settings(serde_json::json!({
                "cases": [{ "transforms": [{ "type": "meta_err", "settings": {
                    "transforms": [{ "type": "meta_switch", "settings": { "cases": [] } }]
                }}]}]
            }))],
        };

        // When
        let result = Pipeline::from_config(&Registry::new(), &config);

        // Then
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some(
                "transform meta_switch: transform meta_err: transform meta_switch: \
                 missing required option: meta_switch: cases"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn it_should_build_from_config() {
        // Given
        let mut registry = Registry::new();
        registry.register_transformer("test_append", |_, _| Ok(Arc::new(AppendTransform("_x"))));
        let config = PipelineConfig::from_json(
            r#"{"concurrency": 2, "transforms": [
                {"type": "test_append"},
                {"type": "meta_err", "settings": {"transforms": [{"type": "test_append"}]}}
            ]}"#,
        )
        .unwrap();
        let sink = TestSink::default();

        // When
        let pipeline = Pipeline::from_config(&registry, &config).unwrap();
        let summary = pipeline
            .source(TestSource::new(&["a"]))
            .sink(sink.clone())
            .run(&Context::new())
            .await
            .unwrap();

        // Then
        assert_eq!(summary.emitted, 1);
        assert_eq!(sink.received(), vec!["a_x_x"]);
    }

    #[tokio::test]
    async fn it_should_reject_config_without_transforms() {
        // Given
        let config = PipelineConfig {
            concurrency: Some(1),
            transforms: Vec::new(),
        };

        // When
        let result = Pipeline::from_config(&Registry::new(), &config);

        // Then
        assert!(matches!(result, Err(FlowError::MissingRequiredOption(_))));
    }
}
