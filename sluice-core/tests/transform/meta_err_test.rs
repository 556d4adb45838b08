use crate::helpers::{data, msg, AppendTransform, ErrorTransform};
use sluice_core::transform::MetaErr;
use sluice_core::{Context, FlowError, Message, Transformer};
use std::sync::Arc;

#[cfg(test)]
mod meta_err_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_return_input_when_error_matches() {
        // Given
        let meta = MetaErr::new(vec![
            Arc::new(AppendTransform("_changed")),
            Arc::new(ErrorTransform("boom")),
        ])
        .unwrap()
        .with_error_messages(&["^boom$"])
        .unwrap();
        let input = msg("original").with_metadata("meta");

        // When
        let result = meta.transform(&Context::new(), input.clone()).await;

        // Then
        assert_eq!(result, Ok(vec![input]));
    }

    #[tokio::test]
    async fn it_should_propagate_unmatched_error_unchanged() {
        // Given
        let meta = MetaErr::new(vec![Arc::new(ErrorTransform("boom"))])
            .unwrap()
            .with_error_messages(&["^nope$"])
            .unwrap();

        // When
        let result = meta.transform(&Context::new(), msg("original")).await;

        // Then
        assert_eq!(result, Err(FlowError::Custom("boom".to_string())));
    }

    #[tokio::test]
    async fn it_should_catch_all_errors_without_patterns() {
        // Given
        let meta = MetaErr::new(vec![Arc::new(ErrorTransform("anything"))]).unwrap();

        // When
        let result = meta.transform(&Context::new(), msg("original")).await.unwrap();

        // Then
        assert_eq!(data(&result), vec!["original"]);
    }

    #[tokio::test]
    async fn it_should_return_chain_output_on_success() {
        // Given
        let meta = MetaErr::new(vec![Arc::new(AppendTransform("_ok"))])
            .unwrap()
            .with_error_messages(&["boom"])
            .unwrap();

        // When
        let result = meta.transform(&Context::new(), msg("a")).await.unwrap();

        // Then
        assert_eq!(data(&result), vec!["a_ok"]);
    }

    #[tokio::test]
    async fn it_should_pass_control_messages_to_chain() {
        // Given
        let meta = MetaErr::new(vec![Arc::new(AppendTransform("_ok"))]).unwrap();

        // When
        let result = meta.transform(&Context::new(), Message::control()).await;

        // Then
        assert_eq!(result, Ok(vec![Message::control()]));
    }

    #[tokio::test]
    async fn it_should_reject_empty_chain_and_invalid_pattern() {
        // When
        let empty = MetaErr::new(Vec::new());
        let invalid = MetaErr::new(vec![Arc::new(AppendTransform("_ok"))])
            .unwrap()
            .with_error_messages(&["("]);

        // Then
        assert!(matches!(empty, Err(FlowError::MissingRequiredOption(_))));
        assert!(matches!(invalid, Err(FlowError::InvalidOption(_))));
    }
}
