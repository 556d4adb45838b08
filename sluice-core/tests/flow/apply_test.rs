use crate::helpers::{
    data, msg, AppendTransform, DropTransform, ErrorTransform, FanoutTransform,
};
use sluice_core::{apply, Context, FlowError, Message, SharedTransformer};
use std::sync::Arc;

#[cfg(test)]
mod apply_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_return_input_for_empty_chain() {
        // Given
        let ctx = Context::new();
        let input = vec![msg("a"), Message::control(), msg("b")];

        // When
        let result = apply(&ctx, &[], input.clone()).await.unwrap();

        // Then
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn it_should_apply_stages_in_order() {
        // Given
        let ctx = Context::new();
        let chain: Vec<SharedTransformer> = vec![
            Arc::new(AppendTransform("_1")),
            Arc::new(AppendTransform("_2")),
        ];

        // When
        let result = apply(&ctx, &chain, vec![msg("a")]).await.unwrap();

        // Then
        assert_eq!(data(&result), vec!["a_1_2"]);
    }

    #[tokio::test]
    async fn it_should_flatten_fan_out_depth_first() {
        // Given
        let ctx = Context::new();
        let chain: Vec<SharedTransformer> = vec![
            Arc::new(FanoutTransform(2)),
            Arc::new(FanoutTransform(3)),
        ];

        // When
        let result = apply(&ctx, &chain, vec![msg("a"), msg("b")]).await.unwrap();

        // Then
        assert_eq!(result.len(), 2 * 2 * 3);
        assert_eq!(
            data(&result),
            vec![
                "a00", "a01", "a02", "a10", "a11", "a12", "b00", "b01", "b02", "b10", "b11",
                "b12",
            ]
        );
    }

    #[tokio::test]
    async fn it_should_stop_when_working_set_is_empty() {
        // Given
        let ctx = Context::new();
        let chain: Vec<SharedTransformer> = vec![
            Arc::new(DropTransform),
            Arc::new(ErrorTransform("unreachable")),
        ];

        // When
        let result = apply(&ctx, &chain, vec![msg("a")]).await;

        // Then
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn it_should_discard_results_on_error() {
        // Given
        let ctx = Context::new();
        let chain: Vec<SharedTransformer> = vec![
            Arc::new(AppendTransform("_1")),
            Arc::new(ErrorTransform("boom")),
        ];

        // When
        let result = apply(&ctx, &chain, vec![msg("a"), msg("b")]).await;

        // Then
        assert_eq!(result, Err(FlowError::Custom("boom".to_string())));
    }

    #[tokio::test]
    async fn it_should_pass_control_messages_through_leaf_transforms() {
        // Given
        let ctx = Context::new();
        let chain: Vec<SharedTransformer> = vec![
            Arc::new(AppendTransform("_1")),
            Arc::new(FanoutTransform(3)),
            Arc::new(DropTransform),
        ];

        // When
        let result = apply(&ctx, &chain, vec![Message::control()]).await.unwrap();

        // Then
        assert_eq!(result, vec![Message::control()]);
    }
}
