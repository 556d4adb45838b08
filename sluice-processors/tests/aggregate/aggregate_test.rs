use crate::helpers::{data, registry, run_with_flush};
use serde_json::json;
use sluice_core::{Config, ObjectSettings, SharedTransformer};
use sluice_processors::AggregateToArray;
use std::sync::Arc;

#[cfg(test)]
mod aggregate_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_emit_full_batches_and_flush_remainder() {
        // Given
        let chain: Vec<SharedTransformer> =
            vec![Arc::new(AggregateToArray::new(2, ObjectSettings::default()))];

        // When
        let result = run_with_flush(&chain, &["a", "b", "c"]).await.unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"["a","b"]"#, r#"["c"]"#, ""]);
        assert!(result[2].is_control());
        assert!(!result[1].is_control());
    }

    #[tokio::test]
    async fn it_should_keep_json_items_and_write_to_target() {
        // Given
        let config = Config::new("aggregate_to_array").with_settings(json!({
            "object": {"target_key": "items"}
        }));
        let chain = vec![registry().new_transformer(&config).unwrap()];

        // When
        let result = run_with_flush(&chain, &[r#"{"n":1}"#, "2"]).await.unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"{"items":[{"n":1},2]}"#, ""]);
    }

    #[tokio::test]
    async fn it_should_only_forward_control_when_empty() {
        // Given
        let chain: Vec<SharedTransformer> =
            vec![Arc::new(AggregateToArray::new(3, ObjectSettings::default()))];

        // When
        let result = run_with_flush(&chain, &[]).await.unwrap();

        // Then
        assert_eq!(result.len(), 1);
        assert!(result[0].is_control());
    }

    #[tokio::test]
    async fn it_should_feed_batches_to_later_stages() {
        // Given
        let config = json!([
            {"type": "aggregate_to_array", "settings": {"count": 2}},
            {"type": "string_append", "settings": {"suffix": "!"}}
        ]);
        let configs: Vec<Config> = serde_json::from_value(config).unwrap();
        let chain = registry().new_transformers(&configs).unwrap();

        // When
        let result = run_with_flush(&chain, &["1", "2"]).await.unwrap();

        // Then
        assert_eq!(data(&result), vec!["[1,2]!", ""]);
    }
}
