use crate::helpers::{data, init_tracing, msg, registry};
use serde_json::json;
use sluice_core::{Config, Context, FlowError, Message, ObjectSettings, Transformer};
use sluice_processors::{Casing, StringAppend, StringCase, StringSplit};

fn keys(source: &str, target: &str) -> ObjectSettings {
    ObjectSettings {
        source_key: source.to_string(),
        target_key: target.to_string(),
    }
}

#[cfg(test)]
mod string_tests {
    use super::*;

    #[tokio::test]
    async fn it_should_change_case_of_payload() {
        // Given
        let upper = StringCase::new(Casing::Upper, ObjectSettings::default());
        let lower = StringCase::new(Casing::Lower, ObjectSettings::default());

        // When
        let uppered = upper.transform(&Context::new(), msg("aBc")).await.unwrap();
        let lowered = lower.transform(&Context::new(), msg("aBc")).await.unwrap();

        // Then
        assert_eq!(data(&uppered), vec!["ABC"]);
        assert_eq!(data(&lowered), vec!["abc"]);
    }

    #[tokio::test]
    async fn it_should_write_result_to_target_key() {
        // Given
        let lower = StringCase::new(Casing::Lower, keys("a", "b"));

        // When
        let result = lower
            .transform(&Context::new(), msg(r#"{"a":"ABC"}"#))
            .await
            .unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"{"a":"ABC","b":"abc"}"#]);
    }

    #[tokio::test]
    async fn it_should_append_in_place_without_target() {
        // Given
        let append = StringAppend::new("!", keys("a", "")).unwrap();

        // When
        let result = append
            .transform(&Context::new(), msg(r#"{"a":"x"}"#))
            .await
            .unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"{"a":"x!"}"#]);
    }

    #[tokio::test]
    async fn it_should_fan_out_split_payload() {
        // Given
        init_tracing();
        let split = StringSplit::new(",", ObjectSettings::default()).unwrap();
        let input = msg("a,b,c").with_metadata("origin");

        // When
        let result = split.transform(&Context::new(), input).await.unwrap();

        // Then
        assert_eq!(data(&result), vec!["a", "b", "c"]);
        assert!(result.iter().all(|m| m.metadata() == b"origin"));
    }

    #[tokio::test]
    async fn it_should_split_field_into_array() {
        // Given
        let split = StringSplit::new("-", keys("a", "b")).unwrap();

        // When
        let result = split
            .transform(&Context::new(), msg(r#"{"a":"1-2"}"#))
            .await
            .unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"{"a":"1-2","b":["1","2"]}"#]);
    }

    #[test]
    fn it_should_require_separator() {
        // When
        let result = registry().new_transformer(&Config::new("string_split"));

        // Then
        assert_eq!(
            result.err(),
            Some(FlowError::MissingRequiredOption(
                "string_split: separator".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn it_should_pass_control_through_string_transforms() {
        // Given
        let split = StringSplit::new(",", ObjectSettings::default()).unwrap();
        let upper = StringCase::new(Casing::Upper, ObjectSettings::default());

        // When
        let split_out = split
            .transform(&Context::new(), Message::control())
            .await
            .unwrap();
        let upper_out = upper
            .transform(&Context::new(), Message::control())
            .await
            .unwrap();

        // Then
        assert_eq!(split_out, vec![Message::control()]);
        assert_eq!(upper_out, vec![Message::control()]);
    }

    #[tokio::test]
    async fn it_should_transform_each_element_with_meta_for_each() {
        // Given
        let config = Config::new("meta_for_each").with_settings(json!({
            "object": {"source_key": "items", "target_key": "upper"},
            "transforms": [{"type": "string_to_upper"}]
        }));
        let for_each = registry().new_transformer(&config).unwrap();

        // When
        let result = for_each
            .transform(&Context::new(), msg(r#"{"items":["a","b"]}"#))
            .await
            .unwrap();

        // Then
        assert_eq!(data(&result), vec![r#"{"items":["a","b"],"upper":["A","B"]}"#]);
    }

    #[test]
    fn it_should_render_settings_as_json() {
        // Given
        let append = StringAppend::new("_x", ObjectSettings::default()).unwrap();

        // When
        let rendered: serde_json::Value = serde_json::from_str(&append.to_string()).unwrap();

        // Then
        assert_eq!(
            rendered,
            json!({
                "type": "string_append",
                "settings": {
                    "object": {"source_key": "", "target_key": ""},
                    "suffix": "_x"
                }
            })
        );
    }
}
