//! Sluice Processors
//!
//! Leaf transforms and inspectors that plug into a `sluice_core::Registry`.
//! Meta transforms and combinators nest these by type name.

pub mod aggregate;
pub mod filter;
pub mod transform;

use std::sync::Arc;

use sluice_core::Registry;

pub use aggregate::AggregateToArray;
pub use filter::{FormatJson, NumberInspector, NumberOp, StringInspector, StringMatch, StringOp};
pub use transform::{
    Casing, ObjectCopy, ObjectDelete, ObjectInsert, StringAppend, StringCase, StringSplit,
    UtilityDelay, UtilityDrop, UtilityErr,
};

/// Installs every transform and inspector of this crate into `registry`.
///
/// # Examples
///
/// ```
/// use sluice_core::{Config, Context, Message, Registry, Transformer};
///
/// # tokio_test::block_on(async {
/// let mut registry = Registry::new();
/// sluice_processors::register(&mut registry);
///
/// let upper = registry.new_transformer(&Config::new("string_to_upper")).unwrap();
/// let out = upper.transform(&Context::new(), Message::new().with_data("abc")).await.unwrap();
/// assert_eq!(out[0].to_string(), "ABC");
/// # });
/// ```
pub fn register(registry: &mut Registry) -> &mut Registry {
    registry
        .register_transformer("utility_drop", |_, _| Ok(Arc::new(UtilityDrop)))
        .register_transformer("utility_err", |_, c| Ok(Arc::new(UtilityErr::from_config(c)?)))
        .register_transformer("utility_delay", |_, c| {
            Ok(Arc::new(UtilityDelay::from_config(c)?))
        })
        .register_transformer("object_copy", |_, c| Ok(Arc::new(ObjectCopy::from_config(c)?)))
        .register_transformer("object_insert", |_, c| {
            Ok(Arc::new(ObjectInsert::from_config(c)?))
        })
        .register_transformer("object_delete", |_, c| {
            Ok(Arc::new(ObjectDelete::from_config(c)?))
        })
        .register_transformer("string_to_upper", |_, c| {
            Ok(Arc::new(StringCase::from_config(Casing::Upper, c)?))
        })
        .register_transformer("string_to_lower", |_, c| {
            Ok(Arc::new(StringCase::from_config(Casing::Lower, c)?))
        })
        .register_transformer("string_append", |_, c| {
            Ok(Arc::new(StringAppend::from_config(c)?))
        })
        .register_transformer("string_split", |_, c| Ok(Arc::new(StringSplit::from_config(c)?)))
        .register_transformer("aggregate_to_array", |_, c| {
            Ok(Arc::new(AggregateToArray::from_config(c)?))
        });

    for op in [
        StringOp::Contains,
        StringOp::EqualTo,
        StringOp::StartsWith,
        StringOp::EndsWith,
    ] {
        registry.register_inspector(op.type_name(), move |_, c| {
            Ok(Arc::new(StringInspector::from_config(op, c)?))
        });
    }
    for op in [NumberOp::EqualTo, NumberOp::GreaterThan, NumberOp::LessThan] {
        registry.register_inspector(op.type_name(), move |_, c| {
            Ok(Arc::new(NumberInspector::from_config(op, c)?))
        });
    }

    registry
        .register_inspector("string_match", |_, c| Ok(Arc::new(StringMatch::from_config(c)?)))
        .register_inspector("format_json", |_, c| Ok(Arc::new(FormatJson::from_config(c)?)))
}
