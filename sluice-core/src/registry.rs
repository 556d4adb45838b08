//! Type-tagged construction of transformers and inspectors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::condition::{Combinator, Operator};
use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::flow::inspector::SharedInspector;
use crate::flow::transformer::SharedTransformer;
use crate::transform::{MetaErr, MetaForEach, MetaRetry, MetaSwitch};

type TransformerFactory = Arc<dyn Fn(&Registry, &Config) -> Result<SharedTransformer> + Send + Sync>;
type InspectorFactory = Arc<dyn Fn(&Registry, &Config) -> Result<SharedInspector> + Send + Sync>;

/// Maps component type names to constructors.
///
/// Factories receive the registry itself so meta components can construct
/// their children. Construction is fail-fast: an unknown type or invalid
/// settings are reported when the pipeline is built, never while it runs.
#[derive(Clone)]
pub struct Registry {
    transformers: HashMap<String, TransformerFactory>,
    inspectors: HashMap<String, InspectorFactory>,
}

impl Registry {
    /// A registry holding the built-in meta transforms and combinators.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_transformer("meta_err", |r, c| Ok(Arc::new(MetaErr::from_config(r, c)?)));
        registry.register_transformer("meta_retry", |r, c| {
            Ok(Arc::new(MetaRetry::from_config(r, c)?))
        });
        registry.register_transformer("meta_for_each", |r, c| {
            Ok(Arc::new(MetaForEach::from_config(r, c)?))
        });
        registry.register_transformer("meta_switch", |r, c| {
            Ok(Arc::new(MetaSwitch::from_config(r, c)?))
        });

        for op in [Operator::All, Operator::Any, Operator::None] {
            let factory = move |r: &Self, c: &Config| -> Result<SharedInspector> {
                Ok(Arc::new(Combinator::from_config(r, op, c)?))
            };
            registry.register_inspector(op.type_name(), factory);
            // Short aliases: "all", "any", "none".
            registry.register_inspector(&op.type_name()["meta_".len()..], factory);
        }

        registry
    }

    /// A registry with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::new(),
            inspectors: HashMap::new(),
        }
    }

    /// Registers a transformer constructor, replacing any previous one of the same name.
    pub fn register_transformer<F>(&mut self, type_name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Self, &Config) -> Result<SharedTransformer> + Send + Sync + 'static,
    {
        debug!(type_name, "Registering transformer");
        self.transformers
            .insert(type_name.to_string(), Arc::new(factory));
        self
    }

    /// Registers an inspector constructor, replacing any previous one of the same name.
    pub fn register_inspector<F>(&mut self, type_name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Self, &Config) -> Result<SharedInspector> + Send + Sync + 'static,
    {
        debug!(type_name, "Registering inspector");
        self.inspectors.insert(type_name.to_string(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn has_transformer(&self, type_name: &str) -> bool {
        self.transformers.contains_key(type_name)
    }

    #[must_use]
    pub fn has_inspector(&self, type_name: &str) -> bool {
        self.inspectors.contains_key(type_name)
    }

    /// # Errors
    ///
    /// Returns `FlowError::InvalidFactoryInput` for an unknown type, or the
    /// constructor's error for invalid settings.
    pub fn new_transformer(&self, config: &Config) -> Result<SharedTransformer> {
        let factory = self
            .transformers
            .get(&config.type_name)
            .ok_or_else(|| FlowError::InvalidFactoryInput(config.type_name.clone()))?;
        factory(self, config)
    }

    /// # Errors
    ///
    /// Fails on the first config that cannot be constructed.
    pub fn new_transformers(&self, configs: &[Config]) -> Result<Vec<SharedTransformer>> {
        configs.iter().map(|c| self.new_transformer(c)).collect()
    }

    /// # Errors
    ///
    /// Returns `FlowError::InvalidFactoryInput` for an unknown type, or the
    /// constructor's error for invalid settings.
    pub fn new_inspector(&self, config: &Config) -> Result<SharedInspector> {
        let factory = self
            .inspectors
            .get(&config.type_name)
            .ok_or_else(|| FlowError::InvalidFactoryInput(config.type_name.clone()))?;
        factory(self, config)
    }

    /// # Errors
    ///
    /// Fails on the first config that cannot be constructed.
    pub fn new_inspectors(&self, configs: &[Config]) -> Result<Vec<SharedInspector>> {
        configs.iter().map(|c| self.new_inspector(c)).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut transformers: Vec<_> = self.transformers.keys().collect();
        let mut inspectors: Vec<_> = self.inspectors.keys().collect();
        transformers.sort();
        inspectors.sort();
        f.debug_struct("Registry")
            .field("transformers", &transformers)
            .field("inspectors", &inspectors)
            .finish()
    }
}
