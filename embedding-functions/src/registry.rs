//! Name → provider mapping.
//!
//! Construct once at startup, wrap in `Arc`, and share. Entries are
//! unconfigured provider instances; [`EmbeddingFunctionRegistry::hydrate`]
//! turns a persisted [`EmbeddingFunctionConfig`] into a live instance by
//! dispatching on its `name`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::function_config::EmbeddingFunctionConfig;
use crate::config::provider_settings::ProviderSettings;
use crate::errors::{EmbeddingError, Result};
use crate::function::EmbeddingFunction;
use crate::providers::echo::EchoEmbeddingFunction;
use crate::providers::ollama::OllamaEmbeddingFunction;
use crate::providers::openai::OpenAiEmbeddingFunction;

#[derive(Default, Clone)]
pub struct EmbeddingFunctionRegistry {
    entries: HashMap<String, Arc<dyn EmbeddingFunction>>,
}

impl EmbeddingFunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled providers: `echo`, `openai`, `ollama`.
    ///
    /// # Errors
    /// Propagates provider construction errors (invalid endpoint, HTTP client).
    pub fn with_defaults(settings: &ProviderSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(EchoEmbeddingFunction));
        registry.register(Arc::new(OpenAiEmbeddingFunction::new(settings)?));
        registry.register(Arc::new(OllamaEmbeddingFunction::new(settings)?));
        info!(providers = ?registry.names(), "embedding function registry ready");
        Ok(registry)
    }

    /// Registers `function` under its own name, returning any entry it replaced.
    pub fn register(
        &mut self,
        function: Arc<dyn EmbeddingFunction>,
    ) -> Option<Arc<dyn EmbeddingFunction>> {
        let name = function.name().to_string();
        debug!(provider = %name, "registering embedding function");
        self.entries.insert(name, function)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn EmbeddingFunction>> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EmbeddingFunction>> {
        self.entries.get(name).cloned()
    }

    /// Like [`get`](Self::get) but fails with [`EmbeddingError::UnknownProvider`].
    pub fn require(&self, name: &str) -> Result<Arc<dyn EmbeddingFunction>> {
        self.get(name)
            .ok_or_else(|| EmbeddingError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Rebuilds a live provider from a persisted configuration.
    ///
    /// # Errors
    /// - [`EmbeddingError::UnknownProvider`] if `config.name` is not registered
    /// - any error returned by the provider's `hydrate_from_config`
    pub fn hydrate(&self, config: &EmbeddingFunctionConfig) -> Result<Arc<dyn EmbeddingFunction>> {
        let entry = self.require(&config.name)?;
        debug!(provider = %config.name, "hydrating embedding function");
        entry.hydrate_from_config(&config.options)
    }

    /// Merges `update` over `current` after both option sets are rewritten to
    /// the provider's canonical keys.
    ///
    /// # Errors
    /// - [`EmbeddingError::UnknownProvider`] if `current.name` is not registered
    /// - any error returned by [`EmbeddingFunctionConfig::apply_update`]
    pub fn merge_update(
        &self,
        current: &EmbeddingFunctionConfig,
        update: &EmbeddingFunctionConfig,
    ) -> Result<EmbeddingFunctionConfig> {
        let provider = self.require(&current.name)?;
        let mut merged = EmbeddingFunctionConfig::new(
            current.name.clone(),
            provider.canonical_options(current.options.clone()),
        );
        let update = EmbeddingFunctionConfig::new(
            update.name.clone(),
            provider.canonical_options(update.options.clone()),
        );
        merged.apply_update(&update, provider.modifiable_variables())?;
        Ok(merged)
    }
}

impl fmt::Debug for EmbeddingFunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingFunctionRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
