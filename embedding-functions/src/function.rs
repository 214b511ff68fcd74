//! The capability contract every embedding provider implements.
//!
//! Client code only talks to `dyn EmbeddingFunction`, so a collection can be
//! backed by any provider registered in the
//! [`EmbeddingFunctionRegistry`](crate::EmbeddingFunctionRegistry).

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::function_config::EmbeddingFunctionConfig;
use crate::errors::EmbeddingError;
use crate::metric::DistanceMetric;

/// Future returned by [`EmbeddingFunction::generate_text`].
pub type EmbeddingFuture<'a> =
    Pin<Box<dyn Future<Output = Result<EmbeddedText, EmbeddingError>> + Send + 'a>>;

/// Result of embedding a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedText {
    /// The input text, unchanged.
    pub text: String,
    /// The embedding vector; empty for the echo provider.
    pub embedding: Vec<f32>,
}

impl EmbeddedText {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// Provider interface for embedding generation.
///
/// `create` and `update` are pure: they wrap the supplied options into an
/// [`EmbeddingFunctionConfig`] without validating them. Validation happens when
/// the config is turned back into a live instance by
/// [`hydrate_from_config`](Self::hydrate_from_config).
pub trait EmbeddingFunction: Send + Sync {
    /// Registry name of the provider.
    fn name(&self) -> &'static str;

    /// Metrics a collection backed by this provider may use.
    fn supported_metrics(&self) -> &'static [DistanceMetric] {
        &DistanceMetric::ALL
    }

    /// Metric used when a collection does not pick one.
    fn default_metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    /// Construction-time configuration. `options` is returned unchanged.
    fn create(&self, options: Value) -> EmbeddingFunctionConfig {
        EmbeddingFunctionConfig::new(self.name(), options)
    }

    /// Reconfiguration object. Same shape as [`create`](Self::create).
    fn update(&self, options: Value) -> EmbeddingFunctionConfig {
        EmbeddingFunctionConfig::new(self.name(), options)
    }

    /// Embeds `text`.
    fn generate_text<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a>;

    /// Rebuilds a usable instance from persisted options.
    fn hydrate_from_config(
        self: Arc<Self>,
        config: &Value,
    ) -> Result<Arc<dyn EmbeddingFunction>, EmbeddingError>;

    /// Options this instance was hydrated from (`null` when unconfigured).
    fn get_config(&self) -> Value;

    /// Rewrites option aliases to their canonical keys.
    ///
    /// Stored options and updates pass through here before they are merged, so
    /// [`modifiable_variables`](Self::modifiable_variables) only lists canonical keys.
    fn canonical_options(&self, options: Value) -> Value {
        options
    }

    /// Option keys an update may change after creation.
    fn modifiable_variables(&self) -> &'static [&'static str] {
        &[]
    }

    fn supports(&self, metric: DistanceMetric) -> bool {
        self.supported_metrics().contains(&metric)
    }
}
