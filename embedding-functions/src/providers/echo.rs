//! Pass-through provider.
//!
//! Resolves every text to itself with an empty vector and hydrates to the very
//! same instance. Useful as a stand-in wherever a provider is required but no
//! model should be called.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::errors::EmbeddingError;
use crate::function::{EmbeddedText, EmbeddingFunction, EmbeddingFuture};

pub const PROVIDER_NAME: &str = "echo";

#[derive(Debug, Clone, Default)]
pub struct EchoEmbeddingFunction;

impl EmbeddingFunction for EchoEmbeddingFunction {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn generate_text<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a> {
        trace!(len = text.len(), "echo generate_text");
        Box::pin(async move { Ok(EmbeddedText::new(text, Vec::new())) })
    }

    fn hydrate_from_config(
        self: Arc<Self>,
        _config: &Value,
    ) -> Result<Arc<dyn EmbeddingFunction>, EmbeddingError> {
        Ok(self)
    }

    fn get_config(&self) -> Value {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::DistanceMetric;
    use serde_json::json;
    use std::collections::HashSet;

    #[tokio::test]
    async fn generate_text_resolves_to_input() {
        let ef = EchoEmbeddingFunction;
        for text in ["hello", "", "naïve ünïcödé", "multi\nline"] {
            let out = ef.generate_text(text).await.unwrap();
            assert_eq!(out.text, text);
            assert!(out.embedding.is_empty());
        }
    }

    #[test]
    fn create_and_update_pass_options_through() {
        let ef = EchoEmbeddingFunction;
        let samples = [
            json!({ "model": "m", "openAIKeyFromEnvironmentVariable": "X" }),
            json!(null),
            json!([1, 2, 3]),
            json!("plain"),
            json!({ "nested": { "a": [true, false] } }),
        ];
        for options in samples {
            let created = ef.create(options.clone());
            assert_eq!(created.name, PROVIDER_NAME);
            assert_eq!(created.options, options);

            let updated = ef.update(options.clone());
            assert_eq!(updated.into_parts(), (PROVIDER_NAME.to_string(), options));
        }
    }

    #[tokio::test]
    async fn hydrate_returns_same_instance() {
        let ef = Arc::new(EchoEmbeddingFunction);
        let hydrated = ef
            .clone()
            .hydrate_from_config(&json!({ "anything": 1 }))
            .unwrap();

        let original: Arc<dyn EmbeddingFunction> = ef;
        assert!(Arc::ptr_eq(&original, &hydrated));

        let a = original.generate_text("hello").await.unwrap();
        let b = hydrated.generate_text("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(
            original.create(json!({ "k": "v" })),
            hydrated.create(json!({ "k": "v" }))
        );
        assert_eq!(
            original.update(json!({ "k": "v" })),
            hydrated.update(json!({ "k": "v" }))
        );
    }

    #[test]
    fn supports_all_metrics() {
        let ef = EchoEmbeddingFunction;
        let got: HashSet<DistanceMetric> = ef.supported_metrics().iter().copied().collect();
        assert_eq!(got, DistanceMetric::ALL.into_iter().collect());
        assert!(ef.modifiable_variables().is_empty());
    }
}
