//! Ollama embedding provider.
//!
//! Calls `POST {endpoint}/api/embeddings` on a local or remote Ollama server.
//! Options: `{ "model": "<name>" }`. No credentials are involved, and nothing
//! may be changed after creation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::provider_settings::ProviderSettings;
use crate::errors::{EmbeddingError, Result, make_snippet, validate_http_endpoint};
use crate::function::{EmbeddedText, EmbeddingFunction, EmbeddingFuture};
use crate::metric::DistanceMetric;

pub const PROVIDER_NAME: &str = "ollama";

#[derive(Debug, Clone, Deserialize)]
struct OllamaOptions {
    model: String,
}

#[derive(Debug)]
pub struct OllamaEmbeddingFunction {
    client: reqwest::Client,
    url_embeddings: String,
    model: Option<String>,
    config: Value,
}

impl OllamaEmbeddingFunction {
    /// Creates an unconfigured instance bound to `settings.ollama_endpoint`.
    ///
    /// # Errors
    /// - [`EmbeddingError::InvalidConfig`] if the endpoint is invalid
    /// - [`EmbeddingError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        validate_http_endpoint("ollama_endpoint", &settings.ollama_endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        let base = settings.ollama_endpoint.trim().trim_end_matches('/');

        Ok(Self {
            client,
            url_embeddings: format!("{base}/api/embeddings"),
            model: None,
            config: Value::Null,
        })
    }

    #[instrument(skip_all, fields(model = %model))]
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingsRequest {
            model,
            prompt: text,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::HttpStatus {
                status,
                url,
                snippet: make_snippet(&body),
            });
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            EmbeddingError::Decode(format!("serde error: {e}; expected `{{ embedding: number[] }}`"))
        })?;

        Ok(out.embedding)
    }
}

impl EmbeddingFunction for OllamaEmbeddingFunction {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    // Same space a collection gets when it names no metric.
    fn default_metric(&self) -> DistanceMetric {
        DistanceMetric::L2
    }

    fn generate_text<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a> {
        Box::pin(async move {
            let model = self
                .model
                .as_deref()
                .ok_or(EmbeddingError::NotConfigured(PROVIDER_NAME))?;
            let embedding = self.embed(model, text).await?;
            Ok(EmbeddedText::new(text, embedding))
        })
    }

    fn hydrate_from_config(
        self: Arc<Self>,
        config: &Value,
    ) -> Result<Arc<dyn EmbeddingFunction>> {
        let options: OllamaOptions = serde_json::from_value(config.clone())
            .map_err(|e| EmbeddingError::InvalidConfig(format!("ollama options: {e}")))?;
        if options.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "ollama options: model must not be empty".into(),
            ));
        }

        Ok(Arc::new(Self {
            client: self.client.clone(),
            url_embeddings: self.url_embeddings.clone(),
            model: Some(options.model),
            config: config.clone(),
        }))
    }

    fn get_config(&self) -> Value {
        self.config.clone()
    }
}

/// Request body for `/api/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response body for `/api/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
