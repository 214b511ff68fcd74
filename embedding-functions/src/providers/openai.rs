//! OpenAI embedding provider.
//!
//! Calls `POST {endpoint}/v1/embeddings`. The registry holds an unconfigured
//! instance; [`hydrate_from_config`](EmbeddingFunction::hydrate_from_config)
//! produces a configured one.
//!
//! Options:
//! - `model` (required), e.g. `"text-embedding-ada-002"`
//! - `api_key_env_var`: name of the variable holding the API key
//!   (`openAIKeyFromEnvironmentVariable` is accepted as an alias;
//!   defaults to `OPENAI_API_KEY`)
//! - `dimensions` (optional): requested output size for models that support it

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::provider_settings::ProviderSettings;
use crate::config::secret_source::SecretSource;
use crate::errors::{EmbeddingError, Result, make_snippet, validate_http_endpoint};
use crate::function::{EmbeddedText, EmbeddingFunction, EmbeddingFuture};

pub const PROVIDER_NAME: &str = "openai";
pub const DEFAULT_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

const MODIFIABLE: &[&str] = &["api_key_env_var"];
const LEGACY_API_KEY_ENV_VAR: &str = "openAIKeyFromEnvironmentVariable";

/// Typed view of the persisted options.
#[derive(Debug, Clone, Deserialize)]
struct OpenAiOptions {
    model: String,
    #[serde(default)]
    api_key_env_var: Option<String>,
    #[serde(default, rename = "openAIKeyFromEnvironmentVariable")]
    legacy_api_key_env_var: Option<String>,
    #[serde(default)]
    dimensions: Option<u32>,
}

impl OpenAiOptions {
    /// The canonical key wins when both spellings are present.
    fn key_var(&self) -> &str {
        self.api_key_env_var
            .as_deref()
            .or(self.legacy_api_key_env_var.as_deref())
            .unwrap_or(DEFAULT_API_KEY_ENV_VAR)
    }
}

pub struct OpenAiEmbeddingFunction {
    client: reqwest::Client,
    url_embeddings: String,
    secrets: SecretSource,
    options: Option<OpenAiOptions>,
    api_key: Option<String>,
    config: Value,
}

impl OpenAiEmbeddingFunction {
    /// Creates an unconfigured instance bound to the given endpoint and secrets.
    ///
    /// # Errors
    /// - [`EmbeddingError::InvalidConfig`] if the endpoint is invalid
    /// - [`EmbeddingError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        validate_http_endpoint("openai_endpoint", &settings.openai_endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        let base = settings.openai_endpoint.trim().trim_end_matches('/');

        Ok(Self {
            client,
            url_embeddings: format!("{base}/v1/embeddings"),
            secrets: settings.secrets.clone(),
            options: None,
            api_key: None,
            config: Value::Null,
        })
    }

    /// Model of a configured instance.
    pub fn model(&self) -> Option<&str> {
        self.options.as_ref().map(|o| o.model.as_str())
    }
}

impl fmt::Debug for OpenAiEmbeddingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddingFunction")
            .field("url_embeddings", &self.url_embeddings)
            .field("model", &self.model())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl EmbeddingFunction for OpenAiEmbeddingFunction {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn generate_text<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a> {
        Box::pin(async move {
            let (options, api_key) = match (&self.options, &self.api_key) {
                (Some(o), Some(k)) => (o, k),
                _ => return Err(EmbeddingError::NotConfigured(PROVIDER_NAME)),
            };

            let started = Instant::now();
            let body = EmbeddingsRequest {
                model: &options.model,
                input: text,
                dimensions: options.dimensions,
            };

            debug!(
                model = %options.model,
                input_len = text.len(),
                "POST {}", self.url_embeddings
            );

            let resp = self
                .client
                .post(&self.url_embeddings)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let url = self.url_embeddings.clone();
                let body = resp.text().await.unwrap_or_default();
                let snippet = make_snippet(&body);

                error!(
                    %status,
                    %url,
                    %snippet,
                    model = %options.model,
                    latency_ms = started.elapsed().as_millis(),
                    "OpenAI /v1/embeddings returned non-success status"
                );

                return Err(EmbeddingError::HttpStatus {
                    status,
                    url,
                    snippet,
                });
            }

            let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
                EmbeddingError::Decode(format!("serde error: {e}; expected `data[0].embedding`"))
            })?;

            let first = out.data.into_iter().next().ok_or_else(|| {
                EmbeddingError::Decode("empty `data` in embeddings response".into())
            })?;

            info!(
                model = %options.model,
                dim = first.embedding.len(),
                latency_ms = started.elapsed().as_millis(),
                "embeddings completed"
            );

            Ok(EmbeddedText::new(text, first.embedding))
        })
    }

    /// Parses the options and resolves the API key from the declared variable.
    fn hydrate_from_config(
        self: Arc<Self>,
        config: &Value,
    ) -> Result<Arc<dyn EmbeddingFunction>> {
        let options: OpenAiOptions = serde_json::from_value(config.clone())
            .map_err(|e| EmbeddingError::InvalidConfig(format!("openai options: {e}")))?;

        if options.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "openai options: model must not be empty".into(),
            ));
        }

        let key_var = options.key_var().to_string();
        let api_key = self.secrets.require(&key_var)?;

        info!(model = %options.model, key_var = %key_var, "openai embedding function hydrated");

        Ok(Arc::new(Self {
            client: self.client.clone(),
            url_embeddings: self.url_embeddings.clone(),
            secrets: self.secrets.clone(),
            options: Some(options),
            api_key: Some(api_key),
            config: config.clone(),
        }))
    }

    fn get_config(&self) -> Value {
        self.config.clone()
    }

    /// Folds `openAIKeyFromEnvironmentVariable` into `api_key_env_var`.
    /// An explicit `api_key_env_var` is kept.
    fn canonical_options(&self, options: Value) -> Value {
        match options {
            Value::Object(mut map) => {
                if let Some(alias) = map.remove(LEGACY_API_KEY_ENV_VAR) {
                    map.entry("api_key_env_var").or_insert(alias);
                }
                Value::Object(map)
            }
            other => other,
        }
    }

    fn modifiable_variables(&self) -> &'static [&'static str] {
        MODIFIABLE
    }
}

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

/// Response body for `/v1/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
