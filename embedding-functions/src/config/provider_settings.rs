//! Connection settings shared by the remote providers, loaded from environment.
//!
//! # Environment variables
//! - `OPENAI_URL`             = OpenAI API base (default `https://api.openai.com`)
//! - `OLLAMA_URL`             = Ollama server base (default `http://localhost:11434`)
//! - `EMBEDDING_TIMEOUT_SECS` = per-request timeout in seconds (default `30`)

use std::time::Duration;

use crate::config::secret_source::SecretSource;
use crate::errors::{EmbeddingError, Result, validate_http_endpoint};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoints, timeout and credential source handed to providers at construction.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// OpenAI REST base URL.
    pub openai_endpoint: String,
    /// Ollama REST base URL.
    pub ollama_endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Where API keys are resolved from.
    pub secrets: SecretSource,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_endpoint: DEFAULT_OPENAI_URL.to_string(),
            ollama_endpoint: DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            secrets: SecretSource::Process,
        }
    }
}

impl ProviderSettings {
    /// Reads settings from environment variables, falling back to defaults.
    ///
    /// # Errors
    /// - [`EmbeddingError::EnvParse`] if `EMBEDDING_TIMEOUT_SECS` is not a number
    /// - [`EmbeddingError::InvalidConfig`] if the result fails [`validate`](Self::validate)
    pub fn from_env() -> Result<Self> {
        let openai_endpoint = env_non_empty("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.into());
        let ollama_endpoint = env_non_empty("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.into());
        let timeout_secs = parse_timeout(env_non_empty("EMBEDDING_TIMEOUT_SECS"))?;

        let settings = Self {
            openai_endpoint,
            ollama_endpoint,
            timeout_secs,
            secrets: SecretSource::Process,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Replaces the credential source.
    pub fn with_secrets(mut self, secrets: SecretSource) -> Self {
        self.secrets = secrets;
        self
    }

    /// Validates endpoints and timeout.
    pub fn validate(&self) -> Result<()> {
        validate_http_endpoint("openai_endpoint", &self.openai_endpoint)?;
        validate_http_endpoint("ollama_endpoint", &self.ollama_endpoint)?;
        if self.timeout_secs == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_timeout(raw: Option<String>) -> Result<u64> {
    match raw {
        Some(v) => v.trim().parse::<u64>().map_err(|_| EmbeddingError::EnvParse {
            key: "EMBEDDING_TIMEOUT_SECS".into(),
            value: v,
        }),
        None => Ok(DEFAULT_TIMEOUT_SECS),
    }
}
