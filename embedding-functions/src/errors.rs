//! Unified error handling for `embedding-functions`.
//!
//! A single top-level error type [`EmbeddingError`] covers configuration,
//! registry dispatch and provider transport failures. All messages carry the
//! `[Embedding Functions]` prefix to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Top-level error for the `embedding-functions` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// No provider is registered under the requested name.
    #[error("[Embedding Functions] unknown provider: {0}")]
    UnknownProvider(String),

    /// Options could not be interpreted by the provider.
    #[error("[Embedding Functions] invalid config: {0}")]
    InvalidConfig(String),

    /// The environment variable declared as the credential source is unset or empty.
    #[error("[Embedding Functions] missing API key: variable `{var}` is not set")]
    MissingApiKey {
        /// Variable name declared by the configuration.
        var: String,
    },

    /// An update targets a different provider than the stored configuration.
    #[error("[Embedding Functions] provider mismatch: expected {expected}, got {got}")]
    ProviderMismatch { expected: String, got: String },

    /// An update tries to change an option that is fixed after creation.
    #[error("[Embedding Functions] option `{key}` of provider {provider} cannot be changed after creation")]
    ImmutableOption { provider: String, key: String },

    /// The instance was never hydrated from a configuration.
    #[error("[Embedding Functions] provider {0} is not configured, hydrate it from a config first")]
    NotConfigured(&'static str),

    /// Underlying HTTP transport error.
    #[error("[Embedding Functions] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Upstream returned a non-successful HTTP status.
    #[error("[Embedding Functions] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short, trimmed snippet of the response body.
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Embedding Functions] decode error: {0}")]
    Decode(String),

    /// An environment variable was set but could not be parsed.
    #[error("[Embedding Functions] failed to parse env variable: {key} = '{value}'")]
    EnvParse { key: String, value: String },
}

/// Trims a response body to a log-friendly snippet.
pub(crate) fn make_snippet(body: &str) -> String {
    body.trim().chars().take(240).collect()
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`EmbeddingError::InvalidConfig`] when the scheme is missing.
pub fn validate_http_endpoint(field: &str, value: &str) -> Result<()> {
    let v = value.trim();
    if v.starts_with("http://") || v.starts_with("https://") {
        Ok(())
    } else {
        Err(EmbeddingError::InvalidConfig(format!(
            "{field} must start with http:// or https://, got '{value}'"
        )))
    }
}
