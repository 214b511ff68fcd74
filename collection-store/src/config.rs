//! Connection configuration for the vector database.

use crate::errors::StoreError;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Qdrant connectivity settings.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
        }
    }

    /// Build configuration from environment variables.
    ///
    /// - `QDRANT_URL` (default: "http://localhost:6334")
    /// - `QDRANT_API_KEY` (optional)
    pub fn from_env() -> Result<Self, StoreError> {
        let cfg = Self {
            qdrant_url: std::env::var("QDRANT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.into()),
            qdrant_api_key: std::env::var("QDRANT_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), StoreError> {
        let url = self.qdrant_url.trim();
        if url.is_empty() {
            return Err(StoreError::InvalidConfig("qdrant_url is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoreError::InvalidConfig(format!(
                "qdrant_url must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(())
    }
}
