//! Serializable embedding-function configuration.
//!
//! An [`EmbeddingFunctionConfig`] is the `(provider, options)` pair produced by
//! [`EmbeddingFunction::create`](crate::EmbeddingFunction::create) and
//! [`EmbeddingFunction::update`](crate::EmbeddingFunction::update). It is stored
//! alongside a collection and later handed to the registry to hydrate a live
//! provider instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{EmbeddingError, Result};

/// Provider name plus its options, exactly as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFunctionConfig {
    /// Registry name of the provider (e.g. `"openai"`).
    pub name: String,
    /// Provider-specific options; opaque to everything but the provider.
    #[serde(default)]
    pub options: Value,
}

impl EmbeddingFunctionConfig {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Splits the config into its `(name, options)` pair.
    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.options)
    }

    /// Merges `update` into this configuration.
    ///
    /// Keys of `update.options` overwrite or extend the stored options; keys not
    /// present in the update are kept. A `null` update is a no-op.
    ///
    /// # Errors
    /// - [`EmbeddingError::ProviderMismatch`] if the provider names differ
    /// - [`EmbeddingError::ImmutableOption`] if a key is not in `modifiable`
    /// - [`EmbeddingError::InvalidConfig`] if either side is not a JSON object
    ///
    /// On error the stored configuration is left untouched.
    pub fn apply_update(
        &mut self,
        update: &EmbeddingFunctionConfig,
        modifiable: &[&str],
    ) -> Result<()> {
        if update.name != self.name {
            return Err(EmbeddingError::ProviderMismatch {
                expected: self.name.clone(),
                got: update.name.clone(),
            });
        }

        let changes = match &update.options {
            Value::Null => return Ok(()),
            Value::Object(m) => m,
            _ => {
                return Err(EmbeddingError::InvalidConfig(
                    "update options must be a JSON object".into(),
                ));
            }
        };

        if let Some(key) = changes
            .keys()
            .find(|k| !modifiable.contains(&k.as_str()))
        {
            return Err(EmbeddingError::ImmutableOption {
                provider: self.name.clone(),
                key: key.clone(),
            });
        }

        if self.options.is_null() {
            self.options = Value::Object(Map::new());
        }
        let current = self.options.as_object_mut().ok_or_else(|| {
            EmbeddingError::InvalidConfig("stored options must be a JSON object".into())
        })?;

        for (k, v) in changes {
            current.insert(k.clone(), v.clone());
        }

        debug!(provider = %self.name, changed = changes.len(), "embedding function config updated");
        Ok(())
    }
}
