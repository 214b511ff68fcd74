//! Where providers look up credentials.
//!
//! Credentials are never written into the process environment. A provider is
//! handed a [`SecretSource`] when it is constructed and resolves the variable
//! named by its configuration through it.

use std::collections::HashMap;
use std::fmt;

use crate::errors::{EmbeddingError, Result};

/// Read-only lookup of named secrets.
#[derive(Clone, Default)]
pub enum SecretSource {
    /// Read from the process environment (`std::env::var`).
    #[default]
    Process,
    /// Explicit values supplied by the caller.
    Static(HashMap<String, String>),
}

impl SecretSource {
    /// Builds a [`SecretSource::Static`] from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        SecretSource::Static(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the non-empty value stored under `var`.
    pub fn lookup(&self, var: &str) -> Option<String> {
        let value = match self {
            SecretSource::Process => std::env::var(var).ok(),
            SecretSource::Static(map) => map.get(var).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Like [`lookup`](Self::lookup) but fails with [`EmbeddingError::MissingApiKey`].
    pub fn require(&self, var: &str) -> Result<String> {
        self.lookup(var)
            .ok_or_else(|| EmbeddingError::MissingApiKey { var: var.to_string() })
    }
}

// Values are redacted.
impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Process => f.write_str("SecretSource::Process"),
            SecretSource::Static(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                f.debug_tuple("SecretSource::Static").field(&keys).finish()
            }
        }
    }
}
