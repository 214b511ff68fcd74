//! Unified error types for the crate.

use embedding_functions::{DistanceMetric, EmbeddingError};
use thiserror::Error;

/// Top-level error for collection-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    InvalidConfig(String),

    /// Caller-supplied records or queries are malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Vector length differs from the collection dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// The embedding function cannot serve the requested metric.
    #[error("embedding function {provider} does not support the {metric} metric")]
    UnsupportedMetric {
        provider: String,
        metric: DistanceMetric,
    },

    /// Text input was given but the collection has no embedding function.
    #[error("collection {0} has no embedding function; pass embeddings explicitly")]
    MissingEmbeddingFunction(String),

    /// Embedding provider or registry failure.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// JSON parsing / serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
