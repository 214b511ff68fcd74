//! Distance metrics understood by the vector database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EmbeddingError;

/// Scoring function used to rank vector similarity.
///
/// Serialized as `"cosine"`, `"l2"` and `"inner_product"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity.
    Cosine,
    /// Euclidean (L2) distance.
    L2,
    /// Inner (dot) product.
    InnerProduct,
}

impl DistanceMetric {
    /// Every metric, in declaration order.
    pub const ALL: [DistanceMetric; 3] = [
        DistanceMetric::Cosine,
        DistanceMetric::L2,
        DistanceMetric::InnerProduct,
    ];

    /// Wire name of the metric.
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "inner_product",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = EmbeddingError;

    /// Case-insensitive parse; also accepts `euclid`/`euclidean` and `ip`/`dot`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclid" | "euclidean" => Ok(DistanceMetric::L2),
            "inner_product" | "ip" | "dot" => Ok(DistanceMetric::InnerProduct),
            other => Err(EmbeddingError::InvalidConfig(format!(
                "unknown distance metric: '{other}'"
            ))),
        }
    }
}
