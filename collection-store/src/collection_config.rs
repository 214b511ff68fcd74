//! Collection configuration: HNSW index parameters, runtime knobs and the
//! embedding function a collection is bound to.
//!
//! Each config has a builder whose unset fields fall back to the defaults
//! below. Builders validate on `build()`.
//!
//! | field              | default |
//! |--------------------|---------|
//! | `ef_construction`  | 80      |
//! | `max_neighbors`    | 50      |
//! | `ef_search`        | 100     |
//! | `num_threads`      | 4       |
//! | `resize_factor`    | 1.3     |
//! | `batch_size`       | 100     |
//! | `sync_threshold`   | 1000    |

use embedding_functions::{DistanceMetric, EmbeddingFunctionConfig};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

pub const DEFAULT_EF_CONSTRUCTION: u64 = 80;
pub const DEFAULT_MAX_NEIGHBORS: u64 = 50;
pub const DEFAULT_EF_SEARCH: u64 = 100;
pub const DEFAULT_NUM_THREADS: u64 = 4;
pub const DEFAULT_RESIZE_FACTOR: f64 = 1.3;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SYNC_THRESHOLD: u64 = 1000;

/// Metric used when neither the caller nor the embedding function picks one.
pub const FALLBACK_METRIC: DistanceMetric = DistanceMetric::L2;

/* ------------------------------------------------------------------------- */
/* HNSW                                                                      */
/* ------------------------------------------------------------------------- */

/// Search-time HNSW parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Size of the candidate list during search (recall vs. latency).
    pub ef_search: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            ef_search: DEFAULT_EF_SEARCH,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HnswConfigBuilder {
    ef_search: Option<u64>,
}

impl HnswConfigBuilder {
    pub fn with_ef_search(mut self, ef_search: u64) -> Self {
        self.ef_search = Some(ef_search);
        self
    }

    pub fn build(self) -> Result<HnswConfig, StoreError> {
        let cfg = HnswConfig {
            ef_search: self.ef_search.unwrap_or(DEFAULT_EF_SEARCH),
        };
        positive("hnsw.ef_search", cfg.ef_search)?;
        Ok(cfg)
    }
}

/// Construction-time HNSW parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswCreateConfig {
    /// `None` defers to the embedding function's default metric.
    #[serde(default)]
    pub distance_metric: Option<DistanceMetric>,
    /// Size of the candidate list while building the graph.
    pub ef_construction: u64,
    /// Maximum graph degree (`m`).
    pub max_neighbors: u64,
    /// Default search-time candidate list size for this collection.
    pub ef_search: u64,
}

impl Default for HnswCreateConfig {
    fn default() -> Self {
        Self {
            distance_metric: None,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }
}

impl HnswCreateConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        positive("hnsw.ef_construction", self.ef_construction)?;
        positive("hnsw.max_neighbors", self.max_neighbors)?;
        positive("hnsw.ef_search", self.ef_search)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HnswCreateConfigBuilder {
    distance_metric: Option<DistanceMetric>,
    ef_construction: Option<u64>,
    max_neighbors: Option<u64>,
    ef_search: Option<u64>,
}

impl HnswCreateConfigBuilder {
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = Some(metric);
        self
    }

    pub fn with_ef_construction(mut self, ef_construction: u64) -> Self {
        self.ef_construction = Some(ef_construction);
        self
    }

    pub fn with_max_neighbors(mut self, max_neighbors: u64) -> Self {
        self.max_neighbors = Some(max_neighbors);
        self
    }

    pub fn with_ef_search(mut self, ef_search: u64) -> Self {
        self.ef_search = Some(ef_search);
        self
    }

    pub fn build(self) -> Result<HnswCreateConfig, StoreError> {
        let cfg = HnswCreateConfig {
            distance_metric: self.distance_metric,
            ef_construction: self.ef_construction.unwrap_or(DEFAULT_EF_CONSTRUCTION),
            max_neighbors: self.max_neighbors.unwrap_or(DEFAULT_MAX_NEIGHBORS),
            ef_search: self.ef_search.unwrap_or(DEFAULT_EF_SEARCH),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/* ------------------------------------------------------------------------- */
/* Runtime                                                                   */
/* ------------------------------------------------------------------------- */

/// Indexing and ingestion knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Threads the service may use for index building; also caps concurrent embedding calls.
    pub num_threads: u64,
    /// Growth factor applied when the index needs more capacity.
    pub resize_factor: f64,
    /// Points per upsert request.
    pub batch_size: usize,
    /// Pending points after which the index is synced.
    pub sync_threshold: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_NUM_THREADS,
            resize_factor: DEFAULT_RESIZE_FACTOR,
            batch_size: DEFAULT_BATCH_SIZE,
            sync_threshold: DEFAULT_SYNC_THRESHOLD,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        positive("runtime.num_threads", self.num_threads)?;
        positive("runtime.batch_size", self.batch_size as u64)?;
        if !self.resize_factor.is_finite() || self.resize_factor < 1.0 {
            return Err(StoreError::InvalidConfig(format!(
                "runtime.resize_factor must be >= 1.0, got {}",
                self.resize_factor
            )));
        }
        Ok(())
    }
}

/// Builder for [`RuntimeConfig`]; also serves as a partial update via
/// [`build_over`](Self::build_over).
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    num_threads: Option<u64>,
    resize_factor: Option<f64>,
    batch_size: Option<usize>,
    sync_threshold: Option<u64>,
}

impl RuntimeConfigBuilder {
    pub fn with_num_threads(mut self, num_threads: u64) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn with_resize_factor(mut self, resize_factor: f64) -> Self {
        self.resize_factor = Some(resize_factor);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_sync_threshold(mut self, sync_threshold: u64) -> Self {
        self.sync_threshold = Some(sync_threshold);
        self
    }

    pub fn build(self) -> Result<RuntimeConfig, StoreError> {
        self.build_over(&RuntimeConfig::default())
    }

    /// Applies the fields that were set on top of `base`.
    pub fn build_over(&self, base: &RuntimeConfig) -> Result<RuntimeConfig, StoreError> {
        let cfg = RuntimeConfig {
            num_threads: self.num_threads.unwrap_or(base.num_threads),
            resize_factor: self.resize_factor.unwrap_or(base.resize_factor),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            sync_threshold: self.sync_threshold.unwrap_or(base.sync_threshold),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/* ------------------------------------------------------------------------- */
/* Create / update / query                                                   */
/* ------------------------------------------------------------------------- */

/// Everything needed to create a collection (besides its name and dimension).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionConfig {
    #[serde(default)]
    pub hnsw: HnswCreateConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub embedding_function: Option<EmbeddingFunctionConfig>,
}

impl CreateCollectionConfig {
    pub fn builder() -> CreateCollectionConfigBuilder {
        CreateCollectionConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        self.hnsw.validate()?;
        self.runtime.validate()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateCollectionConfigBuilder {
    hnsw: HnswCreateConfigBuilder,
    runtime: RuntimeConfigBuilder,
    embedding_function: Option<EmbeddingFunctionConfig>,
}

impl CreateCollectionConfigBuilder {
    /// Adjusts HNSW parameters, e.g. `.with_hnsw(|h| h.with_ef_construction(100))`.
    pub fn with_hnsw(
        mut self,
        f: impl FnOnce(HnswCreateConfigBuilder) -> HnswCreateConfigBuilder,
    ) -> Self {
        self.hnsw = f(self.hnsw);
        self
    }

    pub fn with_runtime(
        mut self,
        f: impl FnOnce(RuntimeConfigBuilder) -> RuntimeConfigBuilder,
    ) -> Self {
        self.runtime = f(self.runtime);
        self
    }

    pub fn with_embedding_function(mut self, config: EmbeddingFunctionConfig) -> Self {
        self.embedding_function = Some(config);
        self
    }

    pub fn build(self) -> Result<CreateCollectionConfig, StoreError> {
        Ok(CreateCollectionConfig {
            hnsw: self.hnsw.build()?,
            runtime: self.runtime.build()?,
            embedding_function: self.embedding_function,
        })
    }
}

/// Changes applied to an existing collection. `None` fields are left as is.
#[derive(Debug, Clone, Default)]
pub struct UpdateCollectionConfig {
    pub hnsw: Option<HnswConfig>,
    pub runtime: Option<RuntimeConfigBuilder>,
    /// Merged additively into the stored embedding-function options.
    pub embedding_function: Option<EmbeddingFunctionConfig>,
}

impl UpdateCollectionConfig {
    pub fn builder() -> UpdateCollectionConfigBuilder {
        UpdateCollectionConfigBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hnsw.is_none() && self.runtime.is_none() && self.embedding_function.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCollectionConfigBuilder {
    hnsw: Option<HnswConfigBuilder>,
    runtime: Option<RuntimeConfigBuilder>,
    embedding_function: Option<EmbeddingFunctionConfig>,
}

impl UpdateCollectionConfigBuilder {
    pub fn with_hnsw(mut self, f: impl FnOnce(HnswConfigBuilder) -> HnswConfigBuilder) -> Self {
        self.hnsw = Some(f(self.hnsw.unwrap_or_default()));
        self
    }

    pub fn with_runtime(
        mut self,
        f: impl FnOnce(RuntimeConfigBuilder) -> RuntimeConfigBuilder,
    ) -> Self {
        self.runtime = Some(f(self.runtime.unwrap_or_default()));
        self
    }

    pub fn with_embedding_function(mut self, config: EmbeddingFunctionConfig) -> Self {
        self.embedding_function = Some(config);
        self
    }

    pub fn build(self) -> Result<UpdateCollectionConfig, StoreError> {
        let hnsw = self.hnsw.map(HnswConfigBuilder::build).transpose()?;
        if let Some(rt) = &self.runtime {
            // Validate the fields that were set against defaults for the rest.
            rt.build_over(&RuntimeConfig::default())?;
        }
        Ok(UpdateCollectionConfig {
            hnsw,
            runtime: self.runtime,
            embedding_function: self.embedding_function,
        })
    }
}

/// Per-query overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCollectionConfig {
    /// `None` uses the collection's `ef_search`.
    pub hnsw: Option<HnswConfig>,
    /// Embeds query texts with this function instead of the collection's.
    pub embedding_function: Option<EmbeddingFunctionConfig>,
}

impl QueryCollectionConfig {
    pub fn builder() -> QueryCollectionConfigBuilder {
        QueryCollectionConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryCollectionConfigBuilder {
    hnsw: Option<HnswConfigBuilder>,
    embedding_function: Option<EmbeddingFunctionConfig>,
}

impl QueryCollectionConfigBuilder {
    pub fn with_hnsw(mut self, f: impl FnOnce(HnswConfigBuilder) -> HnswConfigBuilder) -> Self {
        self.hnsw = Some(f(self.hnsw.unwrap_or_default()));
        self
    }

    pub fn with_embedding_function(mut self, config: EmbeddingFunctionConfig) -> Self {
        self.embedding_function = Some(config);
        self
    }

    pub fn build(self) -> Result<QueryCollectionConfig, StoreError> {
        Ok(QueryCollectionConfig {
            hnsw: self.hnsw.map(HnswConfigBuilder::build).transpose()?,
            embedding_function: self.embedding_function,
        })
    }
}

/* ------------------------------------------------------------------------- */
/* Persisted                                                                 */
/* ------------------------------------------------------------------------- */

/// The full configuration of a created collection, suitable for persisting
/// and for reopening the collection later via
/// [`CollectionStore::open_collection`](crate::CollectionStore::open_collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfiguration {
    pub name: String,
    pub dimension: usize,
    /// `distance_metric` is always resolved (`Some`) once the collection exists.
    pub hnsw: HnswCreateConfig,
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub embedding_function: Option<EmbeddingFunctionConfig>,
}

impl CollectionConfiguration {
    pub fn metric(&self) -> DistanceMetric {
        self.hnsw.distance_metric.unwrap_or(FALLBACK_METRIC)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(s)?)
    }
}

fn positive(field: &str, value: u64) -> Result<(), StoreError> {
    if value == 0 {
        Err(StoreError::InvalidConfig(format!("{field} must be > 0")))
    } else {
        Ok(())
    }
}
