//! Vector collections over Qdrant with pluggable embedding functions.
//!
//! This crate provides a small API to:
//! - Create, reopen and delete collections with HNSW and runtime settings
//! - Add records, embedding documents through the collection's embedding function
//! - Query by vectors or texts with per-query overrides
//! - Reconfigure a collection after creation
//!
//! Embedding functions come from an [`EmbeddingFunctionRegistry`]; the database
//! sits behind [`VectorDatabase`], with [`QdrantDatabase`] as the default.

mod collection;
mod collection_config;
mod config;
mod database;
mod embed_pool;
mod errors;
mod ids;
mod qdrant_facade;
mod record;

pub use collection::Collection;
pub use collection_config::{
    CollectionConfiguration, CreateCollectionConfig, CreateCollectionConfigBuilder,
    DEFAULT_BATCH_SIZE, DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH, DEFAULT_MAX_NEIGHBORS,
    DEFAULT_NUM_THREADS, DEFAULT_RESIZE_FACTOR, DEFAULT_SYNC_THRESHOLD, FALLBACK_METRIC,
    HnswConfig, HnswConfigBuilder, HnswCreateConfig, HnswCreateConfigBuilder,
    QueryCollectionConfig, QueryCollectionConfigBuilder, RuntimeConfig, RuntimeConfigBuilder,
    UpdateCollectionConfig, UpdateCollectionConfigBuilder,
};
pub use config::{DEFAULT_QDRANT_URL, StoreConfig};
pub use database::{
    CollectionPatch, CollectionShape, CollectionSpec, DbFuture, PointRecord, ScoredRecord,
    SearchRequest, VectorDatabase,
};
pub use errors::StoreError;
pub use ids::stable_uuid;
pub use qdrant_facade::QdrantDatabase;
pub use record::{AddRequest, DEFAULT_N_RESULTS, QueryHit, QueryInput, QueryRequest, QueryResult};

use std::sync::Arc;

use embedding_functions::EmbeddingFunctionRegistry;
use tracing::{debug, info, trace};

use crate::collection::ensure_metric_supported;

/// Entry point: creates and opens [`Collection`]s.
pub struct CollectionStore {
    db: Arc<dyn VectorDatabase>,
    registry: Arc<EmbeddingFunctionRegistry>,
}

impl CollectionStore {
    /// Connects to Qdrant using `cfg`.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidConfig` or `StoreError::Qdrant` if the
    /// client cannot be built.
    pub fn new(
        cfg: &StoreConfig,
        registry: Arc<EmbeddingFunctionRegistry>,
    ) -> Result<Self, StoreError> {
        trace!("CollectionStore::new url={}", cfg.qdrant_url);
        let db = QdrantDatabase::new(cfg)?;
        Ok(Self::with_database(Arc::new(db), registry))
    }

    /// Uses an already constructed database backend.
    pub fn with_database(
        db: Arc<dyn VectorDatabase>,
        registry: Arc<EmbeddingFunctionRegistry>,
    ) -> Self {
        Self { db, registry }
    }

    pub fn registry(&self) -> &Arc<EmbeddingFunctionRegistry> {
        &self.registry
    }

    /// Creates a new collection.
    ///
    /// The metric is the explicit `hnsw.distance_metric`, else the embedding
    /// function's default, else [`FALLBACK_METRIC`].
    ///
    /// # Errors
    /// - `StoreError::InvalidInput` if the name is empty or the collection exists
    /// - `StoreError::InvalidConfig` for a zero dimension or invalid settings
    /// - `StoreError::Embedding` if the embedding function is not registered
    /// - `StoreError::UnsupportedMetric` if it cannot serve the chosen metric
    pub async fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        config: CreateCollectionConfig,
    ) -> Result<Collection, StoreError> {
        let configuration = self.resolve_configuration(name, dimension, config)?;
        if self.db.collection_exists(name).await? {
            return Err(StoreError::InvalidInput(format!(
                "collection '{name}' already exists"
            )));
        }
        self.db
            .create_collection(&CollectionSpec::from(&configuration))
            .await?;
        info!(
            "CollectionStore::create_collection name={} dim={} metric={}",
            name,
            dimension,
            configuration.metric()
        );
        Ok(self.handle(configuration))
    }

    /// Creates the collection unless it already exists.
    ///
    /// An existing collection must have the requested dimension and resolved
    /// metric; its other server-side index settings are left as they are.
    ///
    /// # Errors
    /// `StoreError::InvalidConfig` if the existing collection's dimension or
    /// metric differs, plus everything [`create_collection`](Self::create_collection) returns.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        dimension: usize,
        config: CreateCollectionConfig,
    ) -> Result<Collection, StoreError> {
        let configuration = self.resolve_configuration(name, dimension, config)?;
        match self.db.collection_shape(name).await? {
            Some(shape) => {
                check_shape(&configuration, shape)?;
                debug!("CollectionStore::get_or_create_collection '{name}' exists");
            }
            None => {
                self.db
                    .create_collection(&CollectionSpec::from(&configuration))
                    .await?;
                info!("CollectionStore::get_or_create_collection created '{name}'");
            }
        }
        Ok(self.handle(configuration))
    }

    /// Reopens a collection from a configuration previously returned by
    /// [`Collection::configuration`]. No database call is made.
    pub fn open_collection(
        &self,
        configuration: CollectionConfiguration,
    ) -> Result<Collection, StoreError> {
        if configuration.name.trim().is_empty() {
            return Err(StoreError::InvalidInput("collection name is empty".into()));
        }
        if configuration.dimension == 0 {
            return Err(StoreError::InvalidConfig("dimension must be > 0".into()));
        }
        configuration.hnsw.validate()?;
        configuration.runtime.validate()?;
        if let Some(ef) = &configuration.embedding_function {
            let provider = self.registry.require(&ef.name)?;
            ensure_metric_supported(provider.as_ref(), configuration.metric())?;
        }
        trace!("CollectionStore::open_collection name={}", configuration.name);
        Ok(self.handle(configuration))
    }

    pub async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.db.delete_collection(name).await?;
        info!("CollectionStore::delete_collection name={name}");
        Ok(())
    }

    fn handle(&self, configuration: CollectionConfiguration) -> Collection {
        Collection::new(configuration, self.db.clone(), self.registry.clone())
    }

    fn resolve_configuration(
        &self,
        name: &str,
        dimension: usize,
        config: CreateCollectionConfig,
    ) -> Result<CollectionConfiguration, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("collection name is empty".into()));
        }
        if dimension == 0 {
            return Err(StoreError::InvalidConfig("dimension must be > 0".into()));
        }
        config.validate()?;

        let provider = config
            .embedding_function
            .as_ref()
            .map(|ef| self.registry.require(&ef.name))
            .transpose()?;
        let metric = config
            .hnsw
            .distance_metric
            .or_else(|| provider.as_ref().map(|p| p.default_metric()))
            .unwrap_or(FALLBACK_METRIC);
        if let Some(p) = &provider {
            ensure_metric_supported(p.as_ref(), metric)?;
        }

        Ok(CollectionConfiguration {
            name: name.to_string(),
            dimension,
            hnsw: HnswCreateConfig {
                distance_metric: Some(metric),
                ..config.hnsw
            },
            runtime: config.runtime,
            embedding_function: config.embedding_function,
        })
    }
}

fn check_shape(
    configuration: &CollectionConfiguration,
    shape: CollectionShape,
) -> Result<(), StoreError> {
    if shape.dimension != configuration.dimension as u64 {
        return Err(StoreError::InvalidConfig(format!(
            "collection '{}' has dimension {}, requested {}",
            configuration.name, shape.dimension, configuration.dimension
        )));
    }
    if shape.metric != configuration.metric() {
        return Err(StoreError::InvalidConfig(format!(
            "collection '{}' uses the {} metric, requested {}",
            configuration.name,
            shape.metric,
            configuration.metric()
        )));
    }
    Ok(())
}
