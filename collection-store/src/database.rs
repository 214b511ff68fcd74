//! Storage seam between collections and the vector database service.
//!
//! [`Collection`](crate::Collection) and [`CollectionStore`](crate::CollectionStore)
//! only speak to this trait; [`QdrantDatabase`](crate::QdrantDatabase) is the
//! production implementation.

use std::{future::Future, pin::Pin};

use embedding_functions::DistanceMetric;
use serde_json::Value;

use crate::{collection_config::CollectionConfiguration, errors::StoreError};

/// Boxed future returned by [`VectorDatabase`] methods.
pub type DbFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Index parameters sent when a collection is created.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: u64,
    pub metric: DistanceMetric,
    /// HNSW `m`.
    pub max_neighbors: u64,
    /// HNSW `ef_construct`.
    pub ef_construction: u64,
    /// Index build threads.
    pub num_threads: u64,
}

impl From<&CollectionConfiguration> for CollectionSpec {
    fn from(cfg: &CollectionConfiguration) -> Self {
        Self {
            name: cfg.name.clone(),
            dimension: cfg.dimension as u64,
            metric: cfg.metric(),
            max_neighbors: cfg.hnsw.max_neighbors,
            ef_construction: cfg.hnsw.ef_construction,
            num_threads: cfg.runtime.num_threads,
        }
    }
}

/// Vector size and metric of an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionShape {
    pub dimension: u64,
    pub metric: DistanceMetric,
}

/// Index parameters that may change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPatch {
    pub name: String,
    pub num_threads: Option<u64>,
}

/// One point to upsert. `id` must already be a UUID string.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// Nearest-neighbour search for a single vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub collection: String,
    pub vector: Vec<f32>,
    pub limit: u64,
    /// HNSW `ef` used for this search.
    pub ef_search: u64,
}

/// A single search hit as returned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Minimal vector database surface used by the store.
pub trait VectorDatabase: Send + Sync {
    fn collection_exists<'a>(&'a self, name: &'a str) -> DbFuture<'a, bool>;

    /// `None` when the collection does not exist.
    fn collection_shape<'a>(&'a self, name: &'a str) -> DbFuture<'a, Option<CollectionShape>>;

    fn create_collection<'a>(&'a self, spec: &'a CollectionSpec) -> DbFuture<'a, ()>;

    fn update_collection<'a>(&'a self, patch: &'a CollectionPatch) -> DbFuture<'a, ()>;

    fn delete_collection<'a>(&'a self, name: &'a str) -> DbFuture<'a, ()>;

    /// Returns the number of points written.
    fn upsert<'a>(&'a self, collection: &'a str, points: Vec<PointRecord>) -> DbFuture<'a, usize>;

    /// Hits are sorted best-first.
    fn search<'a>(&'a self, request: SearchRequest) -> DbFuture<'a, Vec<ScoredRecord>>;
}
