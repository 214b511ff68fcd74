//! A live handle to one collection: ingestion, search and reconfiguration.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use embedding_functions::{
    DistanceMetric, EmbeddingFunction, EmbeddingFunctionConfig, EmbeddingFunctionRegistry,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::collection_config::{CollectionConfiguration, UpdateCollectionConfig};
use crate::database::{CollectionPatch, PointRecord, SearchRequest, VectorDatabase};
use crate::embed_pool::embed_texts;
use crate::errors::StoreError;
use crate::ids::stable_uuid;
use crate::record::{
    AddRequest, PAYLOAD_DOCUMENT, PAYLOAD_ID, PAYLOAD_METADATA, QueryHit, QueryInput,
    QueryRequest, QueryResult,
};

/// Handle returned by [`CollectionStore`](crate::CollectionStore).
///
/// The embedding function is hydrated on first use, so a collection can be
/// created or reopened without provider credentials being available.
pub struct Collection {
    configuration: CollectionConfiguration,
    db: Arc<dyn VectorDatabase>,
    registry: Arc<EmbeddingFunctionRegistry>,
    embedding_function: OnceLock<Arc<dyn EmbeddingFunction>>,
}

impl Collection {
    pub(crate) fn new(
        configuration: CollectionConfiguration,
        db: Arc<dyn VectorDatabase>,
        registry: Arc<EmbeddingFunctionRegistry>,
    ) -> Self {
        Self {
            configuration,
            db,
            registry,
            embedding_function: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn dimension(&self) -> usize {
        self.configuration.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.configuration.metric()
    }

    /// Current configuration; persist it to reopen the collection later.
    pub fn configuration(&self) -> &CollectionConfiguration {
        &self.configuration
    }

    /// The collection's embedding function, hydrated from its configuration.
    ///
    /// # Errors
    /// [`StoreError::MissingEmbeddingFunction`] when none is configured, or the
    /// provider's hydration error (e.g. a missing API key).
    pub fn embedding_function(&self) -> Result<Arc<dyn EmbeddingFunction>, StoreError> {
        if let Some(ef) = self.embedding_function.get() {
            return Ok(ef.clone());
        }
        let cfg = self
            .configuration
            .embedding_function
            .as_ref()
            .ok_or_else(|| StoreError::MissingEmbeddingFunction(self.configuration.name.clone()))?;
        let ef = self.registry.hydrate(cfg)?;
        Ok(self.embedding_function.get_or_init(|| ef).clone())
    }

    fn concurrency(&self) -> usize {
        self.configuration.runtime.num_threads as usize
    }

    /// Adds records, embedding `documents` when no `embeddings` are given.
    ///
    /// Ids are caller strings; the stored point id is a UUIDv5 of the id, so
    /// re-adding the same id overwrites the point. Points are written in
    /// chunks of `runtime.batch_size`.
    ///
    /// Returns the number of points written.
    #[instrument(skip_all, fields(collection = %self.configuration.name, n = request.ids.len()))]
    pub async fn add(&self, request: AddRequest) -> Result<usize, StoreError> {
        let n = request.ids.len();
        if n == 0 {
            debug!("add: no records");
            return Ok(0);
        }

        check_column("documents", request.documents.as_ref().map(Vec::len), n)?;
        check_column("metadatas", request.metadatas.as_ref().map(Vec::len), n)?;
        check_column("embeddings", request.embeddings.as_ref().map(Vec::len), n)?;

        let mut seen = HashSet::with_capacity(n);
        for id in &request.ids {
            if id.trim().is_empty() {
                return Err(StoreError::InvalidInput("record id is empty".into()));
            }
            if !seen.insert(id.as_str()) {
                return Err(StoreError::InvalidInput(format!("duplicate id '{id}'")));
            }
        }
        if let Some(metas) = &request.metadatas {
            if let Some(bad) = metas.iter().position(|m| !(m.is_object() || m.is_null())) {
                return Err(StoreError::InvalidInput(format!(
                    "metadata at index {bad} must be an object or null"
                )));
            }
        }

        let dim = self.dimension();
        let embeddings = match request.embeddings {
            Some(e) => e,
            None => {
                let docs = request.documents.as_ref().ok_or_else(|| {
                    StoreError::InvalidInput("either embeddings or documents are required".into())
                })?;
                let ef = self.embedding_function()?;
                embed_texts(docs, ef.as_ref(), dim, self.concurrency()).await?
            }
        };
        for v in &embeddings {
            check_dimension(v.len(), dim)?;
        }

        let AddRequest {
            ids,
            documents,
            metadatas,
            ..
        } = request;
        let mut documents = documents.map(Vec::into_iter);
        let mut metadatas = metadatas.map(Vec::into_iter);

        let points: Vec<PointRecord> = ids
            .into_iter()
            .zip(embeddings)
            .map(|(id, vector)| {
                let mut payload = Map::new();
                if let Some(doc) = documents.as_mut().and_then(|it| it.next()) {
                    payload.insert(PAYLOAD_DOCUMENT.into(), Value::String(doc));
                }
                if let Some(meta) = metadatas.as_mut().and_then(|it| it.next()) {
                    payload.insert(PAYLOAD_METADATA.into(), meta);
                }
                let point_id = stable_uuid(&id).to_string();
                payload.insert(PAYLOAD_ID.into(), Value::String(id));
                PointRecord {
                    id: point_id,
                    vector,
                    payload: Value::Object(payload),
                }
            })
            .collect();

        let batch_size = self.configuration.runtime.batch_size.max(1);
        let mut pending = points.into_iter().peekable();
        let mut written = 0usize;
        while pending.peek().is_some() {
            let batch: Vec<PointRecord> = pending.by_ref().take(batch_size).collect();
            written += self.db.upsert(&self.configuration.name, batch).await?;
        }

        info!("add: {} points written", written);
        Ok(written)
    }

    /// Searches the collection; one hit list per query input.
    ///
    /// `ef_search` comes from the query override when present, otherwise
    /// from the collection configuration. Query texts are embedded with the
    /// override embedding function when given, otherwise the collection's.
    #[instrument(skip_all, fields(collection = %self.configuration.name, n_results = request.n_results))]
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult, StoreError> {
        if request.n_results == 0 {
            return Err(StoreError::InvalidInput("n_results must be > 0".into()));
        }

        let dim = self.dimension();
        let ef_search = request
            .config
            .hnsw
            .map(|h| h.ef_search)
            .unwrap_or(self.configuration.hnsw.ef_search);
        if ef_search == 0 {
            return Err(StoreError::InvalidInput("ef_search must be > 0".into()));
        }

        let vectors = match request.input {
            QueryInput::Embeddings(v) => v,
            QueryInput::Texts(texts) => {
                let ef = match &request.config.embedding_function {
                    Some(cfg) => {
                        let provider = self.registry.require(&cfg.name)?;
                        ensure_metric_supported(provider.as_ref(), self.metric())?;
                        self.registry.hydrate(cfg)?
                    }
                    None => self.embedding_function()?,
                };
                embed_texts(&texts, ef.as_ref(), dim, self.concurrency()).await?
            }
        };
        if vectors.is_empty() {
            return Err(StoreError::InvalidInput(
                "query needs at least one embedding or text".into(),
            ));
        }
        for v in &vectors {
            check_dimension(v.len(), dim)?;
        }

        let mut hits = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let records = self
                .db
                .search(SearchRequest {
                    collection: self.configuration.name.clone(),
                    vector,
                    limit: request.n_results,
                    ef_search,
                })
                .await?;
            hits.push(records.into_iter().map(QueryHit::from).collect::<Vec<_>>());
        }

        debug!(
            "query: {} inputs, {} hits total",
            hits.len(),
            hits.iter().map(Vec::len).sum::<usize>()
        );
        Ok(QueryResult { hits })
    }

    /// Applies a partial reconfiguration.
    ///
    /// Embedding function options are merged into the stored ones; only keys
    /// the provider lists in `modifiable_variables` may change, and the
    /// provider itself cannot be swapped. Nothing is changed on error.
    #[instrument(skip_all, fields(collection = %self.configuration.name))]
    pub async fn update(&mut self, update: UpdateCollectionConfig) -> Result<(), StoreError> {
        if update.is_empty() {
            debug!("update: nothing to change");
            return Ok(());
        }

        let mut next = self.configuration.clone();

        if let Some(hnsw) = update.hnsw {
            if hnsw.ef_search == 0 {
                return Err(StoreError::InvalidConfig("ef_search must be > 0".into()));
            }
            next.hnsw.ef_search = hnsw.ef_search;
        }

        let mut threads_changed = false;
        if let Some(runtime) = &update.runtime {
            let merged = runtime.build_over(&next.runtime)?;
            threads_changed = merged.num_threads != next.runtime.num_threads;
            next.runtime = merged;
        }

        let mut hydrated = None;
        if let Some(ef_update) = &update.embedding_function {
            let merged = self.merge_embedding_function(next.embedding_function.as_ref(), ef_update)?;
            let provider = self.registry.require(&merged.name)?;
            ensure_metric_supported(provider.as_ref(), next.metric())?;
            hydrated = Some(self.registry.hydrate(&merged)?);
            next.embedding_function = Some(merged);
        }

        if threads_changed {
            self.db
                .update_collection(&CollectionPatch {
                    name: next.name.clone(),
                    num_threads: Some(next.runtime.num_threads),
                })
                .await?;
        }

        self.configuration = next;
        if let Some(ef) = hydrated {
            self.embedding_function = OnceLock::from(ef);
        }
        info!("update: configuration applied");
        Ok(())
    }

    fn merge_embedding_function(
        &self,
        current: Option<&EmbeddingFunctionConfig>,
        update: &EmbeddingFunctionConfig,
    ) -> Result<EmbeddingFunctionConfig, StoreError> {
        let Some(current) = current else {
            // First embedding function for this collection.
            return Ok(update.clone());
        };
        Ok(self.registry.merge_update(current, update)?)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("configuration", &self.configuration)
            .field("hydrated", &self.embedding_function.get().is_some())
            .finish()
    }
}

pub(crate) fn ensure_metric_supported(
    provider: &dyn EmbeddingFunction,
    metric: DistanceMetric,
) -> Result<(), StoreError> {
    if provider.supports(metric) {
        Ok(())
    } else {
        Err(StoreError::UnsupportedMetric {
            provider: provider.name().to_string(),
            metric,
        })
    }
}

fn check_column(column: &str, len: Option<usize>, want: usize) -> Result<(), StoreError> {
    match len {
        Some(got) if got != want => Err(StoreError::InvalidInput(format!(
            "{column} has {got} entries, expected {want}"
        ))),
        _ => Ok(()),
    }
}

fn check_dimension(got: usize, want: usize) -> Result<(), StoreError> {
    if got != want {
        return Err(StoreError::DimensionMismatch { got, want });
    }
    Ok(())
}
