//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! All Qdrant builders live here; the rest of the crate talks to
//! [`VectorDatabase`].

use std::collections::HashMap;

use embedding_functions::DistanceMetric;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, HnswConfigDiffBuilder, PointId, PointStruct,
    SearchParamsBuilder, SearchPointsBuilder, UpdateCollectionBuilder, UpsertPointsBuilder,
    Value as QValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::database::{
    CollectionPatch, CollectionShape, CollectionSpec, DbFuture, PointRecord, ScoredRecord, SearchRequest,
    VectorDatabase,
};
use crate::errors::StoreError;

/// [`VectorDatabase`] backed by a Qdrant server.
pub struct QdrantDatabase {
    client: Qdrant,
}

impl QdrantDatabase {
    /// Connects lazily; no request is made until the first operation.
    pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;

        Ok(Self { client })
    }
}

fn qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::L2 => Distance::Euclid,
        DistanceMetric::InnerProduct => Distance::Dot,
    }
}

fn metric_from_qdrant(distance: Distance) -> Option<DistanceMetric> {
    match distance {
        Distance::Cosine => Some(DistanceMetric::Cosine),
        Distance::Euclid => Some(DistanceMetric::L2),
        Distance::Dot => Some(DistanceMetric::InnerProduct),
        _ => None,
    }
}

fn json_to_payload(value: Value) -> Result<Payload, StoreError> {
    value
        .try_into()
        .map_err(|e| StoreError::Qdrant(format!("payload convert: {e}")))
}

impl VectorDatabase for QdrantDatabase {
    fn collection_exists<'a>(&'a self, name: &'a str) -> DbFuture<'a, bool> {
        Box::pin(async move {
            self.client
                .collection_exists(name.to_string())
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))
        })
    }

    fn collection_shape<'a>(&'a self, name: &'a str) -> DbFuture<'a, Option<CollectionShape>> {
        Box::pin(async move {
            if !self.collection_exists(name).await? {
                return Ok(None);
            }

            let info = self
                .client
                .collection_info(name.to_string())
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;

            let config = info
                .result
                .and_then(|i| i.config)
                .and_then(|c| c.params)
                .and_then(|p| p.vectors_config)
                .and_then(|v| v.config);

            let params = match config {
                Some(VectorsConfigKind::Params(params)) => params,
                Some(VectorsConfigKind::ParamsMap(_)) => {
                    return Err(StoreError::InvalidConfig(format!(
                        "collection '{name}' uses named vectors, which are not supported"
                    )));
                }
                None => {
                    return Err(StoreError::Qdrant(format!(
                        "collection '{name}' reports no vector parameters"
                    )));
                }
            };

            let metric = metric_from_qdrant(params.distance()).ok_or_else(|| {
                StoreError::InvalidConfig(format!(
                    "collection '{name}' uses unsupported distance {:?}",
                    params.distance()
                ))
            })?;

            debug!(
                "Collection '{}' has size={} metric={}",
                name, params.size, metric
            );
            Ok(Some(CollectionShape {
                dimension: params.size,
                metric,
            }))
        })
    }

    fn create_collection<'a>(&'a self, spec: &'a CollectionSpec) -> DbFuture<'a, ()> {
        Box::pin(async move {
            info!(
                "Creating collection '{}' size={} metric={} m={} ef_construct={} threads={}",
                spec.name,
                spec.dimension,
                spec.metric,
                spec.max_neighbors,
                spec.ef_construction,
                spec.num_threads
            );

            let hnsw = HnswConfigDiffBuilder::default()
                .m(spec.max_neighbors)
                .ef_construct(spec.ef_construction)
                .max_indexing_threads(spec.num_threads);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&spec.name)
                        .vectors_config(VectorParamsBuilder::new(
                            spec.dimension,
                            qdrant_distance(spec.metric),
                        ))
                        .hnsw_config(hnsw),
                )
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;

            info!("Collection '{}' created successfully", spec.name);
            Ok(())
        })
    }

    fn update_collection<'a>(&'a self, patch: &'a CollectionPatch) -> DbFuture<'a, ()> {
        Box::pin(async move {
            let Some(threads) = patch.num_threads else {
                debug!("Nothing to update for collection '{}'", patch.name);
                return Ok(());
            };

            info!(
                "Updating collection '{}' max_indexing_threads={}",
                patch.name, threads
            );
            self.client
                .update_collection(
                    UpdateCollectionBuilder::new(&patch.name)
                        .hnsw_config(HnswConfigDiffBuilder::default().max_indexing_threads(threads)),
                )
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;
            Ok(())
        })
    }

    fn delete_collection<'a>(&'a self, name: &'a str) -> DbFuture<'a, ()> {
        Box::pin(async move {
            info!("Deleting collection '{}'", name);
            self.client
                .delete_collection(name.to_string())
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, collection: &'a str, points: Vec<PointRecord>) -> DbFuture<'a, usize> {
        Box::pin(async move {
            if points.is_empty() {
                debug!("No points provided for upsert");
                return Ok(0);
            }

            let mut qpoints = Vec::with_capacity(points.len());
            for p in points {
                let payload = json_to_payload(p.payload)?;
                qpoints.push(PointStruct::new(p.id, p.vector, payload));
            }
            let n = qpoints.len();

            info!("Upserting {} points into collection '{}'", n, collection);
            let res = self
                .client
                .upsert_points(UpsertPointsBuilder::new(collection, qpoints).wait(true))
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;

            debug!("Upsert operation result={:?}", res.result);
            Ok(n)
        })
    }

    fn search<'a>(&'a self, request: SearchRequest) -> DbFuture<'a, Vec<ScoredRecord>> {
        Box::pin(async move {
            debug!(
                "Searching in '{}' with limit={} ef={}",
                request.collection, request.limit, request.ef_search
            );

            let builder =
                SearchPointsBuilder::new(&request.collection, request.vector, request.limit)
                    .with_payload(true)
                    .params(SearchParamsBuilder::default().hnsw_ef(request.ef_search));

            let res = self
                .client
                .search_points(builder)
                .await
                .map_err(|e| StoreError::Qdrant(e.to_string()))?;

            let out: Vec<ScoredRecord> = res
                .result
                .into_iter()
                .map(|r| ScoredRecord {
                    id: point_id_to_string(r.id),
                    score: r.score,
                    payload: qpayload_to_json(r.payload),
                })
                .collect();

            debug!("Search completed: {} hits returned", out.len());
            Ok(out)
        })
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

/// Converts a Qdrant payload into a JSON object, nested values included.
fn qpayload_to_json(p: HashMap<String, QValue>) -> Value {
    Value::Object(p.into_iter().map(|(k, v)| (k, qvalue_to_json(v))).collect())
}

fn qvalue_to_json(v: QValue) -> Value {
    use qdrant_client::qdrant::value::Kind as K;
    match v.kind {
        Some(K::StringValue(s)) => Value::String(s),
        Some(K::IntegerValue(i)) => Value::Number(i.into()),
        Some(K::DoubleValue(f)) => serde_json::json!(f),
        Some(K::BoolValue(b)) => Value::Bool(b),
        Some(K::ListValue(l)) => Value::Array(l.values.into_iter().map(qvalue_to_json).collect()),
        Some(K::StructValue(s)) => qpayload_to_json(s.fields),
        Some(K::NullValue(_)) | None => Value::Null,
    }
}
