use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use collection_store::{
    AddRequest, CollectionConfiguration, CollectionPatch, CollectionShape, CollectionSpec,
    CollectionStore, CreateCollectionConfig, DbFuture, PointRecord, QueryCollectionConfig, QueryRequest, ScoredRecord, SearchRequest,
    StoreError, UpdateCollectionConfig, VectorDatabase, stable_uuid,
};
use embedding_functions::{
    DistanceMetric, EmbeddedText, EmbeddingError, EmbeddingFunction, EmbeddingFunctionConfig,
    EmbeddingFunctionRegistry, EmbeddingFuture, ProviderSettings, SecretSource,
};
use serde_json::{Value, json};

/* ------------------------------------------------------------------------- */
/* Doubles                                                                   */
/* ------------------------------------------------------------------------- */

#[derive(Default)]
struct State {
    collections: HashMap<String, CollectionSpec>,
    created: Vec<CollectionSpec>,
    patches: Vec<CollectionPatch>,
    deleted: Vec<String>,
    batches: Vec<usize>,
    points: HashMap<String, Vec<PointRecord>>,
    searches: Vec<SearchRequest>,
}

/// In-memory database that records every call.
#[derive(Default)]
struct MemoryDatabase {
    state: Mutex<State>,
}

impl MemoryDatabase {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl VectorDatabase for MemoryDatabase {
    fn collection_exists<'a>(&'a self, name: &'a str) -> DbFuture<'a, bool> {
        Box::pin(async move { Ok(self.with(|s| s.collections.contains_key(name))) })
    }

    fn collection_shape<'a>(&'a self, name: &'a str) -> DbFuture<'a, Option<CollectionShape>> {
        Box::pin(async move {
            Ok(self.with(|s| {
                s.collections.get(name).map(|spec| CollectionShape {
                    dimension: spec.dimension,
                    metric: spec.metric,
                })
            }))
        })
    }

    fn create_collection<'a>(&'a self, spec: &'a CollectionSpec) -> DbFuture<'a, ()> {
        Box::pin(async move {
            self.with(|s| {
                s.collections.insert(spec.name.clone(), spec.clone());
                s.created.push(spec.clone());
            });
            Ok(())
        })
    }

    fn update_collection<'a>(&'a self, patch: &'a CollectionPatch) -> DbFuture<'a, ()> {
        Box::pin(async move {
            self.with(|s| s.patches.push(patch.clone()));
            Ok(())
        })
    }

    fn delete_collection<'a>(&'a self, name: &'a str) -> DbFuture<'a, ()> {
        Box::pin(async move {
            self.with(|s| {
                s.collections.remove(name);
                s.points.remove(name);
                s.deleted.push(name.to_string());
            });
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, collection: &'a str, points: Vec<PointRecord>) -> DbFuture<'a, usize> {
        Box::pin(async move {
            let n = points.len();
            self.with(|s| {
                s.batches.push(n);
                let stored = s.points.entry(collection.to_string()).or_default();
                for p in points {
                    stored.retain(|old| old.id != p.id);
                    stored.push(p);
                }
            });
            Ok(n)
        })
    }

    fn search<'a>(&'a self, request: SearchRequest) -> DbFuture<'a, Vec<ScoredRecord>> {
        Box::pin(async move {
            Ok(self.with(|s| {
                let mut hits: Vec<ScoredRecord> = s
                    .points
                    .get(&request.collection)
                    .map(|pts| {
                        pts.iter()
                            .map(|p| ScoredRecord {
                                id: p.id.clone(),
                                score: p.vector.iter().zip(&request.vector).map(|(a, b)| a * b).sum(),
                                payload: p.payload.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                hits.sort_by(|a, b| b.score.total_cmp(&a.score));
                hits.truncate(request.limit as usize);
                s.searches.push(request);
                hits
            }))
        })
    }
}

/// Embeds `text` as `[scale * len, scale, 0]`.
struct Fixed {
    scale: f32,
}

impl EmbeddingFunction for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn supported_metrics(&self) -> &'static [DistanceMetric] {
        &[DistanceMetric::Cosine, DistanceMetric::L2]
    }

    fn generate_text<'a>(&'a self, text: &'a str) -> EmbeddingFuture<'a> {
        Box::pin(async move {
            Ok(EmbeddedText::new(
                text,
                vec![self.scale * text.len() as f32, self.scale, 0.0],
            ))
        })
    }

    fn hydrate_from_config(
        self: Arc<Self>,
        config: &Value,
    ) -> Result<Arc<dyn EmbeddingFunction>, EmbeddingError> {
        let scale = config.get("scale").and_then(Value::as_f64).unwrap_or(1.0) as f32;
        Ok(Arc::new(Fixed { scale }))
    }

    fn get_config(&self) -> Value {
        json!({ "scale": self.scale })
    }

    fn modifiable_variables(&self) -> &'static [&'static str] {
        &["scale"]
    }
}

fn registry() -> Arc<EmbeddingFunctionRegistry> {
    let settings = ProviderSettings::default()
        .with_secrets(SecretSource::from_pairs([("UNRELATED_KEY", "x")]));
    let mut registry = EmbeddingFunctionRegistry::with_defaults(&settings).unwrap();
    registry.register(Arc::new(Fixed { scale: 1.0 }));
    Arc::new(registry)
}

fn new_store() -> (Arc<MemoryDatabase>, CollectionStore) {
    let db = Arc::new(MemoryDatabase::default());
    let store = CollectionStore::with_database(db.clone(), registry());
    (db, store)
}

fn fixed_config() -> EmbeddingFunctionConfig {
    EmbeddingFunctionConfig::new("fixed", json!({ "scale": 1.0 }))
}

/* ------------------------------------------------------------------------- */
/* Creation                                                                  */
/* ------------------------------------------------------------------------- */

#[tokio::test]
async fn openai_collection_maps_index_settings_and_query_ef() {
    let (db, store) = new_store();
    let openai = store.registry().require("openai").unwrap();
    let ef = openai.create(json!({
        "model": "text-embedding-ada-002",
        "api_key_env_var": "MY_OPENAI_API_KEY",
    }));

    let config = CreateCollectionConfig::builder()
        .with_hnsw(|h| h.with_ef_construction(100))
        .with_embedding_function(ef)
        .build()
        .unwrap();
    // The API key is not needed until something is embedded.
    let collection = store.create_collection("test", 3, config).await.unwrap();

    let created = db.with(|s| s.created.clone());
    assert_eq!(
        created,
        vec![CollectionSpec {
            name: "test".into(),
            dimension: 3,
            metric: DistanceMetric::Cosine,
            max_neighbors: 50,
            ef_construction: 100,
            num_threads: 4,
        }]
    );

    let query_cfg = QueryCollectionConfig::builder()
        .with_hnsw(|h| h.with_ef_search(100))
        .build()
        .unwrap();
    let result = collection
        .query(
            QueryRequest::by_embeddings(vec![vec![0.1, 0.2, 0.3]])
                .with_n_results(10)
                .with_config(query_cfg),
        )
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
    assert!(result.hits[0].is_empty());

    let searches = db.with(|s| s.searches.clone());
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].limit, 10);
    assert_eq!(searches[0].ef_search, 100);
    assert_eq!(searches[0].vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn metric_falls_back_to_l2_without_embedding_function() {
    let (_db, store) = new_store();
    let collection = store
        .create_collection("plain", 2, CreateCollectionConfig::default())
        .await
        .unwrap();
    assert_eq!(collection.metric(), DistanceMetric::L2);
    assert_eq!(
        collection.configuration().hnsw.distance_metric,
        Some(DistanceMetric::L2)
    );
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let (db, store) = new_store();

    let err = store
        .create_collection("", 3, CreateCollectionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = store
        .create_collection("zero", 0, CreateCollectionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidConfig(_)));

    let unknown = CreateCollectionConfig::builder()
        .with_embedding_function(EmbeddingFunctionConfig::new("nope", Value::Null))
        .build()
        .unwrap();
    let err = store.create_collection("c", 3, unknown).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Embedding(EmbeddingError::UnknownProvider(ref n)) if n == "nope"
    ));

    let inner_product = CreateCollectionConfig::builder()
        .with_hnsw(|h| h.with_distance_metric(DistanceMetric::InnerProduct))
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let err = store.create_collection("c", 3, inner_product).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedMetric {
            metric: DistanceMetric::InnerProduct,
            ..
        }
    ));

    assert!(db.with(|s| s.created.is_empty()));
}

#[tokio::test]
async fn existing_collection_is_not_recreated() {
    let (db, store) = new_store();
    store
        .create_collection("docs", 3, CreateCollectionConfig::default())
        .await
        .unwrap();

    let err = store
        .create_collection("docs", 3, CreateCollectionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let again = store
        .get_or_create_collection("docs", 3, CreateCollectionConfig::default())
        .await
        .unwrap();
    assert_eq!(again.name(), "docs");
    assert_eq!(db.with(|s| s.created.len()), 1);

    let err = store
        .get_or_create_collection("docs", 4, CreateCollectionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidConfig(ref m) if m.contains("dimension")));

    let cosine = CreateCollectionConfig::builder()
        .with_hnsw(|h| h.with_distance_metric(DistanceMetric::Cosine))
        .build()
        .unwrap();
    let err = store
        .get_or_create_collection("docs", 3, cosine)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidConfig(ref m) if m.contains("metric")));
    assert_eq!(db.with(|s| s.created.len()), 1);

    store.delete_collection("docs").await.unwrap();
    assert_eq!(db.with(|s| s.deleted.clone()), vec!["docs".to_string()]);
}

/* ------------------------------------------------------------------------- */
/* Add / query                                                               */
/* ------------------------------------------------------------------------- */

#[tokio::test]
async fn add_embeds_documents_in_batches() {
    let (db, store) = new_store();
    let config = CreateCollectionConfig::builder()
        .with_runtime(|r| r.with_batch_size(2))
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let collection = store.create_collection("docs", 3, config).await.unwrap();

    let ids: Vec<String> = (0..5).map(|i| format!("d{i}")).collect();
    let docs = ["a", "bb", "ccc", "dddd", "eeeee"];
    let written = collection
        .add(
            AddRequest::new(ids)
                .with_documents(docs)
                .with_metadatas(vec![json!({"n": 0}), Value::Null, json!({}), json!({}), json!({})]),
        )
        .await
        .unwrap();

    assert_eq!(written, 5);
    assert_eq!(db.with(|s| s.batches.clone()), vec![2, 2, 1]);

    let stored = db.with(|s| s.points["docs"].clone());
    let first = &stored[0];
    assert_eq!(first.id, stable_uuid("d0").to_string());
    assert_eq!(first.vector, vec![1.0, 1.0, 0.0]);
    assert_eq!(
        first.payload,
        json!({"id": "d0", "document": "a", "metadata": {"n": 0}})
    );
    assert_eq!(stored[4].vector, vec![5.0, 1.0, 0.0]);
}

#[tokio::test]
async fn add_validates_records() {
    let (_db, store) = new_store();
    let with_ef = CreateCollectionConfig::builder()
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let collection = store.create_collection("docs", 3, with_ef).await.unwrap();

    let err = collection
        .add(AddRequest::new(["a", "b"]).with_documents(["only one"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = collection
        .add(AddRequest::new(["a", "a"]).with_documents(["x", "y"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = collection
        .add(AddRequest::new(["a"]).with_embeddings(vec![vec![1.0, 2.0]]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DimensionMismatch { got: 2, want: 3 }));

    let err = collection
        .add(
            AddRequest::new(["a"])
                .with_documents(["x"])
                .with_metadatas(vec![json!("not an object")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let bare = store
        .create_collection("bare", 3, CreateCollectionConfig::default())
        .await
        .unwrap();
    let err = bare
        .add(AddRequest::new(["a"]).with_documents(["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingEmbeddingFunction(ref n) if n == "bare"));

    assert_eq!(bare.add(AddRequest::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn query_texts_uses_collection_defaults() {
    let (db, store) = new_store();
    let config = CreateCollectionConfig::builder()
        .with_hnsw(|h| h.with_ef_search(42))
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let collection = store.create_collection("docs", 3, config).await.unwrap();
    collection
        .add(AddRequest::new(["short", "long"]).with_documents(["hi", "hello world"]))
        .await
        .unwrap();

    let result = collection
        .query(QueryRequest::by_texts(["probe"]).with_n_results(1))
        .await
        .unwrap();

    let best = result.best(0).unwrap();
    assert_eq!(best.id, "long");
    assert_eq!(best.document.as_deref(), Some("hello world"));
    assert!(best.metadata.is_null());
    assert_eq!(result.hits[0].len(), 1);

    let searches = db.with(|s| s.searches.clone());
    assert_eq!(searches[0].ef_search, 42);
    assert_eq!(searches[0].vector, vec![5.0, 1.0, 0.0]);

    let err = collection
        .query(QueryRequest::by_texts(["probe"]).with_n_results(0))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[tokio::test]
async fn query_override_embedding_function_is_used() {
    let (db, store) = new_store();
    let collection = store
        .create_collection("docs", 3, CreateCollectionConfig::default())
        .await
        .unwrap();

    let query_cfg = QueryCollectionConfig::builder()
        .with_embedding_function(EmbeddingFunctionConfig::new("fixed", json!({"scale": 2.0})))
        .build()
        .unwrap();
    collection
        .query(QueryRequest::by_texts(["abc"]).with_config(query_cfg))
        .await
        .unwrap();

    let searches = db.with(|s| s.searches.clone());
    assert_eq!(searches[0].vector, vec![6.0, 2.0, 0.0]);
}

#[tokio::test]
async fn query_override_must_support_collection_metric() {
    let (db, store) = new_store();
    let inner_product = CreateCollectionConfig::builder()
        .with_hnsw(|h| h.with_distance_metric(DistanceMetric::InnerProduct))
        .build()
        .unwrap();
    let collection = store
        .create_collection("dots", 3, inner_product)
        .await
        .unwrap();

    let query_cfg = QueryCollectionConfig::builder()
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let err = collection
        .query(QueryRequest::by_texts(["abc"]).with_config(query_cfg))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedMetric {
            metric: DistanceMetric::InnerProduct,
            ..
        }
    ));
    assert!(db.with(|s| s.searches.is_empty()));
}

#[tokio::test]
async fn openai_hydration_needs_the_declared_key() {
    let (_db, store) = new_store();
    let openai = store.registry().require("openai").unwrap();
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(openai.create(json!({
            "model": "text-embedding-3-small",
            "api_key_env_var": "MY_OPENAI_API_KEY",
        })))
        .build()
        .unwrap();
    let collection = store.create_collection("test", 3, config).await.unwrap();

    let err = collection
        .query(QueryRequest::by_texts(["hello"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Embedding(EmbeddingError::MissingApiKey { ref var }) if var == "MY_OPENAI_API_KEY"
    ));
}

/* ------------------------------------------------------------------------- */
/* Update / reopen                                                           */
/* ------------------------------------------------------------------------- */

#[tokio::test]
async fn update_merges_settings() {
    let (db, store) = new_store();
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let mut collection = store.create_collection("docs", 3, config).await.unwrap();

    let update = UpdateCollectionConfig::builder()
        .with_hnsw(|h| h.with_ef_search(64))
        .with_runtime(|r| r.with_num_threads(8))
        .with_embedding_function(EmbeddingFunctionConfig::new("fixed", json!({"scale": 3.0})))
        .build()
        .unwrap();
    collection.update(update).await.unwrap();

    let cfg = collection.configuration();
    assert_eq!(cfg.hnsw.ef_search, 64);
    assert_eq!(cfg.runtime.num_threads, 8);
    assert_eq!(cfg.runtime.batch_size, 100);
    assert_eq!(
        cfg.embedding_function.as_ref().unwrap().options,
        json!({"scale": 3.0})
    );
    assert_eq!(
        db.with(|s| s.patches.clone()),
        vec![CollectionPatch {
            name: "docs".into(),
            num_threads: Some(8),
        }]
    );

    let ef = collection.embedding_function().unwrap();
    assert_eq!(ef.get_config(), json!({"scale": 3.0}));
}

#[tokio::test]
async fn legacy_key_variable_update_takes_effect() {
    let (_db, store) = new_store();
    let openai = store.registry().require("openai").unwrap();
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(openai.create(json!({
            "model": "text-embedding-ada-002",
            "api_key_env_var": "ROTATED_OUT_KEY"
        })))
        .build()
        .unwrap();
    let mut collection = store.create_collection("docs", 3, config).await.unwrap();

    let update = UpdateCollectionConfig::builder()
        .with_embedding_function(openai.update(json!({
            "openAIKeyFromEnvironmentVariable": "UNRELATED_KEY"
        })))
        .build()
        .unwrap();
    collection.update(update).await.unwrap();

    let expected = json!({
        "model": "text-embedding-ada-002",
        "api_key_env_var": "UNRELATED_KEY"
    });
    assert_eq!(
        collection.configuration().embedding_function.as_ref().unwrap().options,
        expected
    );
    assert_eq!(collection.embedding_function().unwrap().get_config(), expected);
}

#[tokio::test]
async fn rejected_update_changes_nothing() {
    let (db, store) = new_store();
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let mut collection = store.create_collection("docs", 3, config).await.unwrap();
    let before = collection.configuration().clone();

    let immutable = UpdateCollectionConfig::builder()
        .with_runtime(|r| r.with_num_threads(2))
        .with_embedding_function(EmbeddingFunctionConfig::new("fixed", json!({"model": "x"})))
        .build()
        .unwrap();
    let err = collection.update(immutable).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Embedding(EmbeddingError::ImmutableOption { .. })
    ));

    let swap = UpdateCollectionConfig::builder()
        .with_embedding_function(EmbeddingFunctionConfig::new("echo", Value::Null))
        .build()
        .unwrap();
    let err = collection.update(swap).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Embedding(EmbeddingError::ProviderMismatch { .. })
    ));

    assert_eq!(collection.configuration(), &before);
    assert!(db.with(|s| s.patches.is_empty()));
}

#[tokio::test]
async fn persisted_configuration_reopens_collection() {
    let (db, store) = new_store();
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(fixed_config())
        .build()
        .unwrap();
    let collection = store.create_collection("docs", 3, config).await.unwrap();
    let saved = collection.configuration().to_json().unwrap();

    let reopened = store
        .open_collection(CollectionConfiguration::from_json(&saved).unwrap())
        .unwrap();
    assert_eq!(reopened.configuration(), collection.configuration());
    reopened
        .add(AddRequest::new(["a"]).with_documents(["xy"]))
        .await
        .unwrap();
    assert_eq!(db.with(|s| s.created.len()), 1);
    assert_eq!(db.with(|s| s.points["docs"][0].vector.clone()), vec![2.0, 1.0, 0.0]);
}
